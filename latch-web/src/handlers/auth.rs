//! Login, refresh and current-user endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use latch_core::{AuthError, AuthRepository};

use super::append_cookies;
use crate::dto::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, UserResponse};
use crate::errors::{WebError, WebResult};
use crate::rate_limit::ClientAddress;
use crate::state::AppState;
use crate::transport::{read_cookie, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};

const TOKEN_TYPE: &str = "Bearer";

pub async fn login<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
    ClientAddress(client): ClientAddress,
    Json(request): Json<LoginRequest>,
) -> WebResult<Response> {
    state.login_limiter.check(&client).await?;

    let user = state.service.login(&request.email, &request.password).await?;
    let pair = state.service.issue_token_pair(&user)?;

    let access_cookies = state.cookies.token_cookies(
        ACCESS_TOKEN_COOKIE,
        &pair.access_token,
        pair.access_expires_in,
    );
    let refresh_cookies = state.cookies.token_cookies(
        REFRESH_TOKEN_COOKIE,
        &pair.refresh_token,
        pair.refresh_expires_in,
    );

    let mut response = Json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: pair.access_expires_in,
    })
    .into_response();
    append_cookies(&mut response, access_cookies);
    append_cookies(&mut response, refresh_cookies);
    Ok(response)
}

/// Refresh token from the body field `refresh_token`, else the cookie
pub async fn refresh<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> WebResult<Response> {
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| WebError::bad_request(format!("invalid request body: {}", e)))?
            .refresh_token
    };

    let token = from_body
        .filter(|token| !token.trim().is_empty())
        .or_else(|| read_cookie(&headers, REFRESH_TOKEN_COOKIE).map(String::from))
        .ok_or_else(|| {
            debug!("Refresh request without a refresh token");
            AuthError::InvalidToken
        })?;

    let access_token = state.service.refresh(&token).await?;
    let expires_in = state.service.config().access_token_ttl.as_secs();

    let cookies = state
        .cookies
        .token_cookies(ACCESS_TOKEN_COOKIE, &access_token, expires_in);
    let mut response = Json(RefreshResponse {
        access_token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in,
    })
    .into_response();
    append_cookies(&mut response, cookies);
    Ok(response)
}

pub async fn me<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
) -> WebResult<Json<UserResponse>> {
    let claims = state.authorize(&headers, &[])?;
    let user = state.service.current_user(&claims).await?;
    Ok(Json(user.into()))
}
