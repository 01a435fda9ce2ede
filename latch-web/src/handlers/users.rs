//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use latch_auth::{normalize_email, validate_password_policy};
use latch_core::{AuthRepository, NewUser, Paginated, PermissionCode};

use crate::dto::{CreateUserRequest, PageQuery, UpdateUserRequest, UserResponse};
use crate::errors::WebResult;
use crate::state::AppState;

pub async fn list<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> WebResult<Json<Paginated<UserResponse>>> {
    state.authorize(&headers, &[PermissionCode::ViewUser])?;

    let users = state.service.list_users().await?;
    let page = Paginated::from_items(&users, query.page(), query.limit())?;
    Ok(Json(page.map(UserResponse::from)))
}

pub async fn create<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
    Json(request): Json<CreateUserRequest>,
) -> WebResult<(StatusCode, Json<UserResponse>)> {
    let claims = state.authorize(&headers, &[PermissionCode::CreateUser])?;

    let email = normalize_email(&request.email)?;
    validate_password_policy(&request.password)?;
    let password_hash = state.hash_password(request.password).await?;

    let user = NewUser {
        first_name: request.first_name,
        last_name: request.last_name,
        username: request.username,
        email,
        password_hash,
        active: request.active,
        is_super_user: request.is_super_user,
        phone1: request.phone1,
        phone2: request.phone2,
    };
    let created = state
        .service
        .create_user(&claims, user, &request.role_ids)
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Any authenticated caller; the service decides between the admin path,
/// the self-service path and refusal.
pub async fn update<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
    Path(user_id): Path<i32>,
    headers: HeaderMap,
    Json(request): Json<UpdateUserRequest>,
) -> WebResult<Json<UserResponse>> {
    let claims = state.authorize(&headers, &[])?;
    let updated = state
        .service
        .update_user(&claims, user_id, request.into())
        .await?;
    Ok(Json(updated.into()))
}
