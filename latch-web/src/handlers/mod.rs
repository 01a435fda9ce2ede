//! Route handlers

pub mod auth;
pub mod health;
pub mod permissions;
pub mod roles;
pub mod users;

use axum::http::HeaderValue;
use axum::response::Response;

fn append_cookies(response: &mut Response, cookies: Vec<HeaderValue>) {
    for cookie in cookies {
        response
            .headers_mut()
            .append(axum::http::header::SET_COOKIE, cookie);
    }
}
