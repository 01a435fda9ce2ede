//! Token transport: reading tokens from headers and cookies, writing cookies

use axum::http::{header, HeaderMap, HeaderValue};
use tracing::warn;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Value of the `Authorization` header, if present and valid UTF-8
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Find a cookie by name across every `Cookie` header
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

/// Cookie attributes shared by every token cookie
#[derive(Debug, Clone, Default)]
pub struct CookieSettings {
    /// One cookie is written per domain. Empty disables token cookies.
    pub domains: Vec<String>,
}

impl CookieSettings {
    pub fn new(domains: Vec<String>) -> Self {
        Self { domains }
    }

    pub fn enabled(&self) -> bool {
        !self.domains.is_empty()
    }

    /// `Set-Cookie` values carrying `token`, one per configured domain
    pub fn token_cookies(&self, name: &str, token: &str, max_age_secs: u64) -> Vec<HeaderValue> {
        self.domains
            .iter()
            .filter_map(|domain| {
                let cookie = format!(
                    "{}={}; HttpOnly; Secure; SameSite=None; Path=/; Domain={}; Max-Age={}",
                    name, token, domain, max_age_secs
                );
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Skipping token cookie for unusable domain {:?}", domain);
                        None
                    }
                }
            })
            .collect()
    }
}
