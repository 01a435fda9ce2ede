//! Route table and middleware stack

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::warn;

use latch_core::AuthRepository;

use crate::handlers::{auth, health, permissions, roles, users};
use crate::state::AppState;

/// Settings of the HTTP middleware stack
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub request_timeout: Duration,
    /// Exact origins allowed to call the API with credentials
    pub cors_allowed_origins: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            cors_allowed_origins: Vec::new(),
        }
    }
}

pub fn app_router<R: AuthRepository + 'static>(state: AppState<R>, config: &RouterConfig) -> Router {
    Router::new()
        .route("/auth/login", post(auth::login::<R>))
        .route("/auth/refresh", post(auth::refresh::<R>))
        .route("/auth/me", get(auth::me::<R>))
        .route("/users", get(users::list::<R>).post(users::create::<R>))
        .route("/users/{id}", put(users::update::<R>))
        .route("/roles", get(roles::list::<R>).post(roles::create::<R>))
        .route("/roles/{id}", put(roles::update::<R>))
        .route("/permissions", get(permissions::list::<R>))
        .route("/health", get(health::health::<R>))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.cors_allowed_origins))
                .layer(TimeoutLayer::new(config.request_timeout)),
        )
}

/// Credentialed CORS for the listed origins only. No origins, no CORS headers.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
