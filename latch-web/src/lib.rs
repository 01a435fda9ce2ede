//! # Latch Web
//!
//! Axum HTTP surface for the Latch auth service: token transport over
//! headers and cookies, the error to status mapping, handlers, the login
//! rate limiter and the router.

pub mod dto;
pub mod errors;
pub mod handlers;
pub mod rate_limit;
pub mod router;
pub mod state;
pub mod transport;

pub use errors::{WebError, WebResult};
pub use rate_limit::{ClientAddress, LoginRateLimiter};
pub use router::{app_router, RouterConfig};
pub use state::AppState;
pub use transport::{CookieSettings, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
