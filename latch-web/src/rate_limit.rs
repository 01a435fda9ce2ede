//! Per-client login rate limiting

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use lru::LruCache;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::WebError;

const DEFAULT_MAX_CLIENTS: usize = 10_000;

/// Token bucket refilled continuously at `refill_rate` tokens per second
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    max_tokens: f64,
    refill_rate: f64,
}

impl TokenBucket {
    fn new(max_tokens: u32, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens as f64,
            last_refill: Instant::now(),
            max_tokens: max_tokens as f64,
            refill_rate,
        }
    }

    fn try_consume(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    fn time_until_available(&mut self) -> Duration {
        self.refill();

        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
        }
    }
}

/// Limits login attempts per client address. The most recently seen clients
/// are tracked; the least recent are evicted first.
pub struct LoginRateLimiter {
    per_minute: u32,
    clients: Arc<RwLock<LruCache<String, TokenBucket>>>,
}

impl LoginRateLimiter {
    pub fn new(per_minute: u32) -> Self {
        Self::with_capacity(per_minute, DEFAULT_MAX_CLIENTS)
    }

    pub fn with_capacity(per_minute: u32, max_clients: usize) -> Self {
        let capacity = NonZeroUsize::new(max_clients).unwrap_or(NonZeroUsize::MIN);
        Self {
            per_minute: per_minute.max(1),
            clients: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    /// Consume one attempt for `client_id`
    pub async fn check(&self, client_id: &str) -> Result<(), WebError> {
        let refill_rate = self.per_minute as f64 / 60.0;
        let mut clients = self.clients.write().await;
        let bucket = clients.get_or_insert_mut(client_id.to_string(), || {
            TokenBucket::new(self.per_minute, refill_rate)
        });

        if bucket.try_consume() {
            debug!("Login attempt allowed for client {}", client_id);
            Ok(())
        } else {
            let retry_after = bucket.time_until_available();
            warn!(
                "Login rate limit exceeded for client {}, retry after {:?}",
                client_id, retry_after
            );
            Err(WebError::RateLimit {
                retry_after_secs: retry_after.as_secs().max(1),
            })
        }
    }
}

/// Address of the calling client, `unknown` when the server was not started
/// with connection info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress(pub String);

impl<S> FromRequestParts<S> for ClientAddress
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let address = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientAddress(address))
    }
}
