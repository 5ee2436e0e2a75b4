//! Rate limiting for the login endpoint.
//!
//! Token bucket per client IP to slow down credential brute force.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

use crate::auth::client_ip;

/// Per-IP keyed rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Logins allowed per minute per IP, once the burst allowance is spent.
const LOGIN_PER_MINUTE: u32 = 60;

/// Burst allowance before the per-minute rate applies.
const LOGIN_BURST: u32 = 20;

/// Rate limiting configuration for the credential endpoint.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_minute(NonZeroU32::new(LOGIN_PER_MINUTE).unwrap())
                    .allow_burst(NonZeroU32::new(LOGIN_BURST).unwrap()),
            )),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware for rate limiting login attempts.
///
/// Requests with no determinable IP share a single bucket rather than
/// being rejected outright.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(request.headers(), request.extensions())
        .unwrap_or_else(|| "unknown".to_string());

    match config.login.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "Too many login attempts. Please try again later."
            })),
        )
            .into_response(),
    }
}
