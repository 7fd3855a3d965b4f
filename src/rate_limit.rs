/// Request rate limiting
///
/// Coarse per-process throttling of request volume, separate from the
/// credential lockout tracker: this caps raw request rates, the lockout
/// tracker throttles failed logins per client/identity pair.
use crate::error::{PollError, PollResult};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per second for callers presenting a session cookie
    pub authenticated_rps: u32,
    /// Requests per second for anonymous callers
    pub anonymous_rps: u32,
    /// Burst size
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            authenticated_rps: 100,
            anonymous_rps: 20,
            burst_size: 50,
        }
    }
}

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    authenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    anonymous: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let auth_quota = Quota::per_second(
            NonZeroU32::new(config.authenticated_rps).unwrap_or(NonZeroU32::new(100).unwrap()),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::new(50).unwrap()));

        let anon_quota = Quota::per_second(
            NonZeroU32::new(config.anonymous_rps).unwrap_or(NonZeroU32::new(20).unwrap()),
        )
        .allow_burst(
            NonZeroU32::new(config.burst_size / 5).unwrap_or(NonZeroU32::new(10).unwrap()),
        );

        Self {
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            anonymous: Arc::new(GovernorLimiter::direct(anon_quota)),
        }
    }

    /// Check rate limit for a caller presenting a session cookie
    pub fn check_authenticated(&self) -> PollResult<()> {
        match self.authenticated.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(PollError::RateLimited),
        }
    }

    /// Check rate limit for an anonymous caller
    pub fn check_anonymous(&self) -> PollResult<()> {
        match self.anonymous.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(PollError::RateLimited),
        }
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !ctx.config.rate_limit.enabled {
        return Ok(next.run(request).await);
    }

    let has_session_cookie =
        crate::auth::gate::extract_session_token(request.headers()).is_some();

    let result = if has_session_cookie {
        ctx.rate_limiter.check_authenticated()
    } else {
        ctx.rate_limiter.check_anonymous()
    };

    match result {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => Err(StatusCode::TOO_MANY_REQUESTS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(RateLimitConfig::default());

        assert!(limiter.check_authenticated().is_ok());
        assert!(limiter.check_anonymous().is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let config = RateLimitConfig {
            authenticated_rps: 10,
            anonymous_rps: 5,
            burst_size: 5,
        };
        let limiter = RateLimiter::new(config);

        for _ in 0..5 {
            assert!(limiter.check_authenticated().is_ok());
        }

        assert!(limiter.check_authenticated().is_err());
    }
}
