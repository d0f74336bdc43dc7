//! Per-client fixed-window throttling.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, request::Parts};
use axum::response::Response;
use tracing::warn;

use super::chain::{Flow, Interceptor};
use super::context::{Quota, RequestContext};
use crate::error::AppError;
use crate::services::metrics::GatewayMetrics;
use crate::services::rate_limit::{RateDecision, RateLimiter};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

#[derive(Debug, Clone)]
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
    metrics: Arc<GatewayMetrics>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { limiter, metrics }
    }
}

impl Interceptor for RateLimit {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn before(&self, ctx: &mut RequestContext, _parts: &mut Parts) -> Flow {
        if !self.limiter.policy().enabled {
            return Flow::Continue;
        }

        match self.limiter.check(&ctx.client) {
            RateDecision::Allowed { limit, remaining } => {
                ctx.quota = Some(Quota { limit, remaining });
                Flow::Continue
            }
            RateDecision::Limited { limit, retry_after } => {
                ctx.quota = Some(Quota {
                    limit,
                    remaining: 0,
                });
                self.metrics.rate_limited();
                warn!(
                    request_id = %ctx.request_id,
                    client = %ctx.client,
                    limit,
                    "rate limit exceeded"
                );
                Flow::reject(AppError::RateLimited { retry_after })
            }
        }
    }

    fn after(&self, ctx: &RequestContext, response: &mut Response) {
        let Some(quota) = ctx.quota else {
            return;
        };
        let headers = response.headers_mut();
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(quota.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(quota.remaining));
    }
}
