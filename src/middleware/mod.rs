/*
 * Responsibility
 * - The admission chain (interceptor trait + dispatcher) and its per-request context
 * - The fixed stage list: correlation -> cors -> access log -> drain guard -> rate limit -> auth
 * - Transport layers (body limit, security headers)
 */
pub mod access_log;
pub mod auth;
pub mod chain;
pub mod context;
pub mod cors;
pub mod correlation;
pub mod drain;
pub mod rate_limit;
pub mod transport;

use std::sync::Arc;

pub use auth::{Classifier, RouteClass};
pub use chain::{Chain, Flow, Interceptor};
pub use context::{ContextSettings, RequestContext};

use crate::config::Config;
use crate::state::AppState;

/// The gateway's admission chain in its fixed order.
pub fn admission_chain(config: &Config, state: &AppState, classify: Classifier) -> Chain {
    Chain::builder(ContextSettings {
        request_deadline: config.request_deadline,
        trust_proxy_headers: config.trust_proxy_headers,
    })
    .stage(correlation::Correlation)
    .stage(cors::Cors::from_config(config))
    .stage(access_log::AccessLog::new(Arc::clone(&state.metrics)))
    .stage(drain::DrainGuard::new(state.lifecycle.clone()))
    .stage(rate_limit::RateLimit::new(
        Arc::clone(&state.limiter),
        Arc::clone(&state.metrics),
    ))
    .stage(auth::Authenticate::new(
        Arc::clone(&state.tokens),
        Arc::clone(&state.metrics),
        classify,
    ))
    .build()
}
