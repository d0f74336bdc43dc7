/*
 * Responsibility
 * - Gateway URL structure: /api/v1, /graphql, /graphql/ws, /ws, /health, /ready, /metrics
 * - Route classes for the auth stage (public / protected / optional auth)
 * - Router assembly: routes -> fallbacks -> transport layers -> admission chain
 */
pub mod graphql;
pub mod ops;
pub mod v1;
pub mod ws;

use axum::{Router, routing::get};

use crate::config::Config;
use crate::error::AppError;
use crate::middleware::{self, RouteClass};
use crate::state::AppState;

const PROTECTED_PREFIXES: [&str; 6] = [
    "/api/v1/alerts",
    "/api/v1/network",
    "/api/v1/firewall",
    "/api/v1/threats",
    "/api/v1/users",
    "/api/v1/dashboard",
];

fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Auth class of a request path. Unknown paths are public so they reach the 404
/// fallback instead of leaking which prefixes exist through 401s.
pub fn classify(path: &str) -> RouteClass {
    if path == "/ws"
        || path == "/graphql/ws"
        || PROTECTED_PREFIXES.iter().any(|p| under(path, p))
    {
        RouteClass::Protected
    } else if path == "/graphql" {
        RouteClass::OptionalAuth
    } else {
        RouteClass::Public
    }
}

async fn not_found() -> AppError {
    AppError::not_found("route")
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(ops::health))
        .route("/ready", get(ops::ready))
        .route("/metrics", get(ops::metrics))
        .route("/graphql", get(graphql::graphiql).post(graphql::graphql))
        .route("/graphql/ws", get(graphql::subscriptions))
        .route("/ws", get(ws::upgrade))
        .nest("/api/v1", v1::routes())
}

/// The complete gateway service. The admission chain is the outermost layer, so it
/// also wraps the fallbacks and the transport layers' own rejections.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let chain = middleware::admission_chain(config, &state, classify);

    let router = routes()
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state);

    let router = middleware::transport::apply(router, config.body_limit_bytes);
    middleware::chain::apply(router, chain)
}
