/*
 * Responsibility
 * - Bearer credential extraction (Authorization header, or `access_token` on WS upgrades)
 * - Token validation -> Principal on the RequestContext
 * - Fail closed on protected routes; optional-auth routes proceed anonymously when no
 *   credential is sent
 * - Authorization (admin / self checks) stays in handlers and resolvers
 */
use std::sync::Arc;

use axum::http::{HeaderMap, header, request::Parts};
use tracing::{debug, warn};

use super::chain::{Flow, Interceptor};
use super::context::RequestContext;
use crate::error::AppError;
use crate::services::auth::TokenService;
use crate::services::metrics::GatewayMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Protected,
    OptionalAuth,
}

pub type Classifier = fn(&str) -> RouteClass;

#[derive(Clone)]
pub struct Authenticate {
    tokens: Arc<TokenService>,
    metrics: Arc<GatewayMetrics>,
    classify: Classifier,
}

impl std::fmt::Debug for Authenticate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticate").finish_non_exhaustive()
    }
}

impl Authenticate {
    pub fn new(tokens: Arc<TokenService>, metrics: Arc<GatewayMetrics>, classify: Classifier) -> Self {
        Self {
            tokens,
            metrics,
            classify,
        }
    }

    fn fail(&self, ctx: &RequestContext, reason: &'static str, error: AppError) -> Flow {
        self.metrics.auth_failed(reason);
        warn!(
            request_id = %ctx.request_id,
            path = %ctx.path,
            client = %ctx.client,
            reason,
            "authentication failed"
        );
        Flow::reject(error)
    }
}

impl Interceptor for Authenticate {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn before(&self, ctx: &mut RequestContext, parts: &mut Parts) -> Flow {
        let class = (self.classify)(&ctx.path);
        if class == RouteClass::Public {
            return Flow::Continue;
        }

        let token = match credential(parts) {
            Ok(Some(token)) => token,
            Ok(None) if class == RouteClass::OptionalAuth => {
                debug!(request_id = %ctx.request_id, "no credential on optional-auth route");
                return Flow::Continue;
            }
            Ok(None) => {
                return self.fail(
                    ctx,
                    "missing",
                    AppError::Unauthorized("missing bearer token"),
                );
            }
            Err(e) => return self.fail(ctx, "malformed_header", e),
        };

        match self.tokens.validate(&token) {
            Ok(principal) => {
                debug!(
                    request_id = %ctx.request_id,
                    subject = %principal.subject_id,
                    role = %principal.role,
                    "authenticated"
                );
                ctx.principal = Some(principal);
                Flow::Continue
            }
            Err(e) => {
                let reason = e.reason();
                self.fail(ctx, reason, AppError::from(e))
            }
        }
    }
}

/// The bearer token carried by `Authorization`, if any.
///
/// A header that is present but not `Bearer <token>` is an error, not an absence.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let malformed = || AppError::Unauthorized("invalid authorization header");
    let value = value.to_str().map_err(|_| malformed())?;
    let (scheme, token) = value.trim().split_once(' ').ok_or_else(malformed)?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(malformed());
    }
    Ok(Some(token))
}

fn credential(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(token) = bearer_token(&parts.headers)? {
        return Ok(Some(token.to_string()));
    }
    if is_websocket_upgrade(&parts.headers) {
        return Ok(query_token(parts.uri.query()));
    }
    Ok(None)
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

fn query_token(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "access_token")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
