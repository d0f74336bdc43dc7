/*
 * Responsibility
 * - Types handlers receive from the admission chain
 * - The chain validates and stores the RequestContext in request extensions; handlers
 *   only take these extractors
 */
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::error;

use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::services::auth::Principal;

/// The request's context (request id, deadline, optional principal).
#[derive(Debug, Clone)]
pub struct Ctx(pub RequestContext);

/// The authenticated caller. Rejects with 401 when the chain attached no principal.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

fn context(parts: &Parts) -> Result<&RequestContext, AppError> {
    parts.extensions.get::<RequestContext>().ok_or_else(|| {
        // Routes are only reachable through the chain; reaching here is a wiring bug.
        error!(path = %parts.uri.path(), "request context missing");
        AppError::Internal
    })
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        context(parts).cloned().map(Ctx)
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = context(parts)?.principal()?.clone();
        Ok(Authenticated(principal))
    }
}
