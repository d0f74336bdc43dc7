/*
 * Responsibility
 * - Gateway-wide AppError taxonomy
 * - IntoResponse: HTTP status + {"error": message} envelope
 * - Conversions from token / collaborator / extractor failures
 */
use std::time::Duration;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::services::auth::TokenError;
use crate::services::collaborators::CollaboratorError;
use crate::services::rate_limit::retry_after_secs;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("forbidden")]
    Forbidden,
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    Conflict(String),
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },
    #[error("{0} unavailable")]
    UpstreamUnavailable(&'static str),
    #[error("server is shutting down")]
    Draining,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::UpstreamUnavailable(_) | AppError::Draining => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();

        match self {
            AppError::RateLimited { retry_after } => {
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs(retry_after)),
                );
            }
            AppError::Draining => {
                response
                    .headers_mut()
                    .insert(header::CONNECTION, HeaderValue::from_static("close"));
            }
            _ => {}
        }

        response
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::Unauthorized("token expired"),
            TokenError::Revoked => AppError::Unauthorized("token revoked"),
            TokenError::Malformed => AppError::Unauthorized("invalid token"),
            TokenError::InvalidRefreshToken => AppError::Unauthorized("invalid refresh token"),
            TokenError::Signing | TokenError::Entropy | TokenError::Store(_) => {
                error!(error = %e, "token service failure");
                AppError::Internal
            }
        }
    }
}

impl From<CollaboratorError> for AppError {
    fn from(e: CollaboratorError) -> Self {
        match e {
            CollaboratorError::Unavailable {
                collaborator,
                reason,
            } => {
                warn!(collaborator, reason = %reason, "collaborator unavailable");
                AppError::UpstreamUnavailable(collaborator)
            }
            CollaboratorError::Rejected(message) => AppError::Validation(message),
            CollaboratorError::Conflict(message) => AppError::Conflict(message),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        // The body limit surfaces here when the request has no Content-Length.
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_envelope_has_error_field() {
        let response = AppError::not_found("alert").into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "alert not found");
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after: Duration::from_millis(2500),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");
    }

    #[test]
    fn test_token_errors_map_to_unauthorized() {
        for e in [
            TokenError::Expired,
            TokenError::Revoked,
            TokenError::Malformed,
            TokenError::InvalidRefreshToken,
        ] {
            assert_eq!(AppError::from(e).status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(
            AppError::from(TokenError::Signing).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_collaborator_unavailable_is_503() {
        let e = AppError::from(CollaboratorError::unavailable("capture_engine", "refused"));
        assert_eq!(e.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(e.to_string(), "capture_engine unavailable");
    }
}
