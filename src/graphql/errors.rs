use async_graphql::{Error, ErrorExtensions};

use crate::error::AppError;

pub mod codes {
    pub const SYNTAX: &str = "GRAPHQL_SYNTAX_ERROR";
    pub const VALIDATION: &str = "GRAPHQL_VALIDATION_ERROR";
    pub const BAD_USER_INPUT: &str = "BAD_USER_INPUT";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const UPSTREAM_UNAVAILABLE: &str = "UPSTREAM_UNAVAILABLE";
    pub const INTERNAL: &str = "INTERNAL_SERVER_ERROR";
}

fn code_for(e: &AppError) -> &'static str {
    match e {
        AppError::Validation(_) | AppError::PayloadTooLarge => codes::BAD_USER_INPUT,
        AppError::Unauthorized(_) => codes::UNAUTHORIZED,
        AppError::Forbidden => codes::FORBIDDEN,
        AppError::NotFound { .. } => codes::NOT_FOUND,
        AppError::Conflict(_) => codes::CONFLICT,
        AppError::UpstreamUnavailable(_) | AppError::Draining => codes::UPSTREAM_UNAVAILABLE,
        AppError::MethodNotAllowed | AppError::RateLimited { .. } | AppError::Internal => {
            codes::INTERNAL
        }
    }
}

/// Resolver-facing conversion; the message is the same text the REST envelope uses.
pub(super) fn resolver_error(e: AppError) -> Error {
    let code = code_for(&e);
    Error::new(e.to_string()).extend_with(|_, ext| ext.set("code", code))
}
