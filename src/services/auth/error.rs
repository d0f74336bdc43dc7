use thiserror::Error;

/// Failures of the token lifecycle (issue / validate / refresh / revoke).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token revoked")]
    Revoked,
    #[error("malformed token")]
    Malformed,
    #[error("invalid refresh token")]
    InvalidRefreshToken,
    #[error("failed to sign token")]
    Signing,
    #[error("entropy source unavailable")]
    Entropy,
    #[error("refresh token store error: {0}")]
    Store(String),
}

impl TokenError {
    /// Short label used for logs and the auth-failure metric.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Expired => "expired",
            TokenError::Revoked => "revoked",
            TokenError::Malformed => "malformed",
            TokenError::InvalidRefreshToken => "invalid_refresh",
            TokenError::Signing | TokenError::Entropy | TokenError::Store(_) => "internal",
        }
    }

    /// Whether the failure is the caller's fault (as opposed to ours).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            TokenError::Signing | TokenError::Entropy | TokenError::Store(_)
        )
    }
}
