use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::access_jwt::{AccessTokenClaims, AccessTokenCodec};
use super::error::TokenError;
use super::principal::{Principal, Role};
use super::refresh_token::{
    RefreshRecord, RefreshTokenStore, generate_refresh_token, hash_refresh_token,
};
use super::revocation::{IssuedTokens, RevocationSet};

/// Issues, validates, refreshes and revokes bearer credentials.
///
/// - Access tokens are HS256 JWTs; revocation is tracked by `jti` in a process-local set.
/// - Refresh tokens are opaque and single-use; every refresh rotates the pair.
/// - Every clock-dependent operation has an `*_at(now)` form.
pub struct TokenService {
    codec: AccessTokenCodec,
    revocations: RevocationSet,
    issued: IssuedTokens,
    refresh_store: Arc<dyn RefreshTokenStore>,
    refresh_ttl_seconds: u64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("codec", &self.codec)
            .field("revoked", &self.revocations.len())
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

/// A freshly minted access/refresh pair.
#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub access_token_id: Uuid,
    pub access_expires_at: DateTime<Utc>,
    pub principal: Principal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub revocations: usize,
    pub issued: usize,
    pub refresh_tokens: usize,
}

/// What `revoke_subject` withdrew.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubjectRevocation {
    pub access_tokens: usize,
    pub refresh_tokens: usize,
}

impl TokenService {
    pub fn new(
        codec: AccessTokenCodec,
        refresh_store: Arc<dyn RefreshTokenStore>,
        refresh_ttl_seconds: u64,
    ) -> Self {
        Self {
            codec,
            revocations: RevocationSet::new(),
            issued: IssuedTokens::new(),
            refresh_store,
            refresh_ttl_seconds,
        }
    }

    pub fn access_ttl_seconds(&self) -> u64 {
        self.codec.ttl_seconds()
    }

    pub async fn issue(&self, subject_id: Uuid, role: Role) -> Result<TokenPair, TokenError> {
        self.issue_at(subject_id, role, Utc::now()).await
    }

    pub async fn issue_at(
        &self,
        subject_id: Uuid,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let claims = self.codec.claims_for(subject_id, role, now);
        let access_token = self.codec.sign(&claims)?;

        let refresh_token = generate_refresh_token()?;
        let record = RefreshRecord {
            subject_id,
            role,
            expires_at: now + ChronoDuration::seconds(self.refresh_ttl_seconds as i64),
        };

        debug!(
            subject = %subject_id,
            jti = %claims.jti,
            refresh_expires_at = %record.expires_at,
            "issuing token pair"
        );

        self.refresh_store
            .insert(hash_refresh_token(&refresh_token), record)
            .await?;

        let access_token_id = claims.token_id()?;
        let access_expires_at = claims.expires_at()?;
        self.issued
            .record(subject_id, access_token_id, access_expires_at);

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.codec.ttl_seconds(),
            access_token_id,
            access_expires_at,
            principal: claims.principal()?,
        })
    }

    pub fn validate(&self, token: &str) -> Result<Principal, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Signature first, then expiry, then revocation.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenError> {
        let claims = self.codec.decode(token)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        if self.revocations.contains(&claims.token_id()?) {
            return Err(TokenError::Revoked);
        }

        claims.principal()
    }

    /// Signature and shape only; neither expiry nor revocation is consulted.
    pub fn inspect(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let claims = self.codec.decode(token)?;
        claims.token_id()?;
        claims.subject_id()?;
        Ok(claims)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        self.refresh_at(refresh_token, Utc::now()).await
    }

    /// Consume `refresh_token` and mint a new pair for the same subject and role.
    pub async fn refresh_at(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        let record = self
            .refresh_store
            .consume(&hash_refresh_token(refresh_token))
            .await?
            .ok_or_else(|| {
                debug!("refresh token not found or already used");
                TokenError::InvalidRefreshToken
            })?;

        if record.expires_at <= now {
            debug!(subject = %record.subject_id, "refresh token expired");
            return Err(TokenError::InvalidRefreshToken);
        }

        self.issue_at(record.subject_id, record.role, now).await
    }

    /// Revoke an access token whose expiry is unknown. The entry is kept for one
    /// access TTL, after which the token cannot be valid anyway.
    pub fn revoke(&self, token_id: Uuid) {
        let until = Utc::now() + ChronoDuration::seconds(self.codec.ttl_seconds() as i64);
        self.revoke_until(token_id, until);
    }

    pub fn revoke_until(&self, token_id: Uuid, expires_at: DateTime<Utc>) {
        self.revocations.revoke_until(token_id, expires_at);
        info!(jti = %token_id, until = %expires_at, "access token revoked");
    }

    /// Returns whether the refresh token was outstanding.
    pub async fn revoke_refresh(&self, refresh_token: &str) -> Result<bool, TokenError> {
        let removed = self
            .refresh_store
            .consume(&hash_refresh_token(refresh_token))
            .await?;
        Ok(removed.is_some())
    }

    /// Withdraw every credential issued to `subject_id`: outstanding access tokens are
    /// revoked until their own expiry and all refresh records are dropped.
    pub async fn revoke_subject(&self, subject_id: Uuid) -> Result<SubjectRevocation, TokenError> {
        let tokens = self.issued.take(&subject_id);
        for (token_id, expires_at) in &tokens {
            self.revocations.revoke_until(*token_id, *expires_at);
        }
        let refresh_tokens = self.refresh_store.revoke_subject(subject_id).await?;

        info!(
            subject = %subject_id,
            access_tokens = tokens.len(),
            refresh_tokens,
            "subject credentials revoked"
        );
        Ok(SubjectRevocation {
            access_tokens: tokens.len(),
            refresh_tokens,
        })
    }

    pub async fn prune(&self, now: DateTime<Utc>) -> Result<PruneReport, TokenError> {
        Ok(PruneReport {
            revocations: self.revocations.prune(now),
            issued: self.issued.prune(now),
            refresh_tokens: self.refresh_store.prune(now).await?,
        })
    }
}
