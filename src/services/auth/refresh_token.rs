use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::error;
use uuid::Uuid;

use super::error::TokenError;
use super::principal::Role;

/// What a refresh token is bound to. Keyed by the token's SHA-256 in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    pub subject_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Storage for outstanding refresh tokens.
///
/// `consume` must remove and return the record in one step, so two concurrent
/// refreshes with the same token cannot both succeed.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, token_hash: Vec<u8>, record: RefreshRecord) -> Result<(), TokenError>;

    async fn consume(&self, token_hash: &[u8]) -> Result<Option<RefreshRecord>, TokenError>;

    /// Drop records that expired before `now`. Returns how many were removed.
    async fn prune(&self, now: DateTime<Utc>) -> Result<usize, TokenError>;

    /// Drop every record bound to `subject_id`. Returns how many were removed.
    async fn revoke_subject(&self, subject_id: Uuid) -> Result<usize, TokenError>;
}

/// Process-local refresh token store.
#[derive(Debug, Default)]
pub struct InMemoryRefreshStore {
    records: Mutex<HashMap<Vec<u8>, RefreshRecord>>,
}

impl InMemoryRefreshStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshStore {
    async fn insert(&self, token_hash: Vec<u8>, record: RefreshRecord) -> Result<(), TokenError> {
        self.records.lock().insert(token_hash, record);
        Ok(())
    }

    async fn consume(&self, token_hash: &[u8]) -> Result<Option<RefreshRecord>, TokenError> {
        Ok(self.records.lock().remove(token_hash))
    }

    async fn prune(&self, now: DateTime<Utc>) -> Result<usize, TokenError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| record.expires_at > now);
        Ok(before - records.len())
    }

    async fn revoke_subject(&self, subject_id: Uuid) -> Result<usize, TokenError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| record.subject_id != subject_id);
        Ok(before - records.len())
    }
}

/// 32 bytes of entropy, URL-safe base64 without padding.
pub fn generate_refresh_token() -> Result<String, TokenError> {
    let mut bytes = [0u8; 32];
    getrandom::fill(&mut bytes).map_err(|e| {
        error!(error = %e, "getrandom failed");
        TokenError::Entropy
    })?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

pub fn hash_refresh_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(expires_at: DateTime<Utc>) -> RefreshRecord {
        RefreshRecord {
            subject_id: Uuid::new_v4(),
            role: Role::User,
            expires_at,
        }
    }

    #[test]
    fn test_generated_tokens_are_distinct_and_url_safe() {
        let a = generate_refresh_token().expect("token");
        let b = generate_refresh_token().expect("token");

        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let store = InMemoryRefreshStore::new();
        let hash = hash_refresh_token("abc");
        let rec = record(Utc::now() + Duration::days(1));

        store.insert(hash.clone(), rec.clone()).await.expect("insert");

        assert_eq!(store.consume(&hash).await.expect("consume"), Some(rec));
        assert_eq!(store.consume(&hash).await.expect("consume"), None);
    }

    #[tokio::test]
    async fn test_prune_removes_expired_records() {
        let store = InMemoryRefreshStore::new();
        let now = Utc::now();

        store
            .insert(hash_refresh_token("old"), record(now - Duration::seconds(1)))
            .await
            .expect("insert");
        store
            .insert(hash_refresh_token("new"), record(now + Duration::seconds(1)))
            .await
            .expect("insert");

        assert_eq!(store.prune(now).await.expect("prune"), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_subject_leaves_other_subjects() {
        let store = InMemoryRefreshStore::new();
        let expires_at = Utc::now() + Duration::days(1);
        let gone = record(expires_at);
        let kept = record(expires_at);

        store
            .insert(hash_refresh_token("a"), gone.clone())
            .await
            .expect("insert");
        store
            .insert(hash_refresh_token("b"), gone.clone())
            .await
            .expect("insert");
        store
            .insert(hash_refresh_token("c"), kept)
            .await
            .expect("insert");

        assert_eq!(store.revoke_subject(gone.subject_id).await.expect("revoke"), 2);
        assert_eq!(store.len(), 1);
        assert!(store.consume(&hash_refresh_token("c")).await.expect("consume").is_some());
    }
}
