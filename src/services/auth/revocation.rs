use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

/// Set of revoked access-token ids, each kept until the token would have expired anyway.
#[derive(Debug, Default)]
pub struct RevocationSet {
    entries: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl RevocationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent. A later expiry wins over an earlier one.
    pub fn revoke_until(&self, token_id: Uuid, expires_at: DateTime<Utc>) {
        let mut entries = self.entries.write();
        entries
            .entry(token_id)
            .and_modify(|current| {
                if *current < expires_at {
                    *current = expires_at;
                }
            })
            .or_insert(expires_at);
    }

    pub fn contains(&self, token_id: &Uuid) -> bool {
        self.entries.read().contains_key(token_id)
    }

    /// Drop entries whose token has expired at `now`. Returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Live access tokens per subject, so every credential of one subject can be revoked
/// at once (account deleted, role changed). Entries leave at their token's expiry.
#[derive(Debug, Default)]
pub struct IssuedTokens {
    by_subject: RwLock<HashMap<Uuid, Vec<(Uuid, DateTime<Utc>)>>>,
}

impl IssuedTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, subject_id: Uuid, token_id: Uuid, expires_at: DateTime<Utc>) {
        self.by_subject
            .write()
            .entry(subject_id)
            .or_default()
            .push((token_id, expires_at));
    }

    /// Remove and return the subject's outstanding `(token_id, expires_at)` pairs.
    pub fn take(&self, subject_id: &Uuid) -> Vec<(Uuid, DateTime<Utc>)> {
        self.by_subject
            .write()
            .remove(subject_id)
            .unwrap_or_default()
    }

    /// Drop tokens that expired at `now`. Returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let mut by_subject = self.by_subject.write();
        let mut removed = 0;
        by_subject.retain(|_, tokens| {
            let before = tokens.len();
            tokens.retain(|(_, expires_at)| *expires_at > now);
            removed += before - tokens.len();
            !tokens.is_empty()
        });
        removed
    }
}
