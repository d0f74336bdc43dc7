//! Fixed-window request counting per client key.
//!
//! Each key owns one bucket in a `DashMap`; the entry guard is the per-key lock, so
//! increments for the same client are linearizable and different clients never
//! contend on a global lock.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub enabled: bool,
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { limit: u32, remaining: u32 },
    Limited { limit: u32, retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug)]
struct Bucket {
    count: u32,
    window_start: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            buckets: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Count one request for `key` at `now`.
    ///
    /// The count is incremented before comparing, so with a limit of N the
    /// (N+1)-th request inside a window is the first one refused.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let limit = self.policy.max_requests;
        let window = self.policy.window;

        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| {
            debug!(client = %key, "creating rate limit bucket");
            Bucket {
                count: 0,
                window_start: now,
            }
        });

        if now.saturating_duration_since(bucket.window_start) >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }

        bucket.count = bucket.count.saturating_add(1);

        if bucket.count > limit {
            let window_end = bucket.window_start + window;
            RateDecision::Limited {
                limit,
                retry_after: window_end.saturating_duration_since(now),
            }
        } else {
            RateDecision::Allowed {
                limit,
                remaining: limit - bucket.count,
            }
        }
    }

    /// Remove buckets whose window closed before `now`. Returns how many were removed.
    pub fn cleanup(&self, now: Instant) -> usize {
        let window = self.policy.window;
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.window_start) < window);
        before.saturating_sub(self.buckets.len())
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Seconds for a `Retry-After` header: rounded up, never zero.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}
