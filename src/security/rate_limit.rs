//! Per-key token bucket persisted in page-scoped storage.
//!
//! Refill is lazy and burst-shaped: on every read, each full refill interval
//! elapsed since the last refill restores `capacity` tokens (capped), and the
//! refill timestamp only advances when at least one interval has elapsed.
//! Callers get "N attempts per interval since exhaustion", not a smooth rate.
//!
//! Concurrent writers sharing one store (two consoles on the same state file)
//! are last-writer-wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::BucketConfig;
use crate::observability::metrics;
use crate::storage::KeyValueStore;

/// Storage key prefix for limiter records.
pub const KEY_PREFIX: &str = "rate:";

/// Bucket name guarding operator login.
pub const LOGIN_BUCKET: &str = "counter-login";

/// Bucket name guarding code verification.
pub const VERIFY_BUCKET: &str = "verify-code";

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Persisted bucket record: `{"tokens": n, "lastRefillTimestamp": ms}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketState {
    pub tokens: u32,
    #[serde(alias = "ts")]
    pub last_refill_timestamp: u64,
}

impl BucketState {
    fn full(capacity: u32, now: u64) -> Self {
        Self {
            tokens: capacity,
            last_refill_timestamp: now,
        }
    }

    /// Apply burst refill for every full interval elapsed.
    fn refill(&mut self, capacity: u32, refill_interval_ms: u64, now: u64) {
        let elapsed = now.saturating_sub(self.last_refill_timestamp);
        let intervals = elapsed / refill_interval_ms.max(1);
        if intervals >= 1 {
            let restored = intervals.saturating_mul(u64::from(capacity));
            let tokens = u64::from(self.tokens).saturating_add(restored);
            self.tokens = tokens.min(u64::from(capacity)) as u32;
            self.last_refill_timestamp = now;
        }
        self.tokens = self.tokens.min(capacity);
    }
}

/// Token bucket limiter for a single action key.
#[derive(Clone)]
pub struct RateLimiter {
    name: String,
    capacity: u32,
    refill_interval_ms: u64,
    store: Option<Arc<dyn KeyValueStore>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter for `name` persisted in `store`.
    pub fn new(
        name: impl Into<String>,
        capacity: u32,
        refill_interval_ms: u64,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            name: name.into(),
            capacity,
            refill_interval_ms,
            store: Some(store),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(
        name: impl Into<String>,
        bucket: &BucketConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::new(name, bucket.capacity, bucket.refill_interval_ms, store)
    }

    /// A limiter with no backing store. Every attempt is permitted.
    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: 0,
            refill_interval_ms: 1,
            store: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock (tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    fn storage_key(&self) -> String {
        format!("{KEY_PREFIX}{}", self.name)
    }

    /// Try to take `cost` tokens. Returns false without consuming when the
    /// bucket holds fewer than `cost` tokens.
    pub fn try_consume(&self, cost: u32) -> bool {
        let Some(store) = &self.store else {
            return true;
        };

        let now = self.clock.now_millis();
        let mut state = match self.load(store.as_ref(), now) {
            Some(state) => state,
            None => return true,
        };

        let allowed = state.tokens >= cost;
        if allowed {
            state.tokens -= cost;
        }
        self.persist(store.as_ref(), &state);

        if !allowed {
            tracing::warn!(key = %self.name, tokens = state.tokens, cost, "Rate limit exceeded");
            metrics::record_rate_limited(&self.name);
        }
        allowed
    }

    /// Tokens currently available after refill, or `None` when disabled or the
    /// store is unreadable.
    pub fn remaining(&self) -> Option<u32> {
        let store = self.store.as_ref()?;
        let now = self.clock.now_millis();
        let state = self.load(store.as_ref(), now)?;
        self.persist(store.as_ref(), &state);
        Some(state.tokens)
    }

    /// Read the record with refill applied. `None` means the store failed and
    /// the limiter should permit.
    fn load(&self, store: &dyn KeyValueStore, now: u64) -> Option<BucketState> {
        let raw = match store.get(&self.storage_key()) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %self.name, error = %e, "Rate limiter store unavailable, permitting");
                return None;
            }
        };

        let mut state = match raw {
            None => BucketState::full(self.capacity, now),
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(key = %self.name, error = %e, "Discarding unreadable rate limiter record");
                BucketState::full(self.capacity, now)
            }),
        };
        state.refill(self.capacity, self.refill_interval_ms, now);
        Some(state)
    }

    fn persist(&self, store: &dyn KeyValueStore, state: &BucketState) {
        let result = serde_json::to_string(state)
            .map_err(crate::storage::StoreError::from)
            .and_then(|raw| store.set(&self.storage_key(), &raw));
        if let Err(e) = result {
            tracing::warn!(key = %self.name, error = %e, "Failed to persist rate limiter record");
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("refill_interval_ms", &self.refill_interval_ms)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
