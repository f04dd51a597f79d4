//! Decision storage backends.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Decision store errors. Callers treat every one of these as a miss.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Stored bytes could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The ttl and policy resolved for a path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Decision {
    /// Shared cache lifetime in seconds. Zero means do not cache.
    pub ttl: u64,
    /// Policy to apply, `None` when no rule matched.
    pub policy: Option<String>,
}

impl Decision {
    pub fn new(ttl: u64, policy: impl Into<String>) -> Self {
        Self {
            ttl,
            policy: Some(policy.into()),
        }
    }

    /// The decision for a path no rule matches.
    pub fn uncached() -> Self {
        Self::default()
    }

    /// Check if the decision allows shared caching at all.
    pub fn is_cacheable(&self) -> bool {
        self.ttl > 0 && self.policy.is_some()
    }
}

/// Shared key-value store for memoized decisions.
///
/// Implementations must tolerate concurrent readers and writers. Every writer
/// stores the same value for a given key, so last-write-wins is fine.
pub trait DecisionStore: Send + Sync {
    /// Get a stored decision. Expired entries read as `None`.
    fn get(&self, key: &str) -> StoreResult<Option<Decision>>;

    /// Store a decision for `expires_in`.
    fn set(&self, key: &str, decision: &Decision, expires_in: Duration) -> StoreResult<()>;
}

/// Default entry limit of [`MemoryStore`].
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Process-local store. Holds at most `capacity` entries and evicts the
/// least recently used one past that.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<LruCache<String, (Decision, Instant)>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store bounded to `capacity` entries. Zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, (_, expires_at))| *expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            entries.pop(&key);
        }
    }
}

impl DecisionStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Decision>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let fresh = entries
            .get(key)
            .map(|(decision, expires_at)| (*expires_at > now).then(|| decision.clone()));
        if let Some(None) = fresh {
            entries.pop(key);
        }
        Ok(fresh.flatten())
    }

    fn set(&self, key: &str, decision: &Decision, expires_in: Duration) -> StoreResult<()> {
        let expires_at = Instant::now() + expires_in;
        self.entries
            .lock()
            .put(key.to_string(), (decision.clone(), expires_at));
        Ok(())
    }
}

/// Store that never remembers anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

impl DecisionStore for NoopStore {
    fn get(&self, _key: &str) -> StoreResult<Option<Decision>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _decision: &Decision, _expires_in: Duration) -> StoreResult<()> {
        Ok(())
    }
}
