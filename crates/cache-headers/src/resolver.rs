//! Path resolution with a memoizing decision cache.

use std::sync::Arc;
use std::time::Duration;

use cache_headers_core::{DecisionCacheConfig, KeyDerivation};
use sha2::{Digest, Sha256};

use crate::rules::RuleTable;
use crate::store::{Decision, DecisionStore, MemoryStore, NoopStore};

/// Prefix for decision cache keys.
pub const KEY_PREFIX: &str = "dch-";

/// Derive the decision cache key for a full path.
pub fn decision_key(derivation: KeyDerivation, full_path: &str) -> String {
    match derivation {
        KeyDerivation::Digest => {
            format!("{}{}", KEY_PREFIX, hex::encode(Sha256::digest(full_path.as_bytes())))
        }
        KeyDerivation::Raw => format!("{}{}", KEY_PREFIX, full_path),
    }
}

/// Where a resolved decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// Served from the decision store.
    Store,
    /// Computed by scanning the rule table.
    Scan,
}

/// Resolves paths to decisions.
///
/// The store is an optimization only: a scan and a store hit always agree.
#[derive(Clone)]
pub struct DecisionResolver {
    rules: Arc<RuleTable>,
    store: Arc<dyn DecisionStore>,
    derivation: KeyDerivation,
    expires_in: Duration,
}

impl std::fmt::Debug for DecisionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionResolver")
            .field("rules", &self.rules.len())
            .field("derivation", &self.derivation)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl DecisionResolver {
    /// Create a resolver backed by the given store.
    pub fn new(rules: Arc<RuleTable>, store: Arc<dyn DecisionStore>) -> Self {
        let defaults = DecisionCacheConfig::default();
        Self {
            rules,
            store,
            derivation: defaults.key,
            expires_in: Duration::from_secs(defaults.expiry_seconds),
        }
    }

    /// Create a resolver from decision cache settings, using a process-local
    /// store when enabled.
    pub fn from_config(rules: Arc<RuleTable>, config: &DecisionCacheConfig) -> Self {
        let store: Arc<dyn DecisionStore> = if config.enabled {
            Arc::new(MemoryStore::with_capacity(config.capacity))
        } else {
            Arc::new(NoopStore)
        };

        Self::new(rules, store)
            .with_key_derivation(config.key)
            .with_expiry(Duration::from_secs(config.expiry_seconds))
    }

    /// Set the key derivation.
    pub fn with_key_derivation(mut self, derivation: KeyDerivation) -> Self {
        self.derivation = derivation;
        self
    }

    /// Set how long memoized decisions live.
    pub fn with_expiry(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }

    /// Swap the backing store, keeping rules and key settings.
    pub fn with_store(mut self, store: Arc<dyn DecisionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Resolve a full path to a decision.
    pub fn resolve(&self, full_path: &str) -> Decision {
        self.resolve_explained(full_path).0
    }

    /// Resolve a full path and report whether the store answered.
    pub fn resolve_explained(&self, full_path: &str) -> (Decision, DecisionSource) {
        let key = decision_key(self.derivation, full_path);

        match self.store.get(&key) {
            Ok(Some(decision)) => return (decision, DecisionSource::Store),
            Ok(None) => tracing::debug!(path = full_path, "decision cache miss"),
            Err(e) => tracing::warn!(path = full_path, error = %e, "decision store read failed"),
        }

        let decision = self.resolve_uncached(full_path);
        if let Err(e) = self.store.set(&key, &decision, self.expires_in) {
            tracing::warn!(path = full_path, error = %e, "decision store write failed");
        }

        (decision, DecisionSource::Scan)
    }

    /// Resolve by scanning the rule table, bypassing the store.
    pub fn resolve_uncached(&self, full_path: &str) -> Decision {
        self.rules
            .find(full_path)
            .map(|rule| Decision::new(rule.ttl(), rule.policy()))
            .unwrap_or_else(Decision::uncached)
    }
}
