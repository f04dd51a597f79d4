//! Policy registry: name to policy implementation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::policy::{
    policy_names, AllUsers, AnonymousAndAuthenticated, AnonymousOnly, CachePolicy, PerUser,
};

/// Errors from policy lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// A decision names a policy the registry does not hold.
    #[error("policy not registered: {0}")]
    NotRegistered(String),
}

/// Named policies. Built once, then shared read-only.
#[derive(Clone)]
pub struct PolicyRegistry {
    policies: HashMap<String, Arc<dyn CachePolicy>>,
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("policies", &self.names())
            .finish()
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PolicyRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    /// A registry holding the four built-in policies.
    pub fn with_builtins() -> Self {
        Self::empty()
            .register(policy_names::ALL_USERS, AllUsers)
            .register(policy_names::ANONYMOUS_ONLY, AnonymousOnly)
            .register(
                policy_names::ANONYMOUS_AND_AUTHENTICATED,
                AnonymousAndAuthenticated,
            )
            .register(policy_names::PER_USER, PerUser)
    }

    /// Register a policy. A later registration under the same name wins.
    pub fn register(mut self, name: impl Into<String>, policy: impl CachePolicy + 'static) -> Self {
        self.policies.insert(name.into(), Arc::new(policy));
        self
    }

    /// Look up a policy by name.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn CachePolicy>, PolicyError> {
        self.policies
            .get(name)
            .ok_or_else(|| PolicyError::NotRegistered(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.policies.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderSet;
    use crate::policy::{CookieNames, PolicyContext};
    use cache_headers_core::Identity;

    #[test]
    fn test_builtins_registered() {
        let registry = PolicyRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec![
                "all-users",
                "anonymous-and-authenticated",
                "anonymous-only",
                "per-user"
            ]
        );
    }

    #[test]
    fn test_missing_policy() {
        let registry = PolicyRegistry::with_builtins();
        let err = registry.get("nope").err().unwrap();
        assert_eq!(err, PolicyError::NotRegistered("nope".to_string()));
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = PolicyRegistry::with_builtins()
            .register("all-users", |_: &PolicyContext<'_>| HeaderSet::new().with("X-Custom", "first"))
            .register("all-users", |_: &PolicyContext<'_>| HeaderSet::new().with("X-Custom", "second"));

        let cookies = CookieNames::default();
        let identity = Identity::Anonymous;
        let ctx = PolicyContext {
            identity: &identity,
            session_key: None,
            ttl: 600,
            browser_ttl: 5,
            cookies: &cookies,
            now: chrono::Utc::now(),
        };

        let headers = registry.get("all-users").unwrap().apply(&ctx);
        assert_eq!(headers.get("X-Custom"), Some("second"));
        assert_eq!(registry.names().len(), 4);
    }
}
