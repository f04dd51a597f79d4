//! Policy engine: resolve a path, then apply the chosen policy.

use std::sync::Arc;

use cache_headers_core::{AuthContext, CacheHeadersConfig, ConfigError, ConfigResult};
use chrono::{DateTime, Utc};

use crate::headers::HeaderSet;
use crate::policy::{CookieNames, PolicyContext};
use crate::registry::{PolicyError, PolicyRegistry};
use crate::resolver::{DecisionResolver, DecisionSource};
use crate::rules::RuleTable;
use crate::store::{Decision, DecisionStore};

/// Immutable engine built once at startup and shared across requests.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    config: Arc<CacheHeadersConfig>,
    registry: Arc<PolicyRegistry>,
    resolver: DecisionResolver,
    cookies: CookieNames,
}

impl PolicyEngine {
    /// Build the rule table and check that every referenced policy exists.
    pub fn new(config: CacheHeadersConfig, registry: PolicyRegistry) -> ConfigResult<Self> {
        let rules = Arc::new(RuleTable::from_timeouts(&config.timeouts)?);

        if let Some(missing) = rules.policies().into_iter().find(|name| !registry.contains(name)) {
            return Err(ConfigError::UnknownPolicy(missing.to_string()));
        }

        let resolver = DecisionResolver::from_config(rules, &config.decision_cache);
        let cookies = CookieNames::from_config(&config);

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            resolver,
            cookies,
        })
    }

    /// Replace the decision store, e.g. with one shared between processes.
    pub fn with_store(mut self, store: Arc<dyn DecisionStore>) -> Self {
        self.resolver = self.resolver.with_store(store);
        self
    }

    pub fn config(&self) -> &CacheHeadersConfig {
        &self.config
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &RuleTable {
        self.resolver.rules()
    }

    pub fn cookie_names(&self) -> &CookieNames {
        &self.cookies
    }

    /// Resolve the ttl and policy for a full path.
    pub fn decide(&self, full_path: &str) -> Decision {
        self.resolver.resolve(full_path)
    }

    /// Resolve and report whether the decision store answered.
    pub fn decide_explained(&self, full_path: &str) -> (Decision, DecisionSource) {
        self.resolver.resolve_explained(full_path)
    }

    /// Compute the headers for a decision and requester.
    ///
    /// A zero ttl or a missing policy always yields `no-cache`. A policy name
    /// that is not registered is an error.
    pub fn headers_for(
        &self,
        decision: &Decision,
        auth: &AuthContext,
        now: DateTime<Utc>,
    ) -> Result<HeaderSet, PolicyError> {
        let Some(name) = decision.policy.as_deref().filter(|_| decision.ttl > 0) else {
            return Ok(HeaderSet::no_cache());
        };

        let policy = self.registry.get(name)?;
        let ctx = PolicyContext {
            identity: &auth.identity,
            session_key: auth.session_key.as_ref(),
            ttl: decision.ttl,
            browser_ttl: self.config.browser_cache_seconds,
            cookies: &self.cookies,
            now,
        };

        tracing::debug!(policy = name, ttl = decision.ttl, "applying cache policy");
        Ok(policy.apply(&ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::NO_CACHE;
    use crate::policy::policy_names;
    use crate::store::MemoryStore;

    fn engine() -> PolicyEngine {
        let config = CacheHeadersConfig::default()
            .with_rules(policy_names::ANONYMOUS_ONLY, 600, &["^/a/"])
            .with_rules(policy_names::ALL_USERS, 0, &["^/zero/"]);
        PolicyEngine::new(config, PolicyRegistry::with_builtins()).unwrap()
    }

    #[test]
    fn test_unknown_policy_is_fatal() {
        let config = CacheHeadersConfig::default().with_rules("nope", 600, &["^/"]);
        let err = PolicyEngine::new(config, PolicyRegistry::with_builtins()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPolicy(name) if name == "nope"));
    }

    #[test]
    fn test_anonymous_only_end_to_end() {
        let engine = engine();
        let decision = engine.decide("/a/");
        assert_eq!(decision, Decision::new(600, "anonymous-only"));

        let anon = engine
            .headers_for(&decision, &AuthContext::anonymous(), Utc::now())
            .unwrap();
        assert_eq!(anon.cache_control(), Some("max-age=5, s-maxage=600"));

        let user = engine
            .headers_for(&decision, &AuthContext::authenticated("1"), Utc::now())
            .unwrap();
        assert_eq!(user.cache_control(), Some(NO_CACHE));
    }

    #[test]
    fn test_zero_ttl_and_unmatched_are_no_cache() {
        let engine = engine();
        for path in ["/zero/", "/unmapped/"] {
            let decision = engine.decide(path);
            assert_eq!(decision.ttl, 0);
            let headers = engine
                .headers_for(&decision, &AuthContext::anonymous(), Utc::now())
                .unwrap();
            assert_eq!(headers, HeaderSet::no_cache());
        }
    }

    #[test]
    fn test_unregistered_policy_at_response_time() {
        let engine = engine();
        let err = engine
            .headers_for(&Decision::new(60, "ghost"), &AuthContext::anonymous(), Utc::now())
            .unwrap_err();
        assert_eq!(err, PolicyError::NotRegistered("ghost".to_string()));
    }

    #[test]
    fn test_browser_ttl_is_configurable() {
        let config = CacheHeadersConfig::default()
            .with_rules(policy_names::ALL_USERS, 600, &["^/"])
            .with_browser_cache_seconds(30);
        let engine = PolicyEngine::new(config, PolicyRegistry::with_builtins()).unwrap();
        let headers = engine
            .headers_for(&engine.decide("/"), &AuthContext::anonymous(), Utc::now())
            .unwrap();
        assert_eq!(headers.cache_control(), Some("max-age=30, s-maxage=600"));
    }

    #[test]
    fn test_custom_store() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine().with_store(store.clone());
        engine.decide("/a/");
        assert_eq!(store.len(), 1);
        assert_eq!(engine.decide_explained("/a/").1, DecisionSource::Store);
    }
}
