//! Cache header configuration.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// `{policy name -> {ttl seconds -> [path pattern, ...]}}`.
///
/// Ttl keys stay strings here so TOML and JSON files can both express them;
/// they are parsed when the rule table is built.
pub type Timeouts = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheHeadersConfig {
    /// Path patterns per policy and ttl.
    #[serde(default)]
    pub timeouts: Timeouts,

    /// `max-age` handed to browsers for cacheable responses.
    #[serde(default = "default_browser_cache_seconds")]
    pub browser_cache_seconds: u64,

    /// Reject requests whose cookies contradict the real auth state.
    #[serde(default)]
    pub enable_tampering_checks: bool,

    /// Development mode: leave every response untouched.
    #[serde(default)]
    pub debug: bool,

    /// Name of the cookie that carries the session key.
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,

    /// Name of the auth-signal cookie read by the upstream proxy.
    #[serde(default = "default_auth_cookie_name")]
    pub auth_cookie_name: String,

    /// Name of the cookie that carries flash messages.
    #[serde(default = "default_messages_cookie_name")]
    pub messages_cookie_name: String,

    /// Query parameter used to bust the shared cache.
    #[serde(default = "default_cache_bust_parameter")]
    pub cache_bust_parameter: String,

    /// Memoization of path decisions.
    #[serde(default)]
    pub decision_cache: DecisionCacheConfig,
}

fn default_browser_cache_seconds() -> u64 {
    5
}

fn default_session_cookie_name() -> String {
    "sessionid".to_string()
}

fn default_auth_cookie_name() -> String {
    "isauthenticated".to_string()
}

fn default_messages_cookie_name() -> String {
    "messages".to_string()
}

fn default_cache_bust_parameter() -> String {
    "dch-uuid".to_string()
}

impl Default for CacheHeadersConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::new(),
            browser_cache_seconds: default_browser_cache_seconds(),
            enable_tampering_checks: false,
            debug: false,
            session_cookie_name: default_session_cookie_name(),
            auth_cookie_name: default_auth_cookie_name(),
            messages_cookie_name: default_messages_cookie_name(),
            cache_bust_parameter: default_cache_bust_parameter(),
            decision_cache: DecisionCacheConfig::default(),
        }
    }
}

impl CacheHeadersConfig {
    /// Load config from a TOML or JSON file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&content).map_err(|e| with_path(e, &display))
        } else {
            Self::from_toml(&content).map_err(|e| with_path(e, &display))
        }
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<toml>".to_string(),
            reason: e.to_string(),
        })
    }

    /// Parse a JSON document.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<json>".to_string(),
            reason: e.to_string(),
        })
    }

    /// Add path patterns for a policy and ttl.
    pub fn with_rules(mut self, policy: &str, ttl: u64, patterns: &[&str]) -> Self {
        self.timeouts
            .entry(policy.to_string())
            .or_default()
            .entry(ttl.to_string())
            .or_default()
            .extend(patterns.iter().map(|p| p.to_string()));
        self
    }

    /// Set the browser `max-age`.
    pub fn with_browser_cache_seconds(mut self, secs: u64) -> Self {
        self.browser_cache_seconds = secs;
        self
    }

    /// Enable or disable tampering checks.
    pub fn with_tampering_checks(mut self, enabled: bool) -> Self {
        self.enable_tampering_checks = enabled;
        self
    }

    /// Enable or disable debug mode.
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Replace the decision cache settings.
    pub fn with_decision_cache(mut self, decision_cache: DecisionCacheConfig) -> Self {
        self.decision_cache = decision_cache;
        self
    }

    /// Names of all policies referenced by `timeouts`.
    pub fn referenced_policies(&self) -> impl Iterator<Item = &str> {
        self.timeouts.keys().map(|k| k.as_str())
    }
}

fn with_path(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::Parse { reason, .. } => ConfigError::Parse {
            path: path.to_string(),
            reason,
        },
        other => other,
    }
}

/// How decision cache keys are derived from the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDerivation {
    /// Hex digest of the path.
    #[default]
    Digest,
    /// The path itself.
    Raw,
}

/// Decision cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DecisionCacheConfig {
    /// Whether decisions are memoized at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Key derivation.
    #[serde(default)]
    pub key: KeyDerivation,

    /// Lifetime of a memoized decision. Independent of rule ttls.
    #[serde(default = "default_expiry_seconds")]
    pub expiry_seconds: u64,

    /// Most decisions the process-local store keeps. The least recently
    /// used entry is evicted past this.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_expiry_seconds() -> u64 {
    86_400
}

fn default_capacity() -> usize {
    10_000
}

impl Default for DecisionCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key: KeyDerivation::default(),
            expiry_seconds: default_expiry_seconds(),
            capacity: default_capacity(),
        }
    }
}

impl DecisionCacheConfig {
    /// Settings with memoization turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Generate a default `cache-headers.toml`.
pub fn generate_default_config() -> String {
    r#"# Cache header rules
#
# Patterns are regular expressions matched against the full request path.
# When several patterns match, the longest pattern string wins.

browser-cache-seconds = 5
enable-tampering-checks = false
session-cookie-name = "sessionid"
auth-cookie-name = "isauthenticated"

[decision-cache]
enabled = true
key = "digest"
expiry-seconds = 86400
capacity = 10000

[timeouts.all-users]
"600" = ["^/about/", "^/static-pages/"]

[timeouts.anonymous-only]
"300" = ["^/products/"]

[timeouts.anonymous-and-authenticated]
"300" = ["^/$"]

[timeouts.per-user]
"60" = ["^/account/"]
"#
    .to_string()
}
