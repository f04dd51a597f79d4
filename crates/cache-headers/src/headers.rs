//! Response header sets produced by cache policies.

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Header names understood by the upstream proxy.
pub mod header_names {
    pub const CACHE_CONTROL: &str = "Cache-Control";
    pub const LAST_MODIFIED: &str = "Last-Modified";
    pub const VARY: &str = "Vary";
    /// nginx: shared cache lifetime in seconds.
    pub const X_ACCEL_EXPIRES: &str = "X-Accel-Expires";
    /// Pipe-delimited cookie names the proxy folds into its cache key.
    pub const X_HASH_COOKIES: &str = "X-Hash-Cookies";
    pub const X_IS_ANONYMOUS: &str = "X-Is-Anonymous";
    pub const X_IS_AUTHENTICATED: &str = "X-Is-Authenticated";
    pub const X_USER: &str = "X-User";
    pub const X_SESSION: &str = "X-Session";
    /// Always part of `Vary`.
    pub const ACCEPT_ENCODING: &str = "Accept-Encoding";
}

/// The `Cache-Control` value for responses that must not be cached.
pub const NO_CACHE: &str = "no-cache";

/// Ordered header name/value pairs. Names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only `Cache-Control: no-cache`.
    pub fn no_cache() -> Self {
        let mut set = Self::new();
        set.insert(header_names::CACHE_CONTROL, NO_CACHE);
        set
    }

    /// Insert a header, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        let name = name.into();
        let value = value.to_string();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The `Cache-Control` value, if set.
    pub fn cache_control(&self) -> Option<&str> {
        self.get(header_names::CACHE_CONTROL)
    }

    /// Check if the set allows a shared cache to store the response.
    pub fn is_cacheable(&self) -> bool {
        self.cache_control().is_some_and(|cc| cc != NO_CACHE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every header onto a response header map, replacing prior values.
    ///
    /// Pairs that are not valid HTTP header names or values are skipped.
    pub fn apply_to(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.entries {
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) else {
                tracing::warn!(header = %name, "skipping invalid cache header");
                continue;
            };
            headers.insert(name, value);
        }
    }

    /// Convert to JSON for debugging output.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Compose a `Vary` value from `Accept-Encoding` plus the given dimensions.
pub fn vary_value(dimensions: &[&str]) -> String {
    std::iter::once(header_names::ACCEPT_ENCODING)
        .chain(dimensions.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

/// Format a timestamp as an HTTP date (IMF-fixdate).
pub fn http_date(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
