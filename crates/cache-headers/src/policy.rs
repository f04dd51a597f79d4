//! Cache bucketing policies.
//!
//! A policy looks at who is asking and the resolved ttl, and returns the
//! headers that tell the upstream cache whether to store the response and
//! which bucket it belongs to. Policies never see the response body.

use cache_headers_core::{CacheHeadersConfig, Identity, SessionKey};
use chrono::{DateTime, Utc};

use crate::headers::{header_names, http_date, vary_value, HeaderSet};

/// Names of the built-in policies.
pub mod policy_names {
    pub const ALL_USERS: &str = "all-users";
    pub const ANONYMOUS_ONLY: &str = "anonymous-only";
    pub const ANONYMOUS_AND_AUTHENTICATED: &str = "anonymous-and-authenticated";
    pub const PER_USER: &str = "per-user";
}

/// Cookie names that appear in `X-Hash-Cookies`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
    pub session: String,
    pub auth: String,
    pub messages: String,
}

impl Default for CookieNames {
    fn default() -> Self {
        Self::from_config(&CacheHeadersConfig::default())
    }
}

impl CookieNames {
    pub fn from_config(config: &CacheHeadersConfig) -> Self {
        Self {
            session: config.session_cookie_name.clone(),
            auth: config.auth_cookie_name.clone(),
            messages: config.messages_cookie_name.clone(),
        }
    }

    /// `X-Hash-Cookies` value listing the given cookies after `messages`.
    pub fn hash_list(&self, extra: &[&str]) -> String {
        std::iter::once(self.messages.as_str())
            .chain(extra.iter().copied())
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Everything a policy may base its decision on.
#[derive(Debug, Clone)]
pub struct PolicyContext<'a> {
    /// The requester.
    pub identity: &'a Identity,
    /// Session backing the request, if any.
    pub session_key: Option<&'a SessionKey>,
    /// Shared cache lifetime in seconds.
    pub ttl: u64,
    /// Browser `max-age` in seconds.
    pub browser_ttl: u64,
    /// Cookie names for `X-Hash-Cookies`.
    pub cookies: &'a CookieNames,
    /// Decision time, used for `Last-Modified`.
    pub now: DateTime<Utc>,
}

impl PolicyContext<'_> {
    pub fn is_anonymous(&self) -> bool {
        self.identity.is_anonymous()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_authenticated()
    }

    /// `max-age=<browser>, s-maxage=<ttl>`.
    pub fn cache_control(&self) -> String {
        format!("max-age={}, s-maxage={}", self.browser_ttl, self.ttl)
    }

    /// Headers shared by every cacheable outcome: `Cache-Control`,
    /// `Last-Modified` and `X-Accel-Expires`.
    pub fn cacheable(&self) -> HeaderSet {
        HeaderSet::new()
            .with(header_names::LAST_MODIFIED, http_date(self.now))
            .with(header_names::X_ACCEL_EXPIRES, self.ttl)
            .with(header_names::CACHE_CONTROL, self.cache_control())
    }
}

/// A named bucketing strategy.
///
/// Closures with the signature `Fn(&PolicyContext) -> HeaderSet` are policies
/// too, so hosts can register ad-hoc ones.
pub trait CachePolicy: Send + Sync {
    /// Compute the headers for a requester. Only called with a non-zero ttl.
    fn apply(&self, ctx: &PolicyContext<'_>) -> HeaderSet;
}

impl<F> CachePolicy for F
where
    F: Fn(&PolicyContext<'_>) -> HeaderSet + Send + Sync,
{
    fn apply(&self, ctx: &PolicyContext<'_>) -> HeaderSet {
        self(ctx)
    }
}

/// One cached response for everybody.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllUsers;

impl CachePolicy for AllUsers {
    fn apply(&self, ctx: &PolicyContext<'_>) -> HeaderSet {
        ctx.cacheable()
            .with(header_names::X_HASH_COOKIES, ctx.cookies.hash_list(&[]))
            .with(header_names::VARY, vary_value(&[]))
    }
}

/// One cached response for anonymous requesters; authenticated ones bypass
/// the shared cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousOnly;

impl CachePolicy for AnonymousOnly {
    fn apply(&self, ctx: &PolicyContext<'_>) -> HeaderSet {
        if ctx.is_authenticated() {
            return HeaderSet::no_cache();
        }

        ctx.cacheable()
            .with(header_names::X_IS_ANONYMOUS, 1)
            .with(
                header_names::X_HASH_COOKIES,
                ctx.cookies.hash_list(&[ctx.cookies.auth.as_str()]),
            )
            .with(header_names::VARY, vary_value(&[header_names::X_IS_ANONYMOUS]))
    }
}

/// Two cached variants: anonymous and authenticated.
///
/// Spoofing the auth signal reveals the authenticated variant, so this is
/// unsuitable for content behind a paywall.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAndAuthenticated;

impl CachePolicy for AnonymousAndAuthenticated {
    fn apply(&self, ctx: &PolicyContext<'_>) -> HeaderSet {
        ctx.cacheable()
            .with(
                header_names::X_IS_AUTHENTICATED,
                u8::from(ctx.is_authenticated()),
            )
            .with(
                header_names::X_HASH_COOKIES,
                ctx.cookies.hash_list(&[ctx.cookies.auth.as_str()]),
            )
            .with(
                header_names::VARY,
                vary_value(&[header_names::X_IS_AUTHENTICATED]),
            )
    }
}

/// One shared variant for anonymous requesters, one per session for
/// authenticated ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerUser;

impl CachePolicy for PerUser {
    fn apply(&self, ctx: &PolicyContext<'_>) -> HeaderSet {
        let bucket = if ctx.is_anonymous() {
            "0".to_string()
        } else {
            match ctx.session_key {
                Some(key) => key.to_string(),
                // Without a session there is no bucket to keep users apart.
                None => return HeaderSet::no_cache(),
            }
        };

        ctx.cacheable()
            .with(header_names::X_SESSION, bucket)
            .with(
                header_names::X_HASH_COOKIES,
                ctx.cookies.hash_list(&[ctx.cookies.session.as_str()]),
            )
            .with(header_names::VARY, vary_value(&[header_names::X_SESSION]))
    }
}
