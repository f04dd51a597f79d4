//! Request context with typed auth state.

use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};

use crate::cookies::CookieJar;

/// Opaque session identifier, as stored in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    /// Create a session key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Who is making the request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identity {
    /// No authenticated user.
    #[default]
    Anonymous,
    /// A logged in user. The id is opaque to this crate.
    Authenticated { user_id: String },
}

impl Identity {
    /// Create an authenticated identity.
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::Authenticated {
            user_id: user_id.into(),
        }
    }

    /// Check if this is an anonymous requester.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Check if this is an authenticated requester.
    pub fn is_authenticated(&self) -> bool {
        !self.is_anonymous()
    }

    /// Get the user id, if authenticated.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { user_id } => Some(user_id),
        }
    }
}

/// How long the session cookie lives on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionExpiry {
    /// Cookie is dropped when the browser closes.
    #[default]
    BrowserSession,
    /// Cookie persists for the given number of seconds.
    Persistent { max_age_secs: u64 },
}

/// Auth state attached to a request by the host's authentication layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// The requester.
    pub identity: Identity,
    /// Key of the session backing this request, if one exists.
    pub session_key: Option<SessionKey>,
    /// Session cookie lifetime.
    pub expiry: SessionExpiry,
}

impl AuthContext {
    /// Anonymous requester without a session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated requester.
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            identity: Identity::user(user_id),
            ..Default::default()
        }
    }

    /// Attach a session key.
    pub fn with_session(mut self, key: impl Into<SessionKey>) -> Self {
        self.session_key = Some(key.into());
        self
    }

    /// Set the session cookie lifetime.
    pub fn with_expiry(mut self, expiry: SessionExpiry) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_anonymous()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_authenticated()
    }
}

/// Login/logout marker for the request being answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthEvent {
    /// No auth state transition happened.
    #[default]
    Normal,
    /// The user logged in while handling this request.
    Login,
    /// The user logged out while handling this request.
    Logout,
}

impl AuthEvent {
    /// Check if this request changed the auth state.
    pub fn is_transition(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Typed request context handed to the guard.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP method.
    pub method: Method,
    /// Path including the query string.
    pub full_path: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Auth state, `None` when no authentication layer ran.
    pub auth: Option<AuthContext>,
    /// Auth transition that happened during this request.
    pub event: AuthEvent,
    /// Number of one-time flash messages waiting to be shown.
    pub pending_messages: usize,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(method: Method, full_path: impl Into<String>) -> Self {
        Self {
            method,
            full_path: full_path.into(),
            headers: HeaderMap::new(),
            auth: None,
            event: AuthEvent::Normal,
            pending_messages: 0,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(full_path: impl Into<String>) -> Self {
        Self::new(Method::GET, full_path)
    }

    /// Build a context from an `http::Request`, keeping its path, query and headers.
    pub fn from_request<B>(req: &http::Request<B>) -> Self {
        let full_path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());

        Self {
            headers: req.headers().clone(),
            ..Self::new(req.method().clone(), full_path)
        }
    }

    /// Attach auth state.
    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Mark the request as a login or logout.
    pub fn with_event(mut self, event: AuthEvent) -> Self {
        self.event = event;
        self
    }

    /// Set the number of pending flash messages.
    pub fn with_pending_messages(mut self, count: usize) -> Self {
        self.pending_messages = count;
        self
    }

    /// Append a request cookie.
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        let pair = cookie::Cookie::new(name, value).stripped().to_string();
        let merged = match self.headers.get(http::header::COOKIE) {
            Some(existing) => match existing.to_str() {
                Ok(existing) if !existing.is_empty() => format!("{}; {}", existing, pair),
                _ => pair,
            },
            None => pair,
        };
        if let Ok(value) = http::HeaderValue::from_str(&merged) {
            self.headers.insert(http::header::COOKIE, value);
        }
        self
    }

    /// Path without the query string.
    pub fn path(&self) -> &str {
        self.full_path
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(&self.full_path)
    }

    /// Check if the request may ever be served from a shared cache.
    pub fn is_safe_method(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Parse the request cookies.
    pub fn cookies(&self) -> CookieJar {
        let mut jar = CookieJar::default();
        for value in self.headers.get_all(http::header::COOKIE) {
            if let Ok(raw) = value.to_str() {
                jar.add_header(raw);
            }
        }
        jar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_flags() {
        assert!(Identity::Anonymous.is_anonymous());
        assert!(Identity::user("42").is_authenticated());
        assert_eq!(Identity::user("42").user_id(), Some("42"));
        assert_eq!(Identity::Anonymous.user_id(), None);
    }

    #[test]
    fn test_path_strips_query() {
        let ctx = RequestContext::get("/a/b/?page=2");
        assert_eq!(ctx.path(), "/a/b/");
        assert_eq!(ctx.full_path, "/a/b/?page=2");
    }

    #[test]
    fn test_safe_methods() {
        assert!(RequestContext::get("/").is_safe_method());
        assert!(RequestContext::new(Method::HEAD, "/").is_safe_method());
        assert!(!RequestContext::new(Method::POST, "/").is_safe_method());
    }

    #[test]
    fn test_with_cookie_merges() {
        let ctx = RequestContext::get("/")
            .with_cookie("sessionid", "abc")
            .with_cookie("messages", "xyz");
        let jar = ctx.cookies();
        assert_eq!(jar.get("sessionid"), Some("abc"));
        assert_eq!(jar.get("messages"), Some("xyz"));
    }

    #[test]
    fn test_from_request_keeps_query() {
        let req = http::Request::builder()
            .method(Method::GET)
            .uri("/search/?q=shoes")
            .header("cookie", "sessionid=s1")
            .body(())
            .unwrap();
        let ctx = RequestContext::from_request(&req);
        assert_eq!(ctx.full_path, "/search/?q=shoes");
        assert_eq!(ctx.cookies().get("sessionid"), Some("s1"));
    }

    #[test]
    fn test_auth_event_transition() {
        assert!(!AuthEvent::Normal.is_transition());
        assert!(AuthEvent::Login.is_transition());
        assert!(AuthEvent::Logout.is_transition());
    }
}
