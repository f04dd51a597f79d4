//! Auth-signal cookie.
//!
//! The upstream proxy cannot read the session store, so it learns whether a
//! client is logged in from this cookie. The guard keeps it in step with the
//! real session state.

use cache_headers_core::{AuthContext, CookieJar, SessionExpiry};
use cookie::time::Duration;
use cookie::Cookie;

/// Cookie value for a logged in client.
pub const SIGNAL_VALUE: &str = "1";

/// Issues and checks the auth-signal cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSignal {
    cookie_name: String,
}

impl AuthSignal {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// The cookie that reflects `auth`: set for a logged in user, removed
    /// otherwise. Lifetime follows the session cookie.
    pub fn cookie_for(&self, auth: &AuthContext) -> Cookie<'static> {
        if auth.is_anonymous() {
            let mut cookie = Cookie::build((self.cookie_name.clone(), "")).path("/").build();
            cookie.make_removal();
            return cookie;
        }

        let cookie = Cookie::build((self.cookie_name.clone(), SIGNAL_VALUE)).path("/");
        match auth.expiry {
            SessionExpiry::BrowserSession => cookie.build(),
            SessionExpiry::Persistent { max_age_secs } => {
                let secs = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
                cookie.max_age(Duration::seconds(secs)).build()
            }
        }
    }

    /// Check if the client's cookie agrees with `auth`.
    pub fn is_consistent(&self, auth: &AuthContext, cookies: &CookieJar) -> bool {
        let presented = cookies.non_empty(&self.cookie_name);
        if auth.is_authenticated() {
            presented == Some(SIGNAL_VALUE)
        } else {
            presented.is_none()
        }
    }
}
