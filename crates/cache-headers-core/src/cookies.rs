//! Request cookies.

use cookie::Cookie;

/// Cookies sent by the client. Later duplicates win.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    inner: cookie::CookieJar,
}

impl CookieJar {
    /// Parse one `Cookie` request header value. Malformed fragments are skipped.
    pub fn from_header(raw: &str) -> Self {
        let mut jar = Self::default();
        jar.add_header(raw);
        jar
    }

    /// Add the cookies of another `Cookie` header value.
    pub fn add_header(&mut self, raw: &str) {
        for cookie in Cookie::split_parse(raw).filter_map(Result::ok) {
            self.inner.add_original(cookie.into_owned());
        }
    }

    /// Get a cookie value by name, without surrounding quotes.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(|c| c.value_trimmed())
    }

    /// Get a cookie value only when it is present and non-empty.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.iter().next().is_none()
    }
}
