//! Varnish `vcl_hash` snippet generation.
//!
//! The snippet mirrors the rule table: for each rule, in specificity order,
//! the first matching `req.url` branch sets `req.http.Hash-Cookies` to the
//! policy's `X-Hash-Cookies` value. The hashing block then folds the listed
//! cookies into the cache key, so Varnish buckets responses the same way the
//! policies do without running them.

use cache_headers_core::AuthContext;
use chrono::Utc;

use crate::engine::PolicyEngine;
use crate::headers::header_names;
use crate::store::Decision;

/// Errors from snippet generation.
#[derive(Debug, thiserror::Error)]
pub enum VclError {
    /// The policy sets no `X-Hash-Cookies` header for anonymous requesters.
    #[error("policy '{0}' does not emit X-Hash-Cookies")]
    MissingHashCookies(String),

    /// The value holds `"}`, which no VCL string literal can carry.
    #[error("cannot quote {0:?} as a VCL string")]
    Unquotable(String),

    /// The policy is not registered.
    #[error(transparent)]
    Policy(#[from] crate::registry::PolicyError),
}

const HASH_PREAMBLE: &str = r#"sub vcl_hash {
    # Cache even with cookies present. Cookies are not deleted, but only the
    # ones listed in Hash-Cookies take part in the hash. The list is set per
    # path by the cache header policies."#;

/// One `req.url` branch of the snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRoute {
    pub pattern: String,
    pub hash_cookies: String,
}

/// Compute the hash-cookie route for every rule, in rule order.
pub fn hash_routes(engine: &PolicyEngine) -> Result<Vec<HashRoute>, VclError> {
    let anonymous = AuthContext::anonymous();
    let now = Utc::now();

    engine
        .rules()
        .iter()
        .map(|rule| -> Result<HashRoute, VclError> {
            // Zero-ttl rules get one second so their policy still reports
            // its cookie list.
            let sample = Decision::new(rule.ttl().max(1), rule.policy());
            let headers = engine.headers_for(&sample, &anonymous, now)?;
            let hash_cookies = headers
                .get(header_names::X_HASH_COOKIES)
                .ok_or_else(|| VclError::MissingHashCookies(rule.policy().to_string()))?;

            Ok(HashRoute {
                pattern: rule.pattern().to_string(),
                hash_cookies: hash_cookies.to_string(),
            })
        })
        .collect()
}

/// Render the complete `vcl_hash` subroutine.
pub fn generate(engine: &PolicyEngine) -> Result<String, VclError> {
    let routes = hash_routes(engine)?;
    let cookies = engine.cookie_names();
    let mut out = String::from(HASH_PREAMBLE);
    out.push('\n');

    for (i, route) in routes.iter().enumerate() {
        let keyword = if i == 0 { "if" } else { "} else if" };
        out.push_str(&format!(
            "    {} (req.url ~ {}) {{\n        set req.http.Hash-Cookies = {};\n",
            keyword,
            vcl_string(&route.pattern)?,
            vcl_string(&route.hash_cookies)?,
        ));
    }
    if !routes.is_empty() {
        out.push_str("    }\n");
    }

    let messages = &cookies.messages;
    let auth = &cookies.auth;
    let session = &cookies.session;
    out.push_str(&format!(
        r#"
    set req.http.Hash-Value = "x";
    if (req.http.Hash-Cookies) {{
        if (req.http.Hash-Cookies ~ "{messages}") {{
            if (req.http.Cookie ~ "{messages}=") {{
                set req.http.Hash-Value = req.http.Hash-Value + regsub(req.http.Cookie, ".*{messages}=([^;]+).*", "\1");
            }}
        }}
        if (req.http.Hash-Cookies == "{messages}|{auth}") {{
            if (req.http.Cookie ~ "{auth}=1") {{
                set req.http.Hash-Value = req.http.Hash-Value + "1";
            }}
        }} else if (req.http.Hash-Cookies == "{messages}|{session}") {{
            if (req.http.Cookie ~ "{session}=") {{
                set req.http.Hash-Value = req.http.Hash-Value + regsub(req.http.Cookie, ".*{session}=([^;]+).*", "\1");
            }}
        }}
    }}

    hash_data(req.http.Hash-Value);

    unset req.http.Hash-Cookies;
    unset req.http.Hash-Value;
}}
"#
    ));

    Ok(out)
}

/// Quote a value as a VCL string literal. VCL strings have no escapes, so
/// regex backslashes pass through untouched and values holding `"` use the
/// `{"..."}` long form.
fn vcl_string(value: &str) -> Result<String, VclError> {
    if !value.contains('"') {
        Ok(format!("\"{}\"", value))
    } else if !value.contains("\"}") {
        Ok(format!("{{\"{}\"}}", value))
    } else {
        Err(VclError::Unquotable(value.to_string()))
    }
}
