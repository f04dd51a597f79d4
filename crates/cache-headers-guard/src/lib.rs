//! Response guard for cache header decisions.
//!
//! This crate provides:
//! - `CacheHeadersMiddleware` - Runs once per response and decides whether,
//!   and how, a shared cache may store it
//! - `AuthSignal` - The cookie telling the upstream proxy a session is logged in
//! - `TamperReason` - Why a request was rejected with 400
//! - Cache-busting redirects for responses carrying flash messages
//!
//! # Example
//!
//! ```ignore
//! use cache_headers::PolicyRegistry;
//! use cache_headers_core::{AuthContext, CacheHeadersConfig, RequestContext};
//! use cache_headers_guard::CacheHeadersMiddleware;
//!
//! let config = CacheHeadersConfig::default()
//!     .with_rules("anonymous-only", 600, &["^/a/"]);
//! let middleware = CacheHeadersMiddleware::from_config(config, PolicyRegistry::with_builtins())?;
//!
//! let req = RequestContext::get("/a/").with_auth(AuthContext::anonymous());
//! let resp = middleware.respond(&req, http::Response::new(String::from("hello")))?;
//! assert_eq!(resp.headers()["cache-control"], "max-age=5, s-maxage=600");
//! ```

mod busting;
mod error;
mod middleware;
mod signal;

pub use busting::*;
pub use error::*;
pub use middleware::*;
pub use signal::*;
