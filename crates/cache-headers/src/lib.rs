//! Cache header decisions for responses served through a shared cache.
//!
//! This crate provides:
//! - `RuleTable` - Path patterns mapped to a ttl and a policy name
//! - `DecisionResolver` - Path lookup memoized in a `DecisionStore`
//! - `CachePolicy` - Bucketing strategies, with four built-ins
//! - `PolicyRegistry` - Policies by name, extensible by the host
//! - `PolicyEngine` - Resolve a path and compute its headers
//! - `vcl` - Varnish snippet mirroring the rule table
//!
//! # Example
//!
//! ```ignore
//! use cache_headers::{PolicyEngine, PolicyRegistry};
//! use cache_headers_core::{AuthContext, CacheHeadersConfig};
//!
//! let config = CacheHeadersConfig::default()
//!     .with_rules("anonymous-only", 600, &["^/products/"]);
//! let engine = PolicyEngine::new(config, PolicyRegistry::with_builtins())?;
//!
//! let decision = engine.decide("/products/42/");
//! let headers = engine.headers_for(&decision, &AuthContext::anonymous(), chrono::Utc::now())?;
//! assert_eq!(headers.cache_control(), Some("max-age=5, s-maxage=600"));
//! ```

mod engine;
mod headers;
mod policy;
mod registry;
mod resolver;
mod rules;
mod store;
pub mod vcl;

pub use engine::*;
pub use headers::*;
pub use policy::*;
pub use registry::*;
pub use resolver::*;
pub use rules::*;
pub use store::*;
