//! Core abstractions for cache header decisions.
//!
//! This crate provides the fundamental types shared by the rule engine and
//! the response guard:
//! - `RequestContext` - Method, path, headers and auth state of a request
//! - `AuthContext` / `Identity` - Who is asking, and under which session
//! - `AuthEvent` - Explicit login/logout marker for the current request
//! - `CacheHeadersConfig` - Rule timeouts, cookie names and guard switches

mod config;
mod context;
mod cookies;
mod error;

pub use config::*;
pub use context::*;
pub use cookies::*;
pub use error::*;
