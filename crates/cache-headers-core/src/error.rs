//! Configuration errors.

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A path pattern is not a valid regular expression.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A ttl key under `timeouts` is not a non-negative integer.
    #[error("invalid ttl '{ttl}' for policy '{policy}'")]
    InvalidTtl { policy: String, ttl: String },

    /// `timeouts` references a policy that is not registered.
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),

    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },
}
