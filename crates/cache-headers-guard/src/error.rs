//! Guard errors and rejection reasons.

use cache_headers::PolicyError;

pub type GuardResult<T> = Result<T, GuardError>;

/// Failures the guard cannot turn into a response on its own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// A resolved policy name has no implementation.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The cache-busting location is not a valid header value.
    #[error("invalid redirect location: {0}")]
    InvalidLocation(String),
}

/// Why a request was rejected as tampered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TamperReason {
    /// An anonymous requester presented a session cookie that is not its own.
    #[error("user is anonymous but presented a '{cookie}' cookie")]
    ForgedSession { cookie: String },

    /// An anonymous requester presented the auth-signal cookie.
    #[error("user is anonymous but presented a '{cookie}' cookie")]
    ForgedAuthSignal { cookie: String },
}

impl TamperReason {
    /// Body text for the 400 response.
    pub fn message(&self) -> String {
        format!("Suspicious request: {}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let reason = TamperReason::ForgedSession {
            cookie: "sessionid".to_string(),
        };
        assert_eq!(
            reason.message(),
            "Suspicious request: user is anonymous but presented a 'sessionid' cookie"
        );

        let err = GuardError::from(PolicyError::NotRegistered("ghost".to_string()));
        assert!(err.to_string().contains("ghost"));
    }
}
