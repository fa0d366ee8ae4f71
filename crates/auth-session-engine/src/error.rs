//! Error types for the session core.

use thiserror::Error;

/// Errors reported by an identity provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Unknown account or wrong password
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Sign-out was rejected by the provider
    #[error("Sign-out failed: {0}")]
    SignOut(String),

    /// Provider could not be reached (transient, can retry)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider did not answer in time
    #[error("Identity provider timed out")]
    Timeout,

    /// Anything else the provider reports
    #[error("Identity provider error: {0}")]
    Provider(String),
}

impl IdentityError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors never count towards the failed-login threshold.
    pub fn is_transient(&self) -> bool {
        matches!(self, IdentityError::Network(_) | IdentityError::Timeout)
    }
}

/// Session core error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Invalid state transition in the startup FSM
    #[error("Invalid startup state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] shipaction_storage::StorageError),

    /// Identity provider error
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient_network() {
        assert!(IdentityError::Network("offline".to_string()).is_transient());
    }

    #[test]
    fn test_is_transient_timeout() {
        assert!(IdentityError::Timeout.is_transient());
    }

    #[test]
    fn test_is_not_transient_invalid_credentials() {
        assert!(!IdentityError::InvalidCredentials("bad password".to_string()).is_transient());
    }

    #[test]
    fn test_is_not_transient_sign_out() {
        assert!(!IdentityError::SignOut("rejected".to_string()).is_transient());
    }

    #[test]
    fn test_session_error_wraps_identity_error() {
        let err: SessionError = IdentityError::Timeout.into();
        assert!(matches!(err, SessionError::Identity(IdentityError::Timeout)));
        assert_eq!(err.to_string(), "Identity error: Identity provider timed out");
    }
}
