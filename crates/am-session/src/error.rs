//! Error types for the session crate.

use am_client::ApiError;
use am_storage::StorageError;
use thiserror::Error;

/// Errors raised by session operations.
///
/// # Error Recovery Strategy
///
/// - [`SessionError::Api`]: follow the inner error's predicates
///   ([`ApiError::is_retryable`], [`ApiError::is_unauthorized`])
/// - [`SessionError::Storage`]: the in-memory state is still valid; the
///   session simply will not survive a restart
/// - [`SessionError::NotAuthenticated`]: log in first
/// - [`SessionError::InvalidToken`]: discard the token and log in again
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Durable session data could not be written.
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The operation needs a signed-in user.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The token is not a well-formed JWT.
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

impl SessionError {
    /// Creates a [`SessionError::InvalidToken`].
    #[must_use]
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken(reason.into())
    }

    /// Returns `true` if signing in again is the way out.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        match self {
            Self::NotAuthenticated | Self::InvalidToken(_) => true,
            Self::Api(err) => err.is_unauthorized(),
            Self::Storage(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_login() {
        assert!(SessionError::NotAuthenticated.requires_login());
        assert!(SessionError::invalid_token("two segments").requires_login());
        assert!(!SessionError::Api(ApiError::Timeout).requires_login());
        let unauthorized = ApiError::from_response(401, br#"{"detail": "Could not validate credentials"}"#);
        assert!(SessionError::Api(unauthorized).requires_login());
    }

    #[test]
    fn test_api_error_is_transparent() {
        let err = SessionError::from(ApiError::Timeout);
        assert_eq!(err.to_string(), ApiError::Timeout.to_string());
    }
}
