//! Error types for the am-storage crate.
//!
//! This module provides the [`StorageError`] type for failures while reading,
//! encoding, or persisting stored values.

use camino::Utf8PathBuf;

/// Errors that can occur while using the store.
///
/// # Error Recovery Strategy
///
/// - **Decode errors** ([`StorageError::Decode`]): Recoverable - the handle
///   falls back to its default value and logs a warning
/// - **Rejected values** ([`StorageError::Rejected`]): Recoverable - the
///   value is not written; the previous value stays in place
/// - **Corrupt file** ([`StorageError::Corrupt`]): Recoverable - the store
///   starts empty and the next write replaces the file
/// - **I/O errors** ([`StorageError::Io`]): Fatal for the write - propagate
///
/// # Examples
///
/// ```
/// use am_storage::StorageError;
///
/// let err = StorageError::rejected("theme", "unknown theme");
/// assert!(err.is_recoverable());
/// assert_eq!(err.to_string(), "value for key 'theme' rejected: unknown theme");
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// A stored value could not be decoded.
    #[error("invalid stored value for key '{key}': {reason}")]
    Decode {
        /// Storage key.
        key: String,
        /// Decoder message.
        reason: String,
    },

    /// A value could not be encoded.
    #[error("cannot encode value for key '{key}': {reason}")]
    Encode {
        /// Storage key.
        key: String,
        /// Encoder message.
        reason: String,
    },

    /// A value failed validation and was not written.
    #[error("value for key '{key}' rejected: {reason}")]
    Rejected {
        /// Storage key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The storage file is not a JSON object of strings.
    #[error("storage file {path} is corrupt: {reason}")]
    Corrupt {
        /// Storage file.
        path: Utf8PathBuf,
        /// Parser message.
        reason: String,
    },

    /// An I/O error occurred while reading or writing the storage file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Creates a new [`StorageError::Decode`] error.
    #[inline]
    pub fn decode(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Decode { key: key.into(), reason: reason.to_string() }
    }

    /// Creates a new [`StorageError::Encode`] error.
    #[inline]
    pub fn encode(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Encode { key: key.into(), reason: reason.to_string() }
    }

    /// Creates a new [`StorageError::Rejected`] error.
    #[inline]
    pub fn rejected(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected { key: key.into(), reason: reason.into() }
    }

    /// Returns `true` if the caller can continue with a default value.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = StorageError::decode("user", "expected value at line 1 column 1");
        assert_eq!(
            err.to_string(),
            "invalid stored value for key 'user': expected value at line 1 column 1"
        );
        let err = StorageError::encode("user", "key must be a string");
        assert!(err.to_string().contains("cannot encode"));
    }

    #[test]
    fn test_io_is_not_recoverable() {
        let err = StorageError::from(std::io::Error::other("disk full"));
        assert!(!err.is_recoverable());
        assert!(StorageError::decode("k", "bad").is_recoverable());
    }
}
