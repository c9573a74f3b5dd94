//! Bearer token sources and client events.

use parking_lot::RwLock;

/// Supplies the bearer token attached to every request.
///
/// `clear` is called when the backend answers 401, ending the stored session.
pub trait TokenSource: Send + Sync {
    /// Returns the current access token, if any.
    fn token(&self) -> Option<String>;

    /// Forgets the session (token and cached user).
    fn clear(&self);
}

/// Token held in memory only.
#[derive(Debug, Default)]
pub struct MemoryToken {
    token: RwLock<Option<String>>,
}

impl MemoryToken {
    /// Creates an empty token holder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a holder with the given token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: RwLock::new(Some(token.into())) }
    }

    /// Replaces the token.
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }
}

impl TokenSource for MemoryToken {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}

/// Events broadcast by the client to interested components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientEvent {
    /// The backend rejected the token; the user must log in again.
    SessionExpired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_token_set_and_clear() {
        let source = MemoryToken::new();
        assert!(source.token().is_none());
        source.set("abc");
        assert_eq!(source.token().as_deref(), Some("abc"));
        source.clear();
        assert!(source.token().is_none());
        assert_eq!(MemoryToken::with_token("x").token().as_deref(), Some("x"));
    }
}
