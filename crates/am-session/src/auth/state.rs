//! Authentication state and its reducer.
//!
//! The reducer is pure: it takes the previous state and an [`AuthAction`]
//! and returns the next state. Side effects (requests, storage, notices)
//! live in [`Session`](super::Session), which dispatches actions.
//!
//! # State Flow
//!
//! ```text
//! Anonymous ──Start──► Loading ──Success──► Authenticated
//!     ▲                   │                      │
//!     │                Failure                 Logout
//!     │                   ▼                      │
//!     └──ClearError──── Error ◄──────────────────┘ (Logout → Anonymous)
//! ```

use std::fmt;

use am_core::{User, UserPatch};

/// Coarse authentication status derived from [`AuthState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStatus {
    /// No user is signed in.
    Anonymous,
    /// A login, registration, or check is in flight.
    Loading,
    /// A user and token are present.
    Authenticated,
    /// The last attempt failed with a message.
    Error,
}

impl AuthStatus {
    /// Returns the lowercase name used in logs.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Loading => "loading",
            Self::Authenticated => "authenticated",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the authentication state.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Signed-in user.
    pub user: Option<User>,
    /// Access token of the signed-in user.
    pub token: Option<String>,
    /// Whether an attempt is in flight.
    pub loading: bool,
    /// Message of the last failed attempt.
    pub error: Option<String>,
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("user", &self.user.as_ref().map(|u| &u.email))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

/// Transitions understood by [`AuthState::reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    /// An attempt started.
    Start,
    /// An attempt succeeded.
    Success {
        /// The signed-in user.
        user: User,
        /// The access token.
        token: String,
    },
    /// An attempt failed. `None` ends the attempt without an error message.
    Failure(Option<String>),
    /// The user signed out or the session ended.
    Logout,
    /// Local edits to the signed-in user.
    UpdateUser(UserPatch),
    /// The error was acknowledged.
    ClearError,
}

impl AuthState {
    /// Applies `action`.
    ///
    /// # Examples
    ///
    /// ```
    /// use am_session::auth::{AuthAction, AuthState, AuthStatus};
    ///
    /// let state = AuthState::default().reduce(AuthAction::Start);
    /// assert_eq!(state.status(), AuthStatus::Loading);
    ///
    /// let state = state.reduce(AuthAction::Failure(Some("Неверный пароль".into())));
    /// assert_eq!(state.status(), AuthStatus::Error);
    /// assert_eq!(state.reduce(AuthAction::ClearError).status(), AuthStatus::Anonymous);
    /// ```
    #[must_use]
    pub fn reduce(self, action: AuthAction) -> Self {
        match action {
            AuthAction::Start => Self { loading: true, error: None, ..self },
            AuthAction::Success { user, token } => Self {
                user: Some(user),
                token: Some(token),
                loading: false,
                error: None,
            },
            AuthAction::Failure(error) => Self { user: None, token: None, loading: false, error },
            AuthAction::Logout => Self::default(),
            AuthAction::UpdateUser(patch) => {
                let mut next = self;
                if let Some(user) = next.user.as_mut() {
                    patch.apply(user);
                }
                next
            }
            AuthAction::ClearError => Self { error: None, ..self },
        }
    }

    /// Returns the coarse status.
    #[must_use]
    pub const fn status(&self) -> AuthStatus {
        if self.loading {
            AuthStatus::Loading
        } else if self.user.is_some() && self.token.is_some() {
            AuthStatus::Authenticated
        } else if self.error.is_some() {
            AuthStatus::Error
        } else {
            AuthStatus::Anonymous
        }
    }

    /// Returns `true` if a user is signed in, even while a check is running.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use am_core::Role;

    use super::*;

    fn user() -> User {
        User {
            id: 1,
            username: "Администратор Системы".to_owned(),
            email: "admin@result-education.ru".to_owned(),
            role: Role::Admin,
            company_id: Some(1),
            is_active: Some(true),
            created_at: None,
            last_login: None,
        }
    }

    fn signed_in() -> AuthState {
        AuthState::default()
            .reduce(AuthAction::Start)
            .reduce(AuthAction::Success { user: user(), token: "jwt".to_owned() })
    }

    #[test]
    fn test_login_flow() {
        let state = signed_in();
        assert_eq!(state.status(), AuthStatus::Authenticated);
        assert!(!state.loading);
        assert_eq!(state.token.as_deref(), Some("jwt"));
    }

    #[test]
    fn test_failure_clears_user() {
        let state = signed_in()
            .reduce(AuthAction::Start)
            .reduce(AuthAction::Failure(Some("Ошибка входа в систему".to_owned())));
        assert_eq!(state.status(), AuthStatus::Error);
        assert!(state.user.is_none());
        assert!(state.token.is_none());
    }

    #[test]
    fn test_failure_without_message_is_anonymous() {
        let state = AuthState::default().reduce(AuthAction::Start).reduce(AuthAction::Failure(None));
        assert_eq!(state.status(), AuthStatus::Anonymous);
    }

    #[test]
    fn test_start_keeps_user_and_clears_error() {
        let state = signed_in().reduce(AuthAction::Start);
        assert_eq!(state.status(), AuthStatus::Loading);
        assert!(state.is_authenticated());

        let failed = AuthState::default().reduce(AuthAction::Failure(Some("x".to_owned())));
        assert!(failed.reduce(AuthAction::Start).error.is_none());
    }

    #[test]
    fn test_logout_resets_everything() {
        let state = signed_in().reduce(AuthAction::Logout);
        assert_eq!(state, AuthState::default());
    }

    #[test]
    fn test_update_user_merges_patch() {
        let patch = UserPatch { username: Some("Главный".to_owned()), ..UserPatch::default() };
        let state = signed_in().reduce(AuthAction::UpdateUser(patch.clone()));
        let user = state.user.as_ref().unwrap();
        assert_eq!(user.username, "Главный");
        assert_eq!(user.role, Role::Admin);

        let anonymous = AuthState::default().reduce(AuthAction::UpdateUser(patch));
        assert!(anonymous.user.is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", signed_in());
        assert!(!debug.contains("jwt"));
        assert!(debug.contains("admin@result-education.ru"));
    }
}
