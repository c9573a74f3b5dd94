//! Users, companies, and authentication payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::permission::Role;
use super::timestamp;

/// An authenticated user of a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier.
    pub id: i64,
    /// Display name.
    pub username: String,
    /// Login e-mail.
    pub email: String,
    /// Role deciding the permission set.
    pub role: Role,
    /// Owning company.
    #[serde(default)]
    pub company_id: Option<i64>,
    /// Whether the account may log in.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Account creation time.
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    /// Time of the last successful login.
    #[serde(default, with = "timestamp::option")]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Returns `false` only when the backend reports the account as disabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.is_active.unwrap_or(true)
    }
}

/// A partial, local update to the current user.
///
/// Applied by the session after profile edits without a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPatch {
    /// New display name.
    pub username: Option<String>,
    /// New e-mail.
    pub email: Option<String>,
    /// New role.
    pub role: Option<Role>,
    /// New activity flag.
    pub is_active: Option<bool>,
}

impl UserPatch {
    /// Merges the present fields into `user`.
    pub fn apply(&self, user: &mut User) {
        if let Some(username) = &self.username {
            user.username.clone_from(username);
        }
        if let Some(email) = &self.email {
            user.email.clone_from(email);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(active) = self.is_active {
            user.is_active = Some(active);
        }
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.role.is_none() && self.is_active.is_none()
    }
}

/// Login credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login e-mail.
    pub email: String,
    /// Plain-text password, sent only over the login request.
    pub password: String,
}

impl Credentials {
    /// Creates credentials from an e-mail and password.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

/// Response of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// JWT access token.
    pub access_token: String,
    /// Token scheme, `bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: i64,
    /// Refresh token, when the backend issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// The user the token was issued to.
    pub user: User,
}

/// Self-service company registration, creating the first admin.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRegistration {
    /// Company name.
    pub name: String,
    /// Taxpayer number, 10 or 12 digits.
    pub inn: String,
    /// Company contact e-mail.
    pub email: String,
    /// Postal address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// E-mail of the first administrator.
    pub admin_email: String,
    /// Name of the first administrator.
    pub admin_username: String,
    /// Password of the first administrator.
    pub admin_password: String,
}

impl fmt::Debug for CompanyRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompanyRegistration")
            .field("name", &self.name)
            .field("inn", &self.inn)
            .field("email", &self.email)
            .field("admin_email", &self.admin_email)
            .field("admin_username", &self.admin_username)
            .finish_non_exhaustive()
    }
}

/// A registered company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Backend identifier.
    pub id: i64,
    /// Company name.
    pub name: String,
    /// Taxpayer number.
    pub inn: String,
    /// Contact e-mail.
    pub email: String,
    /// Postal address.
    #[serde(default)]
    pub address: Option<String>,
    /// Registration time.
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    /// Whether the company is active.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

pub(crate) const fn default_true() -> bool {
    true
}

/// A user created by an administrator.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Login e-mail.
    pub email: String,
    /// Display name.
    pub username: String,
    /// Assigned role.
    pub role: Role,
    /// Initial password.
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Changes to an existing user, sent to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    /// New e-mail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// New role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// New password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Enable or disable the account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            username: "Администратор".to_owned(),
            email: "admin@result-education.ru".to_owned(),
            role: Role::Admin,
            company_id: Some(1),
            is_active: Some(true),
            created_at: None,
            last_login: None,
        }
    }

    #[test]
    fn test_auth_token_from_backend_json() {
        let json = r#"{
            "access_token": "a.b.c",
            "token_type": "bearer",
            "expires_in": 1800,
            "user": {
                "id": 1,
                "username": "admin",
                "email": "admin@result-education.ru",
                "role": "Admin",
                "company_id": 1,
                "created_at": "2024-01-10T09:00:00.000001",
                "last_login": null,
                "is_active": true
            }
        }"#;
        let token: AuthToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.user.role, Role::Admin);
        assert!(token.refresh_token.is_none());
        assert!(token.user.created_at.is_some());
    }

    #[test]
    fn test_patch_merges_only_present_fields() {
        let mut user = sample_user();
        let patch = UserPatch {
            username: Some("Главный".to_owned()),
            ..UserPatch::default()
        };
        patch.apply(&mut user);
        assert_eq!(user.username, "Главный");
        assert_eq!(user.email, "admin@result-education.ru");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn test_empty_patch() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            role: Some(Role::Observer),
            ..UserPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("admin@result-education.ru", "admin123");
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("admin123"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_user_update_skips_unset_fields() {
        let update = UserUpdate {
            is_active: Some(false),
            ..UserUpdate::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"is_active":false}"#);
    }

    #[test]
    fn test_missing_activity_flag_means_enabled() {
        let mut user = sample_user();
        user.is_active = None;
        assert!(user.is_enabled());
        user.is_active = Some(false);
        assert!(!user.is_enabled());
    }
}
