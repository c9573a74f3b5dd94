use am_core::{AuthToken, Company, CompanyRegistration, Credentials, User};
use serde_json::json;

use crate::client::{ApiClient, RequestOptions, json_body};
use crate::error::ApiError;
use crate::transport::{Method, RequestBody, Transport};

/// `/auth/*` endpoints.
///
/// These calls never emit failure notices; the session layer reports their
/// outcome itself.
#[derive(Debug)]
pub struct AuthApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> AuthApi<'a, T> {
    pub(crate) const fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// Exchanges credentials for a token.
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthorized`] for wrong credentials, or any transport error.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthToken, ApiError> {
        self.client
            .request(Method::Post, "/auth/login", json_body(credentials)?, RequestOptions::silent())
            .await
    }

    /// Registers a company and its first administrator.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, e.g. a 400 for a duplicate INN.
    pub async fn register(&self, registration: &CompanyRegistration) -> Result<Company, ApiError> {
        self.client
            .request(Method::Post, "/auth/register", json_body(registration)?, RequestOptions::silent())
            .await
    }

    /// Returns the user the current token belongs to.
    ///
    /// # Errors
    ///
    /// [`ApiError::Unauthorized`] when the token is missing or expired.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.client
            .request(Method::Get, "/auth/me", RequestBody::Empty, RequestOptions::silent())
            .await
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns the backend's error; servers without refresh support answer 404.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthToken, ApiError> {
        let body = json_body(&json!({ "refresh_token": refresh_token }))?;
        self.client
            .request(Method::Post, "/auth/refresh", body, RequestOptions::silent())
            .await
    }
}

#[cfg(test)]
mod tests {
    use am_core::Role;
    use serde_json::json;

    use super::*;
    use crate::services::fixtures;

    #[tokio::test]
    async fn test_login_posts_credentials() {
        let (client, transport, notices) = fixtures::client();
        transport.respond(
            Method::Post,
            "/auth/login",
            200,
            json!({
                "access_token": "token-abc",
                "token_type": "bearer",
                "expires_in": 1800,
                "user": fixtures::user("Admin")
            }),
        );

        let token = client
            .auth()
            .login(&Credentials::new("admin@result-education.ru", "admin123"))
            .await
            .unwrap();
        assert_eq!(token.access_token, "token-abc");
        assert_eq!(token.user.role, Role::Admin);

        let body = transport.last_request().unwrap().json().unwrap();
        assert_eq!(body, json!({"email": "admin@result-education.ru", "password": "admin123"}));
        assert!(notices.notices().is_empty());
    }

    #[tokio::test]
    async fn test_failed_login_is_silent() {
        let (client, transport, notices) = fixtures::client();
        client.tokens().clear();
        transport.respond(Method::Post, "/auth/login", 401, json!({"detail": "Incorrect email or password"}));

        let err = client.auth().login(&Credentials::new("a@b.ru", "nope")).await.unwrap_err();
        assert_eq!(err.detail(), Some("Incorrect email or password"));
        assert!(notices.notices().is_empty());
    }

    #[tokio::test]
    async fn test_me_and_refresh() {
        let (client, transport, _) = fixtures::client();
        transport.respond(Method::Get, "/auth/me", 200, fixtures::user("Accountant"));
        let user = client.auth().me().await.unwrap();
        assert_eq!(user.role, Role::Accountant);

        let err = client.auth().refresh("r-1").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(transport.last_request().unwrap().json(), Some(json!({"refresh_token": "r-1"})));
    }

    #[tokio::test]
    async fn test_register_company() {
        let (client, transport, _) = fixtures::client();
        transport.respond(
            Method::Post,
            "/auth/register",
            200,
            json!({"id": 3, "name": "ООО Ромашка", "inn": "7707083893", "email": "info@romashka.ru"}),
        );
        let registration = CompanyRegistration {
            name: "ООО Ромашка".into(),
            inn: "7707083893".into(),
            email: "info@romashka.ru".into(),
            address: None,
            admin_email: "boss@romashka.ru".into(),
            admin_username: "boss".into(),
            admin_password: "secret1".into(),
        };
        let company = client.auth().register(&registration).await.unwrap();
        assert_eq!(company.id, 3);
        assert!(company.is_active);
    }
}
