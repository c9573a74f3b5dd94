//! The signed-in session: side effects around the auth reducer.

use std::fmt;
use std::sync::Arc;

use am_client::{ApiClient, ClientEvent, HttpTransport, Notice, TokenSource, Transport};
use am_core::format::initials;
use am_core::{AuthToken, Company, CompanyRegistration, Credentials, Permission, Role, User, UserPatch};
use am_storage::{StorageError, Store, StoredValue, keys};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{AuthAction, AuthState, AuthStatus};
use super::token::TokenClaims;
use crate::access::RoleSet;
use crate::error::SessionError;

const WELCOME: &str = "Добро пожаловать";
const LOGIN_FAILED: &str = "Ошибка входа в систему";
const LOGGED_OUT: &str = "Вы успешно вышли из системы";
const REGISTERED: &str = "Компания успешно зарегистрирована! Теперь войдите в систему.";
const REGISTER_FAILED: &str = "Ошибка регистрации компании";
const STORAGE_FAILED: &str = "Не удалось сохранить сессию";

/// Session data kept in durable storage under the `token`, `user`, and
/// `refresh_token` keys.
///
/// Also the [`TokenSource`] of the session's client, so a 401 clears it.
#[derive(Debug)]
pub struct StoredCredentials {
    token: StoredValue<Option<String>>,
    refresh_token: StoredValue<Option<String>>,
    user: StoredValue<Option<User>>,
}

impl StoredCredentials {
    /// Binds the session keys of `store`.
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            token: StoredValue::new(Arc::clone(&store), keys::TOKEN, None),
            refresh_token: StoredValue::new(Arc::clone(&store), keys::REFRESH_TOKEN, None),
            user: StoredValue::new(store, keys::USER, None),
        }
    }

    /// Returns the stored user.
    pub fn user(&self) -> Option<User> {
        self.user.get()
    }

    /// Returns the stored refresh token.
    pub fn refresh_token(&self) -> Option<String> {
        self.refresh_token.get()
    }

    /// Stores a freshly issued token and its user.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn save(&self, token: &AuthToken) -> Result<(), StorageError> {
        self.token.set(Some(token.access_token.clone()))?;
        self.user.set(Some(token.user.clone()))?;
        self.refresh_token.set(token.refresh_token.clone())
    }

    /// Replaces the stored user.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub fn save_user(&self, user: &User) -> Result<(), StorageError> {
        self.user.set(Some(user.clone()))
    }

    /// Removes every session key.
    ///
    /// # Errors
    ///
    /// Returns the first store error; later keys are still attempted.
    pub fn forget(&self) -> Result<(), StorageError> {
        let results = [self.token.remove(), self.user.remove(), self.refresh_token.remove()];
        results.into_iter().collect()
    }
}

impl TokenSource for StoredCredentials {
    fn token(&self) -> Option<String> {
        self.token.get()
    }

    fn clear(&self) {
        if let Err(err) = self.forget() {
            warn!(error = %err, "failed to clear stored session");
        }
    }
}

/// Result of a login or registration, which never fail with an error value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct AuthOutcome<V = ()> {
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Message shown to the user on failure.
    pub error: Option<String>,
    /// What the attempt produced, e.g. the registered company.
    pub value: Option<V>,
}

impl<V> AuthOutcome<V> {
    fn succeeded(value: V) -> Self {
        Self { success: true, error: None, value: Some(value) }
    }

    fn failed(message: String) -> Self {
        Self { success: false, error: Some(message), value: None }
    }
}

/// How the signed-in user is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDisplay {
    /// Display name.
    pub name: String,
    /// E-mail.
    pub email: String,
    /// Role.
    pub role: Role,
    /// Up to two uppercase initials of the name.
    pub initials: String,
}

/// The authentication session of one front end.
///
/// Owns the [`ApiClient`] (whose token source is the session's
/// [`StoredCredentials`]) and publishes [`AuthState`] snapshots through a
/// watch channel. A [`ClientEvent::SessionExpired`] raised by the client is
/// applied on the next read of the state.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use am_client::ApiClient;
/// use am_core::{Config, Credentials, Permission};
/// use am_session::Session;
/// use am_storage::Store;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let store = Arc::new(Store::from_config(&config.storage)?);
/// let session = Session::new(ApiClient::from_config(&config)?, store);
///
/// let outcome = session.login(&Credentials::new("admin@result-education.ru", "admin123")).await;
/// if outcome.success && session.has_permission(Permission::ManageUsers) {
///     let users = session.client().directory().users().await?;
///     println!("{} users", users.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Session<T = HttpTransport> {
    client: Arc<ApiClient<T>>,
    credentials: Arc<StoredCredentials>,
    state: watch::Sender<AuthState>,
    client_events: Mutex<broadcast::Receiver<ClientEvent>>,
}

impl<T> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("client", &self.client)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Session<T> {
    /// Creates an anonymous session over `client`, persisting to `store`.
    ///
    /// Call [`check_auth`](Self::check_auth) to resume a stored session.
    pub fn new(client: ApiClient<T>, store: Arc<Store>) -> Self {
        let credentials = Arc::new(StoredCredentials::new(store));
        let client = client.with_tokens(Arc::clone(&credentials) as Arc<dyn TokenSource>);
        let client_events = Mutex::new(client.subscribe());
        let (state, _) = watch::channel(AuthState::default());
        Self { client: Arc::new(client), credentials, state, client_events }
    }

    /// Returns the API client.
    #[must_use]
    pub const fn client(&self) -> &Arc<ApiClient<T>> {
        &self.client
    }

    /// Returns the durable session data.
    #[must_use]
    pub const fn credentials(&self) -> &Arc<StoredCredentials> {
        &self.credentials
    }

    /// Subscribes to state snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Returns the current state.
    pub fn state(&self) -> AuthState {
        self.apply_client_events();
        self.state.borrow().clone()
    }

    /// Returns the coarse status.
    pub fn status(&self) -> AuthStatus {
        self.state().status()
    }

    /// Returns the signed-in user.
    pub fn user(&self) -> Option<User> {
        self.state().user
    }

    /// Returns `true` if a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Signs in.
    ///
    /// On success the token and user are stored and a welcome notice is
    /// emitted. On failure the stored session is cleared, the state moves
    /// to [`AuthStatus::Error`], and an error notice is emitted.
    pub async fn login(&self, credentials: &Credentials) -> AuthOutcome {
        self.dispatch(AuthAction::Start);
        let token = match self.client.auth().login(credentials).await {
            Ok(token) => token,
            Err(err) => {
                info!(email = %credentials.email, error = %err, "login failed");
                return self.fail(err.detail().unwrap_or(LOGIN_FAILED).to_owned());
            }
        };
        if let Err(err) = self.credentials.save(&token) {
            warn!(error = %err, "cannot persist session");
            return self.fail(STORAGE_FAILED.to_owned());
        }

        info!(email = %token.user.email, role = %token.user.role, "signed in");
        self.notify(Notice::success(format!("{WELCOME}, {}!", token.user.username)));
        self.dispatch(AuthAction::Success { user: token.user, token: token.access_token });
        AuthOutcome::succeeded(())
    }

    /// Registers a company. The session stays anonymous; the new admin
    /// signs in afterwards.
    pub async fn register(&self, registration: &CompanyRegistration) -> AuthOutcome<Company> {
        self.dispatch(AuthAction::Start);
        match self.client.auth().register(registration).await {
            Ok(company) => {
                info!(company = %company.name, "company registered");
                self.notify(Notice::success(REGISTERED));
                self.dispatch(AuthAction::Failure(None));
                AuthOutcome::succeeded(company)
            }
            Err(err) => {
                info!(error = %err, "registration failed");
                self.fail(err.detail().unwrap_or(REGISTER_FAILED).to_owned())
            }
        }
    }

    /// Verifies a stored session with the backend.
    ///
    /// Without a stored token and user, or with a token that has already
    /// expired, the session becomes anonymous without a request. A failed
    /// check clears the stored session quietly.
    pub async fn check_auth(&self) -> AuthStatus {
        let (Some(token), Some(_)) = (self.credentials.token(), self.credentials.user()) else {
            self.dispatch(AuthAction::Logout);
            return self.status();
        };
        if TokenClaims::decode(&token).is_ok_and(|claims| claims.is_expired(Utc::now())) {
            info!("stored token has expired");
            self.forget();
            self.dispatch(AuthAction::Logout);
            return self.status();
        }

        self.dispatch(AuthAction::Start);
        match self.client.auth().me().await {
            Ok(user) => {
                if let Err(err) = self.credentials.save_user(&user) {
                    warn!(error = %err, "cannot persist refreshed user");
                }
                debug!(email = %user.email, "session verified");
                self.dispatch(AuthAction::Success { user, token });
            }
            Err(err) => {
                warn!(error = %err, "session check failed");
                self.forget();
                self.dispatch(AuthAction::Logout);
            }
        }
        self.status()
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] without a refresh token, the
    /// backend error, or a storage error.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let refresh_token = self.credentials.refresh_token().ok_or(SessionError::NotAuthenticated)?;
        let token = self.client.auth().refresh(&refresh_token).await?;
        self.credentials.save(&token)?;
        debug!("access token refreshed");
        self.dispatch(AuthAction::Success { user: token.user, token: token.access_token });
        Ok(())
    }

    /// Signs out, clearing the stored session.
    pub fn logout(&self) {
        self.forget();
        self.dispatch(AuthAction::Logout);
        info!("signed out");
        self.notify(Notice::success(LOGGED_OUT));
    }

    /// Returns `true` if the user's role is accepted by `roles`.
    ///
    /// Accepts a single [`Role`] or a collection of roles.
    pub fn has_role(&self, roles: impl RoleSet) -> bool {
        self.user().is_some_and(|user| roles.accepts(user.role))
    }

    /// Returns `true` if the user's role grants `permission`.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.user().is_some_and(|user| user.role.has_permission(permission))
    }

    /// Applies local edits to the signed-in user and stores them.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] when nobody is signed in, or a
    /// storage error.
    pub fn update_user(&self, patch: UserPatch) -> Result<(), SessionError> {
        let mut user = self.user().ok_or(SessionError::NotAuthenticated)?;
        patch.apply(&mut user);
        self.credentials.save_user(&user)?;
        self.dispatch(AuthAction::UpdateUser(patch));
        Ok(())
    }

    /// Acknowledges the last error.
    pub fn clear_error(&self) {
        self.dispatch(AuthAction::ClearError);
    }

    /// Returns how the signed-in user is presented.
    pub fn user_display(&self) -> Option<UserDisplay> {
        self.user().map(|user| UserDisplay {
            initials: initials(&user.username),
            name: user.username,
            email: user.email,
            role: user.role,
        })
    }

    /// Returns when the current access token expires.
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        let token = self.state().token?;
        TokenClaims::decode(&token).ok()?.expires_at()
    }

    fn fail<V>(&self, message: String) -> AuthOutcome<V> {
        self.forget();
        self.dispatch(AuthAction::Failure(Some(message.clone())));
        self.notify(Notice::error(message.clone()));
        AuthOutcome::failed(message)
    }

    fn forget(&self) {
        TokenSource::clear(self.credentials.as_ref());
    }

    fn notify(&self, notice: Notice) {
        self.client.notifier().notify(notice);
    }

    fn dispatch(&self, action: AuthAction) {
        self.state.send_modify(|state| {
            let previous = state.status();
            *state = std::mem::take(state).reduce(action);
            debug!(from = %previous, to = %state.status(), "auth state changed");
        });
    }

    fn apply_client_events(&self) {
        let mut events = self.client_events.lock();
        loop {
            match events.try_recv() {
                Ok(event) => {
                    if matches!(event, ClientEvent::SessionExpired) && self.state.borrow().is_authenticated() {
                        info!("session expired");
                        self.dispatch(AuthAction::Logout);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => debug!(skipped, "missed client events"),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}
