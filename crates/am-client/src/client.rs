//! The API client.
//!
//! [`ApiClient`] resolves paths against the configured base URL, attaches the
//! bearer token, classifies failures into [`ApiError`], and reports them
//! through the configured [`Notifier`].

use std::sync::Arc;
use std::time::Duration;

use am_core::{ApiConfig, CacheConfig, Config};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::download::Download;
use crate::error::{ApiError, SESSION_EXPIRED_MESSAGE};
use crate::notify::{Notice, Notifier, TracingNotifier};
use crate::retry::RetryPolicy;
use crate::token::{ClientEvent, MemoryToken, TokenSource};
use crate::transport::{
    HttpRequest, HttpResponse, HttpTransport, Method, MultipartForm, RequestBody, Transport, TransportError,
};
use crate::url::join_url;

const EVENT_CAPACITY: usize = 16;

/// Per-request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Report failures through the notifier.
    pub notify: bool,
    /// Timeout overriding the configured default.
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { notify: true, timeout: None }
    }
}

impl RequestOptions {
    /// Options that suppress failure notices.
    #[must_use]
    pub const fn silent() -> Self {
        Self { notify: false, timeout: None }
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Backend health report from `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `healthy` when the service is up.
    pub status: String,
    /// Server time of the check.
    #[serde(default, with = "am_core::types::timestamp::option")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Database connectivity, `connected` when reachable.
    #[serde(default)]
    pub database: String,
    /// API version.
    #[serde(default)]
    pub version: String,
}

impl HealthStatus {
    /// Returns `true` if the service and its database are up.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy" && (self.database.is_empty() || self.database == "connected")
    }
}

/// Client for the asset manager REST API.
///
/// Generic over the [`Transport`] so tests can substitute a scripted one.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use am_client::{ApiClient, MemoryToken};
/// use am_client::testing::ScriptedTransport;
/// use am_core::ApiConfig;
///
/// let tokens = Arc::new(MemoryToken::with_token("jwt"));
/// let client = ApiClient::with_transport(ScriptedTransport::new(), ApiConfig::default())
///     .with_tokens(tokens);
/// assert_eq!(client.url("/assets"), "http://localhost:8000/assets");
/// ```
pub struct ApiClient<T = HttpTransport> {
    transport: T,
    config: ApiConfig,
    tokens: Arc<dyn TokenSource>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<ClientEvent>,
    cache: TtlCache<serde_json::Value>,
    cache_enabled: bool,
}

impl<T> std::fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ApiClient<HttpTransport> {
    /// Builds a `reqwest`-backed client from the full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(config.api.timeout()).map_err(|e| ApiError::network(e.to_string()))?;
        Ok(Self::with_transport(transport, config.api.clone()).with_cache(&config.cache))
    }
}

impl<T: Transport> ApiClient<T> {
    /// Creates a client over `transport` with an in-memory token holder and
    /// a tracing notifier.
    pub fn with_transport(transport: T, config: ApiConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let cache = CacheConfig::default();
        Self {
            transport,
            config,
            tokens: Arc::new(MemoryToken::new()),
            notifier: Arc::new(TracingNotifier),
            events,
            cache: TtlCache::new(cache.ttl()),
            cache_enabled: cache.enabled,
        }
    }

    /// Replaces the token source.
    #[must_use]
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Replaces the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Applies cache settings, discarding cached entries.
    #[must_use]
    pub fn with_cache(mut self, cache: &CacheConfig) -> Self {
        self.cache = TtlCache::new(cache.ttl());
        self.cache_enabled = cache.enabled;
        self
    }

    /// Returns the API configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Returns the underlying transport.
    #[inline]
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the token source.
    #[inline]
    #[must_use]
    pub const fn tokens(&self) -> &Arc<dyn TokenSource> {
        &self.tokens
    }

    /// Returns the notifier.
    #[inline]
    #[must_use]
    pub const fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Subscribes to client events such as session expiry.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Returns the retry policy from the configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config)
    }

    /// Resolves `path` against the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    /// Sends a `GET` and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] on failure.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.request(Method::Get, path, RequestBody::Empty, RequestOptions::default()).await
    }

    /// Sends a `POST` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] on failure.
    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::Post, path, json_body(body)?, RequestOptions::default()).await
    }

    /// Sends a `PUT` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] on failure.
    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::Put, path, json_body(body)?, RequestOptions::default()).await
    }

    /// Sends a `PATCH` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] on failure.
    pub async fn patch<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::Patch, path, json_body(body)?, RequestOptions::default()).await
    }

    /// Sends a `DELETE`.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] on failure.
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.request(Method::Delete, path, RequestBody::Empty, RequestOptions::default()).await
    }

    /// Sends a multipart `POST`.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] on failure.
    pub async fn upload<R: DeserializeOwned>(&self, path: &str, form: MultipartForm) -> Result<R, ApiError> {
        self.request(Method::Post, path, RequestBody::Multipart(form), RequestOptions::default()).await
    }

    /// Downloads a file with `GET`.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] on failure.
    pub async fn download(&self, path: &str) -> Result<Download, ApiError> {
        let response = self.send(Method::Get, path, RequestBody::Empty, RequestOptions::default()).await?;
        Ok(Download::from_response(response))
    }

    /// Sends a request and decodes the JSON response.
    ///
    /// An empty body decodes as JSON `null`, so `()` and `Option<_>` accept
    /// `204 No Content`.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] on failure, or
    /// [`ApiError::Decode`] if the body does not match `R`.
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<R, ApiError> {
        let response = self.send(method, path, body, options).await?;
        decode(&response.body)
    }

    /// Sends a request and returns the raw successful response.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] for transport failures and
    /// non-2xx statuses.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        options: RequestOptions,
    ) -> Result<HttpResponse, ApiError> {
        let token = self.tokens.token();
        let mut headers = vec![("Accept".to_owned(), "application/json".to_owned())];
        if let Some(token) = &token {
            headers.push(("Authorization".to_owned(), format!("Bearer {token}")));
        }
        let request = HttpRequest { method, url: self.url(path), headers, body, timeout: options.timeout };

        debug!(%method, path, "sending request");
        let started = Instant::now();
        let result = self.transport.send(request).await;
        let elapsed = started.elapsed();
        if elapsed > self.config.slow_request_threshold() {
            warn!(%method, path, elapsed_ms = elapsed.as_millis(), "slow request");
        }

        let error = match result {
            Ok(response) if response.is_success() => {
                debug!(%method, path, status = response.status, elapsed_ms = elapsed.as_millis(), "request completed");
                return Ok(response);
            }
            Ok(response) => ApiError::from_response(response.status, &response.body),
            Err(TransportError::Timeout) => ApiError::Timeout,
            Err(err) => ApiError::network(err.to_string()),
        };
        self.report(method, path, &error, token.is_some(), options);
        Err(error)
    }

    fn report(&self, method: Method, path: &str, error: &ApiError, had_token: bool, options: RequestOptions) {
        warn!(%method, path, status = ?error.status(), error = %error, "request failed");

        // A 401 without a token is a failed login, not an expired session.
        if error.is_unauthorized() && had_token {
            self.tokens.clear();
            let _ = self.events.send(ClientEvent::SessionExpired);
            self.notifier.notify(Notice::error(SESSION_EXPIRED_MESSAGE));
            return;
        }
        if options.notify {
            self.notifier.notify(Notice::error(error.user_message()));
        }
    }

    /// `GET` through the response cache.
    ///
    /// A fresh entry is returned without a request. When the request fails
    /// and an expired entry exists, the expired entry is returned instead.
    ///
    /// # Errors
    ///
    /// Returns the request error when nothing is cached for `path`.
    pub async fn cached_get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        if self.cache_enabled {
            if let Some(value) = self.cache.get_fresh(path) {
                debug!(path, "cache hit");
                return serde_json::from_value(value).map_err(ApiError::decode);
            }
        }

        match self.get::<serde_json::Value>(path).await {
            Ok(value) => {
                if self.cache_enabled {
                    self.cache.insert(path, value.clone());
                }
                serde_json::from_value(value).map_err(ApiError::decode)
            }
            Err(err) => match self.cache.get_stale(path) {
                Some(stale) if !err.is_cancelled() => {
                    warn!(path, error = %err, "serving stale cached response");
                    serde_json::from_value(stale).map_err(ApiError::decode)
                }
                _ => Err(err),
            },
        }
    }

    /// Drops cached responses whose path contains `pattern`, or all of them.
    pub fn clear_cache(&self, pattern: Option<&str>) -> usize {
        let removed = self.cache.clear(pattern);
        debug!(pattern, removed, "cleared response cache");
        removed
    }

    /// Checks backend health.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] when the service is unreachable.
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.request(Method::Get, "/health", RequestBody::Empty, RequestOptions::silent()).await
    }
}

pub(crate) fn json_body<B: Serialize + ?Sized>(body: &B) -> Result<RequestBody, ApiError> {
    Ok(RequestBody::Json(serde_json::to_vec(body)?))
}

fn decode<R: DeserializeOwned>(body: &[u8]) -> Result<R, ApiError> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) { b"null" } else { body };
    serde_json::from_slice(body).map_err(ApiError::decode)
}
