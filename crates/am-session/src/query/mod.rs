//! Cancellable query handles.
//!
//! A [`Query`] tracks `{data, loading, error}` for one kind of request.
//! Starting a new request cancels the one in flight, so the most recent
//! call always wins; a superseded call resolves to `Ok(None)` and leaves the
//! state alone. Each handle owns its cancellation state and its cache.
//!
//! Specialized handles build on it:
//!
//! - [`PaginatedQuery`]: page/size/filters with page navigation
//! - [`InfiniteQuery`]: pages accumulated into one list
//! - [`OptimisticQuery`]: provisional data rolled back on failure
//! - [`DebouncedQuery`]: requests issued after a quiet period

mod debounced;
mod infinite;
mod optimistic;
mod paginated;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use am_client::{ApiError, Notice, Notifier, TtlCache};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use debounced::{DEFAULT_DEBOUNCE, DebouncedQuery};
pub use infinite::InfiniteQuery;
pub use optimistic::OptimisticQuery;
pub use paginated::{PageRequest, PaginatedQuery};

/// Default lifetime of cached query results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

const DEFAULT_ERROR_MESSAGE: &str = "Произошла ошибка";

/// A failed request as kept in query state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    /// HTTP status, if a response was received.
    pub status: Option<u16>,
    /// Message shown to the user: the server detail when present.
    pub message: String,
}

impl From<&ApiError> for QueryError {
    fn from(err: &ApiError) -> Self {
        let message = match err.detail() {
            Some(detail) if !detail.is_empty() => detail.to_owned(),
            Some(_) => DEFAULT_ERROR_MESSAGE.to_owned(),
            None => err.user_message(),
        };
        Self { status: err.status(), message }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Snapshot of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// Last successful result.
    pub data: Option<T>,
    /// Whether a request is in flight.
    pub loading: bool,
    /// Error of the last request.
    pub error: Option<QueryError>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self { data: None, loading: false, error: None }
    }
}

/// Behavior of a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Emit an error notice when a request fails.
    pub notify_errors: bool,
    /// Cache successful results under this key.
    pub cache_key: Option<String>,
    /// How long cached results are served without a request.
    pub cache_ttl: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { notify_errors: true, cache_key: None, cache_ttl: DEFAULT_CACHE_TTL }
    }
}

impl QueryOptions {
    /// Options without error notices.
    #[must_use]
    pub fn silent() -> Self {
        Self { notify_errors: false, ..Self::default() }
    }

    /// Caches results under `key` for `ttl`.
    #[must_use]
    pub fn cached(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.cache_key = Some(key.into());
        self.cache_ttl = ttl;
        self
    }
}

/// Tracks the request in flight so a newer one can supersede it.
#[derive(Debug, Default)]
pub(crate) struct Inflight {
    generation: u64,
    token: CancellationToken,
}

impl Inflight {
    /// Cancels the current request and starts a new generation.
    pub(crate) fn begin(&mut self) -> (u64, CancellationToken) {
        self.token.cancel();
        self.generation += 1;
        self.token = CancellationToken::new();
        (self.generation, self.token.clone())
    }

    /// Cancels the current request without starting another.
    pub(crate) fn cancel(&mut self) {
        self.token.cancel();
        self.generation += 1;
    }

    pub(crate) const fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

/// A request handle with last-write-wins semantics.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use am_client::TracingNotifier;
/// use am_session::query::{Query, QueryOptions};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let query = Query::new(Arc::new(TracingNotifier), QueryOptions::default());
/// let answer = query.execute(async { Ok::<_, am_client::ApiError>(42) }).await.unwrap();
/// assert_eq!(answer, Some(42));
/// assert_eq!(query.data(), Some(42));
/// # });
/// ```
pub struct Query<T> {
    state: watch::Sender<QueryState<T>>,
    inflight: Mutex<Inflight>,
    cache: TtlCache<T>,
    options: QueryOptions,
    notifier: Arc<dyn Notifier>,
}

impl<T: fmt::Debug> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("state", &*self.state.borrow())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T: Clone> Query<T> {
    /// Creates an idle query.
    pub fn new(notifier: Arc<dyn Notifier>, options: QueryOptions) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            state,
            inflight: Mutex::new(Inflight::default()),
            cache: TtlCache::new(options.cache_ttl),
            options,
            notifier,
        }
    }

    /// Creates an idle query starting with `data`.
    pub fn with_data(notifier: Arc<dyn Notifier>, options: QueryOptions, data: T) -> Self {
        let query = Self::new(notifier, options);
        query.set_data(Some(data));
        query
    }

    /// Returns a snapshot of the state.
    pub fn state(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    /// Returns the last successful result.
    pub fn data(&self) -> Option<T> {
        self.state.borrow().data.clone()
    }

    /// Returns `true` while a request is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Returns the error of the last request.
    pub fn error(&self) -> Option<QueryError> {
        self.state.borrow().error.clone()
    }

    /// Subscribes to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    /// Returns the options.
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Replaces the data without a request.
    pub fn set_data(&self, data: Option<T>) {
        self.state.send_modify(|state| state.data = data);
    }

    /// Runs `request`, cancelling any request still in flight.
    ///
    /// Returns `Ok(None)` when the call was superseded or cancelled. A fresh
    /// cached result is returned without polling `request`.
    ///
    /// # Errors
    ///
    /// Returns the request's error after recording it in the state and,
    /// unless disabled, emitting an error notice.
    pub async fn execute<F>(&self, request: F) -> Result<Option<T>, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let (generation, token) = self.inflight.lock().begin();

        if let Some(key) = &self.options.cache_key {
            if let Some(hit) = self.cache.get_fresh(key) {
                debug!(key, "query cache hit");
                self.state.send_modify(|state| {
                    state.data = Some(hit.clone());
                    state.loading = false;
                    state.error = None;
                });
                return Ok(Some(hit));
            }
        }

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(generation, "query superseded");
                return Ok(None);
            }
            result = request => result,
        };

        if !self.inflight.lock().is_current(generation) {
            debug!(generation, "discarding superseded result");
            return Ok(None);
        }

        match result {
            Ok(data) => {
                if let Some(key) = &self.options.cache_key {
                    self.cache.insert(key.clone(), data.clone());
                }
                self.state.send_modify(|state| {
                    state.data = Some(data.clone());
                    state.loading = false;
                });
                Ok(Some(data))
            }
            Err(err) if err.is_cancelled() => {
                self.state.send_modify(|state| state.loading = false);
                Ok(None)
            }
            Err(err) => {
                let error = QueryError::from(&err);
                if self.options.notify_errors {
                    self.notifier.notify(Notice::error(error.message.clone()));
                }
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(error);
                });
                Err(err)
            }
        }
    }

    /// Cancels the request in flight, if any.
    pub fn cancel(&self) {
        self.inflight.lock().cancel();
        self.state.send_modify(|state| state.loading = false);
    }

    /// Drops the cached result.
    pub fn clear_cache(&self) {
        if let Some(key) = &self.options.cache_key {
            self.cache.remove(key);
        }
    }

    /// Cancels any request and returns to the initial state.
    pub fn reset(&self) {
        self.inflight.lock().cancel();
        self.clear_cache();
        self.state.send_replace(QueryState::default());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use am_client::{NoticeLevel, RecordingNotifier};

    use super::*;

    fn query<T: Clone>(options: QueryOptions) -> (Query<T>, Arc<RecordingNotifier>) {
        let notices = Arc::new(RecordingNotifier::new());
        (Query::new(Arc::clone(&notices) as Arc<dyn Notifier>, options), notices)
    }

    async fn after(ms: u64, value: u32) -> Result<u32, ApiError> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_call_wins() {
        let (query, _) = query::<u32>(QueryOptions::default());
        let (first, second) = tokio::join!(query.execute(after(500, 1)), query.execute(after(10, 2)));
        assert_eq!(first.unwrap(), None);
        assert_eq!(second.unwrap(), Some(2));
        assert_eq!(query.data(), Some(2));
        assert!(!query.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_newer_call_still_wins() {
        let (query, _) = query::<u32>(QueryOptions::default());
        let (first, second) = tokio::join!(query.execute(after(10, 1)), query.execute(after(500, 2)));
        assert_eq!(first.unwrap(), None);
        assert_eq!(second.unwrap(), Some(2));
        assert_eq!(query.data(), Some(2));
    }

    #[tokio::test]
    async fn test_error_is_recorded_and_notified() {
        let (query, notices) = query::<u32>(QueryOptions::default());
        let err = ApiError::from_response(404, br#"{"detail": "Asset not found"}"#);
        let result = query.execute(async { Err(err) }).await;
        assert!(matches!(result, Err(ApiError::NotFound { .. })));

        let state = query.state();
        assert_eq!(state.error, Some(QueryError { status: Some(404), message: "Asset not found".to_owned() }));
        assert!(!state.loading);
        assert_eq!(notices.messages(NoticeLevel::Error), vec!["Asset not found".to_owned()]);
    }

    #[tokio::test]
    async fn test_silent_query_and_cancelled_error() {
        let (query, notices) = query::<u32>(QueryOptions::silent());
        let _ = query.execute(async { Err(ApiError::Timeout) }).await;
        assert!(notices.notices().is_empty());
        assert_eq!(query.error().map(|e| e.message), Some(ApiError::Timeout.user_message()));

        let cancelled = query.execute(async { Err(ApiError::Cancelled) }).await;
        assert_eq!(cancelled.unwrap(), None);
        assert!(query.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_bypasses_request_while_fresh() {
        let (query, _) = query::<u32>(QueryOptions::default().cached("dashboard", Duration::from_secs(60)));
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let request = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        };

        assert_eq!(query.execute(request()).await.unwrap(), Some(7));
        assert_eq!(query.execute(request()).await.unwrap(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        let _ = query.execute(request()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        query.clear_cache();
        let _ = query.execute(request()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_and_clears() {
        let (query, _) = query::<u32>(QueryOptions::default());
        let _ = query.execute(after(0, 5)).await;
        let (pending, ()) = tokio::join!(query.execute(after(100, 6)), async {
            tokio::task::yield_now().await;
            query.reset();
        });
        assert_eq!(pending.unwrap(), None);
        assert_eq!(query.state(), QueryState::default());
    }

    #[tokio::test]
    async fn test_with_data_and_subscribe() {
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::new());
        let query = Query::with_data(notifier, QueryOptions::default(), vec![1, 2]);
        let mut updates = query.subscribe();
        assert_eq!(query.data(), Some(vec![1, 2]));

        let _ = query.execute(async { Ok(vec![3]) }).await;
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().data, Some(vec![3]));
    }
}
