//! Requests issued after a quiet period.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use am_client::{ApiError, Notifier};
use parking_lot::Mutex;
use tracing::trace;

use super::{Inflight, Query, QueryError, QueryOptions, QueryState};

/// Quiet period used when none is given.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A query whose requests wait for a quiet period before running.
///
/// Every [`trigger`](Self::trigger) restarts the wait; only the last
/// trigger of a burst reaches the network. Earlier triggers resolve to
/// `Ok(None)` without polling their request.
#[derive(Debug)]
pub struct DebouncedQuery<T> {
    query: Query<T>,
    delay: Duration,
    pending: Mutex<Inflight>,
}

impl<T: Clone> DebouncedQuery<T> {
    /// Creates a handle waiting [`DEFAULT_DEBOUNCE`].
    pub fn new(notifier: Arc<dyn Notifier>, options: QueryOptions) -> Self {
        Self::with_delay(notifier, options, DEFAULT_DEBOUNCE)
    }

    /// Creates a handle waiting `delay`.
    pub fn with_delay(notifier: Arc<dyn Notifier>, options: QueryOptions, delay: Duration) -> Self {
        Self { query: Query::new(notifier, options), delay, pending: Mutex::new(Inflight::default()) }
    }

    /// Returns the quiet period.
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the last result.
    pub fn data(&self) -> Option<T> {
        self.query.data()
    }

    /// Returns the full state.
    pub fn state(&self) -> QueryState<T> {
        self.query.state()
    }

    /// Returns `true` while a request is in flight.
    pub fn is_loading(&self) -> bool {
        self.query.is_loading()
    }

    /// Returns the error of the last request.
    pub fn error(&self) -> Option<QueryError> {
        self.query.error()
    }

    /// Waits for the quiet period, then runs `request`.
    ///
    /// # Errors
    ///
    /// See [`Query::execute`].
    pub async fn trigger<F>(&self, request: F) -> Result<Option<T>, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let (generation, token) = self.pending.lock().begin();
        tokio::select! {
            biased;
            () = token.cancelled() => {
                trace!(generation, "debounced trigger superseded");
                return Ok(None);
            }
            () = tokio::time::sleep(self.delay) => {}
        }
        self.query.execute(request).await
    }

    /// Drops a pending trigger and cancels the request in flight.
    pub fn cancel(&self) {
        self.pending.lock().cancel();
        self.query.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use am_client::RecordingNotifier;
    use tokio::time::Instant;

    use super::*;

    fn debounced() -> DebouncedQuery<String> {
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::new());
        DebouncedQuery::new(notifier, QueryOptions::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_quiet_period() {
        let query = debounced();
        let started = Instant::now();
        let result = query.trigger(async { Ok("ок".to_owned()) }).await.unwrap();
        assert_eq!(result.as_deref(), Some("ок"));
        assert!(started.elapsed() >= DEFAULT_DEBOUNCE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_only_last() {
        let query = debounced();
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let search = move |term: &'static str| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ApiError>(term.to_owned())
        };

        let first = query.trigger(search("с"));
        let second = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            query.trigger(search("ст")).await
        };
        let third = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            query.trigger(search("стол")).await
        };
        let (first, second, third) = tokio::join!(first, second, third);

        assert!(first.unwrap().is_none());
        assert!(second.unwrap().is_none());
        assert_eq!(third.unwrap().as_deref(), Some("стол"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(query.data().as_deref(), Some("стол"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending() {
        let query = debounced();
        let pending = query.trigger(async { Ok("никогда".to_owned()) });
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            query.cancel();
        };
        let (result, ()) = tokio::join!(pending, cancel);
        assert!(result.unwrap().is_none());
        assert!(query.data().is_none());
    }
}
