//! Provisional updates reconciled with the server.

use std::future::Future;
use std::sync::Arc;

use am_client::{ApiError, Notifier};
use parking_lot::Mutex;
use tokio::sync::watch;

use super::{Query, QueryError, QueryOptions, QueryState};

/// A query that shows a provisional value while its request runs.
///
/// On success the server's value replaces the provisional one; on failure
/// the last value the server confirmed is restored. Errors are not
/// announced unless the handle is built with notifying options.
#[derive(Debug)]
pub struct OptimisticQuery<T> {
    query: Query<T>,
    /// Last server-confirmed value; provisional values never land here.
    confirmed: Mutex<Option<T>>,
}

impl<T: Clone> OptimisticQuery<T> {
    /// Creates an empty handle that does not emit error notices.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { query: Query::new(notifier, QueryOptions::silent()), confirmed: Mutex::new(None) }
    }

    /// Creates a handle holding `data`.
    pub fn with_data(notifier: Arc<dyn Notifier>, options: QueryOptions, data: T) -> Self {
        let confirmed = Mutex::new(Some(data.clone()));
        Self { query: Query::with_data(notifier, options, data), confirmed }
    }

    /// Returns the current value.
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

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.query.subscribe()
    }

    /// Shows `provisional` (if any) and runs `request`.
    ///
    /// A superseded call returns `Ok(None)` and leaves the value to the
    /// newer call.
    ///
    /// # Errors
    ///
    /// Returns the request's error after restoring the last confirmed value.
    pub async fn execute<F>(&self, provisional: Option<T>, request: F) -> Result<Option<T>, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = provisional {
            self.query.set_data(Some(value));
        }
        let result = self.query.execute(request).await;
        match &result {
            Ok(Some(value)) => *self.confirmed.lock() = Some(value.clone()),
            Ok(None) => {}
            Err(_) => {
                let confirmed = self.confirmed.lock().clone();
                self.query.set_data(confirmed);
            }
        }
        result
    }
}
