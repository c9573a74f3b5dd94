//! Pages accumulated into one growing list.

use std::future::Future;
use std::sync::Arc;

use am_client::{ApiError, Notifier};
use am_core::{Page, PaginationConfig};
use parking_lot::Mutex;
use tracing::debug;

use super::{PageRequest, Query, QueryError, QueryOptions};

#[derive(Debug)]
struct Progress<T, F> {
    items: Vec<T>,
    next: PageRequest<F>,
    has_more: bool,
}

/// A "load more" list.
///
/// Each [`load_more`](Self::load_more) fetches the next page: page 1
/// replaces the items, later pages are appended. `has_more` follows the
/// server's `has_next`.
pub struct InfiniteQuery<T, F> {
    query: Query<Page<T>>,
    progress: Mutex<Progress<T, F>>,
}

impl<T: std::fmt::Debug, F: std::fmt::Debug> std::fmt::Debug for InfiniteQuery<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfiniteQuery").field("progress", &*self.progress.lock()).finish_non_exhaustive()
    }
}

impl<T, F> InfiniteQuery<T, F>
where
    T: Clone,
    F: Clone,
{
    /// Starts before page 1 with the configured infinite page size.
    pub fn new(notifier: Arc<dyn Notifier>, config: &PaginationConfig, filters: F) -> Self {
        Self::with_options(notifier, config, filters, QueryOptions::default())
    }

    /// Like [`new`](Self::new) with custom query options.
    pub fn with_options(
        notifier: Arc<dyn Notifier>,
        config: &PaginationConfig,
        filters: F,
        options: QueryOptions,
    ) -> Self {
        let size = config.clamp_size(config.infinite_page_size);
        Self {
            query: Query::new(notifier, options),
            progress: Mutex::new(Progress {
                items: Vec::new(),
                next: PageRequest { page: 1, size, filters },
                has_more: true,
            }),
        }
    }

    /// Returns every record loaded so far.
    pub fn items(&self) -> Vec<T> {
        self.progress.lock().items.clone()
    }

    /// Returns the number of records loaded so far.
    pub fn len(&self) -> usize {
        self.progress.lock().items.len()
    }

    /// Returns `true` if nothing is loaded.
    pub fn is_empty(&self) -> bool {
        self.progress.lock().items.is_empty()
    }

    /// Returns `true` if another page may exist.
    pub fn has_more(&self) -> bool {
        self.progress.lock().has_more
    }

    /// Returns the parameters the next [`load_more`](Self::load_more) uses.
    pub fn next_request(&self) -> PageRequest<F> {
        self.progress.lock().next.clone()
    }

    /// Returns `true` while a page is being fetched.
    pub fn is_loading(&self) -> bool {
        self.query.is_loading()
    }

    /// Returns the error of the last fetch.
    pub fn error(&self) -> Option<QueryError> {
        self.query.error()
    }

    /// Fetches the next page.
    ///
    /// Does nothing and returns `Ok(None)` while a fetch is in flight or
    /// when the last page has been reached. On failure the page number is
    /// left unchanged so the same page is retried next time.
    ///
    /// # Errors
    ///
    /// See [`Query::execute`].
    pub async fn load_more<Fetch, Fut>(&self, fetch: Fetch) -> Result<Option<Page<T>>, ApiError>
    where
        Fetch: FnOnce(PageRequest<F>) -> Fut,
        Fut: Future<Output = Result<Page<T>, ApiError>>,
    {
        let request = {
            let progress = self.progress.lock();
            if self.query.is_loading() || !progress.has_more {
                return Ok(None);
            }
            progress.next.clone()
        };
        let page = request.page;
        debug!(page, size = request.size, "loading more");

        let Some(loaded) = self.query.execute(fetch(request)).await? else {
            return Ok(None);
        };

        let mut progress = self.progress.lock();
        // A refresh started meanwhile owns the list now.
        if progress.next.page != page {
            return Ok(None);
        }
        if page == 1 {
            progress.items.clone_from(&loaded.items);
        } else {
            progress.items.extend(loaded.items.iter().cloned());
        }
        progress.has_more = loaded.has_next;
        progress.next.page = page + 1;
        Ok(Some(loaded))
    }

    /// Clears the list and loads page 1 again.
    ///
    /// # Errors
    ///
    /// See [`Query::execute`].
    pub async fn refresh<Fetch, Fut>(&self, fetch: Fetch) -> Result<Option<Page<T>>, ApiError>
    where
        Fetch: FnOnce(PageRequest<F>) -> Fut,
        Fut: Future<Output = Result<Page<T>, ApiError>>,
    {
        self.rewind(None);
        self.load_more(fetch).await
    }

    /// Replaces the filters, clears the list, and loads page 1.
    ///
    /// # Errors
    ///
    /// See [`Query::execute`].
    pub async fn update_filters<Fetch, Fut>(&self, filters: F, fetch: Fetch) -> Result<Option<Page<T>>, ApiError>
    where
        Fetch: FnOnce(PageRequest<F>) -> Fut,
        Fut: Future<Output = Result<Page<T>, ApiError>>,
    {
        self.rewind(Some(filters));
        self.load_more(fetch).await
    }

    fn rewind(&self, filters: Option<F>) {
        self.query.cancel();
        let mut progress = self.progress.lock();
        progress.items.clear();
        progress.has_more = true;
        progress.next.page = 1;
        if let Some(filters) = filters {
            progress.next.filters = filters;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use am_client::RecordingNotifier;

    use super::*;

    fn infinite() -> InfiniteQuery<u32, Option<String>> {
        let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::new());
        InfiniteQuery::new(notifier, &PaginationConfig::default(), None)
    }

    fn respond(req: &PageRequest<Option<String>>, total: u64) -> Result<Page<u32>, ApiError> {
        let start = req.page_params().offset();
        let end = (start + u64::from(req.size)).min(total);
        let items = (start..end).map(|i| u32::try_from(i).unwrap_or(u32::MAX)).collect();
        Ok(Page::new(items, req.page, req.size, total))
    }

    #[tokio::test]
    async fn test_pages_accumulate_until_exhausted() {
        let query = infinite();
        assert_eq!(query.next_request().size, 20);
        assert!(query.has_more());

        query.load_more(|req| async move { respond(&req, 45) }).await.unwrap();
        assert_eq!(query.len(), 20);
        query.load_more(|req| async move { respond(&req, 45) }).await.unwrap();
        query.load_more(|req| async move { respond(&req, 45) }).await.unwrap();
        assert_eq!(query.items(), (0..45).collect::<Vec<_>>());
        assert!(!query.has_more());

        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = query
            .load_more(move |req| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                respond(&req, 45)
            })
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_replaces_items() {
        let query = infinite();
        query.load_more(|req| async move { respond(&req, 45) }).await.unwrap();
        query.load_more(|req| async move { respond(&req, 45) }).await.unwrap();
        assert_eq!(query.len(), 40);

        query.refresh(|req| async move { respond(&req, 5) }).await.unwrap();
        assert_eq!(query.items(), vec![0, 1, 2, 3, 4]);
        assert!(!query.has_more());
        assert_eq!(query.next_request().page, 2);
    }

    #[tokio::test]
    async fn test_update_filters_restarts() {
        let query = infinite();
        query.load_more(|req| async move { respond(&req, 45) }).await.unwrap();
        query
            .update_filters(Some("ноутбук".to_owned()), |req| async move {
                assert_eq!(req.page, 1);
                assert_eq!(req.filters.as_deref(), Some("ноутбук"));
                respond(&req, 3)
            })
            .await
            .unwrap();
        assert_eq!(query.len(), 3);
    }

    #[tokio::test]
    async fn test_failure_keeps_page() {
        let query = infinite();
        query.load_more(|req| async move { respond(&req, 45) }).await.unwrap();
        let result = query.load_more(|_| async { Err(ApiError::Timeout) }).await;
        assert!(result.is_err());
        assert_eq!(query.next_request().page, 2);
        assert_eq!(query.len(), 20);
        assert!(query.error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_second_load_while_loading() {
        let query = infinite();
        let slow = query.load_more(|req| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            respond(&req, 45)
        });
        let eager = async {
            tokio::task::yield_now().await;
            query.load_more(|req| async move { respond(&req, 45) }).await
        };
        let (first, second) = tokio::join!(slow, eager);
        assert!(first.unwrap().is_some());
        assert!(second.unwrap().is_none());
        assert_eq!(query.len(), 20);
    }
}
