//! Server-side pagination over a [`Query`].

use std::future::Future;
use std::sync::Arc;

use am_client::{ApiError, Notifier};
use am_core::{Page, PageInfo, PageParams, PaginationConfig};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::{Query, QueryError, QueryOptions, QueryState};

/// Page, size, and filters of a paginated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest<F> {
    /// One-based page number.
    pub page: u32,
    /// Page size.
    pub size: u32,
    /// Resource-specific filters.
    pub filters: F,
}

impl<F> PageRequest<F> {
    /// Returns the page and size alone.
    #[must_use]
    pub const fn page_params(&self) -> PageParams {
        PageParams::new(self.page, self.size)
    }
}

/// A paginated list whose parameters drive refetching.
///
/// Navigation methods only change the parameters. [`sync`](Self::sync)
/// fetches when the parameters differ from the last fetched ones, so
/// repeated calls without changes do not hit the network.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use am_client::{ApiClient, TracingNotifier};
/// use am_core::{AssetQuery, Config};
/// use am_session::query::PaginatedQuery;
///
/// # async fn run(client: Arc<ApiClient>) -> Result<(), am_client::ApiError> {
/// let config = Config::default();
/// let assets = PaginatedQuery::new(Arc::new(TracingNotifier), &config.pagination, AssetQuery::default());
/// assets.sync(|req| async move { client.assets().list(req.page_params(), &req.filters).await }).await?;
/// assets.next_page();
/// # Ok(())
/// # }
/// ```
pub struct PaginatedQuery<T, F> {
    query: Query<Page<T>>,
    params: Mutex<PageRequest<F>>,
    fetched: Mutex<Option<String>>,
    config: PaginationConfig,
}

impl<T, F> std::fmt::Debug for PaginatedQuery<T, F>
where
    T: std::fmt::Debug,
    F: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedQuery")
            .field("params", &*self.params.lock())
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl<T, F> PaginatedQuery<T, F>
where
    T: Clone,
    F: Clone + Serialize,
{
    /// Starts at page 1 with the configured default size.
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
        Self {
            query: Query::new(notifier, options),
            params: Mutex::new(PageRequest { page: 1, size: config.default_page_size, filters }),
            fetched: Mutex::new(None),
            config: config.clone(),
        }
    }

    /// Returns the current parameters.
    pub fn params(&self) -> PageRequest<F> {
        self.params.lock().clone()
    }

    /// Returns the records of the current page, empty before the first fetch.
    pub fn items(&self) -> Vec<T> {
        self.query.data().map(|page| page.items).unwrap_or_default()
    }

    /// Returns pagination metadata; page 1, size 10, total 0 before the
    /// first fetch.
    pub fn pagination(&self) -> PageInfo {
        self.query.state().data.map(|page| page.info()).unwrap_or_default()
    }

    /// Returns the state of the underlying query.
    pub fn state(&self) -> QueryState<Page<T>> {
        self.query.state()
    }

    /// Returns `true` while a fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.query.is_loading()
    }

    /// Returns the error of the last fetch.
    pub fn error(&self) -> Option<QueryError> {
        self.query.error()
    }

    /// Changes parameters in place. A change of size returns to page 1.
    pub fn update_params(&self, f: impl FnOnce(&mut PageRequest<F>)) {
        let mut params = self.params.lock();
        let size = params.size;
        f(&mut params);
        params.size = self.config.clamp_size(params.size);
        if params.size != size {
            params.page = 1;
        }
        params.page = params.page.max(1);
    }

    /// Replaces the filters and returns to page 1.
    pub fn set_filters(&self, filters: F) {
        self.update_params(|params| {
            params.filters = filters;
            params.page = 1;
        });
    }

    /// Moves to the next page unless the current one is the last page
    /// known from the last fetch.
    ///
    /// Repeated calls without a fetch in between stop at the last page.
    pub fn next_page(&self) -> bool {
        let pages = self.pagination().pages;
        let mut moved = false;
        self.update_params(|params| {
            if params.page < pages {
                params.page += 1;
                moved = true;
            }
        });
        moved
    }

    /// Moves to the previous page unless already on page 1.
    pub fn prev_page(&self) -> bool {
        let mut moved = false;
        self.update_params(|params| {
            if params.page > 1 {
                params.page -= 1;
                moved = true;
            }
        });
        moved
    }

    /// Moves to page `page`; page 0 is treated as page 1.
    pub fn go_to_page(&self, page: u32) {
        self.update_params(|params| params.page = page);
    }

    /// Changes the page size and returns to page 1.
    pub fn change_page_size(&self, size: u32) {
        self.update_params(|params| {
            params.size = size;
            params.page = 1;
        });
    }

    /// Returns `true` if the parameters changed since the last fetch.
    pub fn is_stale(&self) -> bool {
        self.fetched.lock().as_deref() != Some(self.params_key().as_str())
    }

    /// Fetches the current parameters unconditionally.
    ///
    /// # Errors
    ///
    /// See [`Query::execute`].
    pub async fn fetch<Fetch, Fut>(&self, fetch: Fetch) -> Result<Option<Page<T>>, ApiError>
    where
        Fetch: FnOnce(PageRequest<F>) -> Fut,
        Fut: Future<Output = Result<Page<T>, ApiError>>,
    {
        let params = self.params();
        let key = self.params_key();
        *self.fetched.lock() = Some(key);
        debug!(page = params.page, size = params.size, "fetching page");
        let result = self.query.execute(fetch(params)).await;
        if result.is_err() {
            // A failed fetch must not count as fetched.
            *self.fetched.lock() = None;
        }
        result
    }

    /// Fetches only if the parameters changed since the last fetch.
    ///
    /// # Errors
    ///
    /// See [`Query::execute`].
    pub async fn sync<Fetch, Fut>(&self, fetch: Fetch) -> Result<Option<Page<T>>, ApiError>
    where
        Fetch: FnOnce(PageRequest<F>) -> Fut,
        Fut: Future<Output = Result<Page<T>, ApiError>>,
    {
        if !self.is_stale() {
            return Ok(None);
        }
        self.fetch(fetch).await
    }

    /// Cancels any fetch and forgets the data; parameters are kept.
    pub fn reset(&self) {
        self.query.reset();
        *self.fetched.lock() = None;
    }

    fn params_key(&self) -> String {
        serde_json::to_string(&*self.params.lock()).unwrap_or_else(|err| {
            warn!(error = %err, "cannot serialize page parameters");
            String::new()
        })
    }
}
