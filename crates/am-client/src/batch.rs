//! Chunked concurrent requests.

use std::future::Future;

use futures_util::future::join_all;

/// Default number of requests run concurrently by [`batch`].
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Runs futures in chunks of `size`, each chunk concurrently, and returns
/// every outcome in input order.
///
/// A failed request does not stop the others; callers receive each
/// `Result` as it settled.
///
/// # Examples
///
/// ```
/// use am_client::batch;
///
/// # let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # runtime.block_on(async {
/// let ids = [1, 2, 3];
/// let results = batch(ids.iter().map(|id| async move { id * 10 }), 2).await;
/// assert_eq!(results, vec![10, 20, 30]);
/// # });
/// ```
pub async fn batch<I, F>(requests: I, size: usize) -> Vec<F::Output>
where
    I: IntoIterator<Item = F>,
    F: Future,
{
    let size = size.max(1);
    let mut pending = requests.into_iter().peekable();
    let mut results = Vec::new();
    while pending.peek().is_some() {
        let chunk: Vec<F> = pending.by_ref().take(size).collect();
        results.extend(join_all(chunk).await);
    }
    results
}
