//! Bounded fan-out that keeps every outcome in input order

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Run `task` for every input with at most `max_concurrency` in flight.
///
/// Slot `i` holds the outcome for input `i`, or `None` if that task panicked.
/// One failing task never cancels the others.
pub(crate) async fn fan_out<T, R, F, Fut>(
    inputs: Vec<T>,
    max_concurrency: usize,
    task: F,
) -> Vec<Option<R>>
where
    R: Send + 'static,
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut slots: Vec<Option<R>> = (0..inputs.len()).map(|_| None).collect();
    let mut set = JoinSet::new();

    for (index, input) in inputs.into_iter().enumerate() {
        let fut = task(index, input);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = semaphore.acquire_owned().await.ok();
            (index, fut.await)
        });
    }

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(e) => warn!(error = %e, "fan-out task failed to complete"),
        }
    }

    slots
}
