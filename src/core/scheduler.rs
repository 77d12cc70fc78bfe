//! Fan-out/merge and sequential pipeline primitives
//!
//! Both the filesystem crawler and the dependency resolver are built on
//! these two execution shapes. `parallel` is structured concurrency: it
//! launches one task per item and joins all of them, merging results by
//! input position so callers see deterministic output no matter which
//! branch finishes first. `pipeline` is the opposite guarantee: strict
//! sequencing, stage i+1 issued only after stage i resolves.

use futures::future::BoxFuture;
use std::future::Future;
use tokio::task::JoinSet;
use tracing::error;

use super::errors::Result;

/// A single pipeline stage: consumes the previous stage's output and
/// produces the next. An `Err` short-circuits the remaining stages.
pub type Stage<T> = Box<dyn FnOnce(T) -> BoxFuture<'static, Result<T>> + Send>;

/// Run `worker` once per item concurrently and join when all complete.
///
/// Results are returned indexed by input position, never by completion
/// order. There is no cancellation: once issued, every branch runs to
/// completion even if a sibling has already failed.
pub async fn parallel<I, T, F, Fut>(items: Vec<I>, worker: F) -> Vec<T>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let count = items.len();
    let mut set = JoinSet::new();
    for (position, item) in items.into_iter().enumerate() {
        let fut = worker(item);
        set.spawn(async move { (position, fut.await) });
    }

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(count).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((position, value)) => slots[position] = Some(value),
            Err(err) => error!("parallel worker panicked: {}", err),
        }
    }
    slots.into_iter().flatten().collect()
}

/// Run `stages` strictly one after another, threading the value through.
///
/// This is the only place total ordering is guaranteed; the dependency
/// check relies on it so that a failed install deterministically halts
/// the installs queued behind it.
pub async fn pipeline<T>(seed: T, stages: Vec<Stage<T>>) -> Result<T> {
    let mut value = seed;
    for stage in stages {
        value = stage(value).await?;
    }
    Ok(value)
}

/// A stage that passes the value through unchanged.
pub fn noop_stage<T: Send + 'static>() -> Stage<T> {
    Box::new(|value| Box::pin(async move { Ok(value) }))
}
