//! Unordered parallel map with panic isolation.
//!
//! [`map_unordered`] applies one pure function to every item and hands each
//! result to a completion callback on the calling thread as soon as it is
//! ready. Where the work runs is an [`ExecutionStrategy`]:
//!
//! - `Sequential`: on the calling thread, in input order.
//! - `Pool(n)`: on a dedicated rayon pool of `n` threads. Results stream back
//!   over an mpsc channel in completion order.
//!
//! A panic inside the work function is caught and returned as a
//! [`WorkerPanic`] for that item; the remaining items still run.

use rayon::prelude::*;
use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] ThreadPoolBuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Sequential,
    Pool(usize),
}

impl ExecutionStrategy {
    /// `Sequential` for one worker or fewer, a pool otherwise.
    pub fn from_workers(workers: usize) -> Self {
        if workers <= 1 {
            ExecutionStrategy::Sequential
        } else {
            ExecutionStrategy::Pool(workers)
        }
    }
}

/// A work item that panicked instead of returning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPanic {
    pub message: String,
}

impl WorkerPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "worker panicked".to_string()
        };
        Self { message }
    }
}

impl std::fmt::Display for WorkerPanic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker panicked: {}", self.message)
    }
}

/// Result of one item, tagged with the item's input index.
pub type Completion<R> = (usize, Result<R, WorkerPanic>);

/// Run `work` on the current thread, turning a panic into a [`WorkerPanic`].
pub fn run_guarded<R>(work: impl FnOnce() -> R) -> Result<R, WorkerPanic> {
    catch_unwind(AssertUnwindSafe(work)).map_err(WorkerPanic::from_payload)
}

fn guarded<T, R>(work: &(impl Fn(&T) -> R + Sync), item: &T) -> Result<R, WorkerPanic> {
    run_guarded(|| work(item))
}

/// Run `work` over `items`, calling `on_complete` for each result as it
/// arrives.
///
/// Returns every completion in arrival order. The set of results does not
/// depend on the strategy; only the order does.
pub fn map_unordered<T, R, F, C>(
    items: &[T],
    strategy: ExecutionStrategy,
    work: F,
    mut on_complete: C,
) -> Result<Vec<Completion<R>>, ExecutorError>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
    C: FnMut(&Completion<R>),
{
    let mut completions = Vec::with_capacity(items.len());

    match strategy {
        ExecutionStrategy::Sequential => {
            for (index, item) in items.iter().enumerate() {
                let completion = (index, guarded(&work, item));
                on_complete(&completion);
                completions.push(completion);
            }
        }
        ExecutionStrategy::Pool(threads) => {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads.max(1))
                .thread_name(|i| format!("restyle-worker-{i}"))
                .build()?;
            let (tx, rx) = mpsc::channel::<Completion<R>>();
            let work = &work;

            std::thread::scope(|scope| {
                scope.spawn(move || {
                    pool.install(|| {
                        items.par_iter().enumerate().for_each_with(tx, |tx, (index, item)| {
                            // Receiver outlives every sender, so this cannot fail
                            let _ = tx.send((index, guarded(work, item)));
                        });
                    });
                });

                for completion in rx {
                    on_complete(&completion);
                    completions.push(completion);
                }
            });
        }
    }

    Ok(completions)
}
