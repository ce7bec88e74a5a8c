//! Fan-out scheduling of analysis work items.
//!
//! With a concurrency of 1 items run strictly in submission order on the
//! calling task. Above 1, every item is spawned onto a `JoinSet` and gated by
//! a semaphore with exactly `concurrency` permits. Either way the returned
//! results are sorted by `sequence_index`, so downstream output does not
//! depend on the concurrency level.

use crate::error::AuditError;
use crate::invoker::Invoker;
use crate::models::{WorkItem, WorkResult};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Progress notifications emitted while a run is in flight.
#[derive(Debug)]
pub enum ProgressEvent<'a> {
    /// An item is about to start. Only emitted in sequential mode.
    Started {
        position: usize,
        total: usize,
        item: &'a WorkItem,
    },
    /// An item finished, successfully or not.
    Finished {
        completed: usize,
        total: usize,
        result: &'a WorkResult,
    },
}

/// Results of a complete run, in submission order.
#[derive(Debug)]
pub struct ScheduledRun {
    pub results: Vec<WorkResult>,
    /// Wall-clock time of the whole run.
    pub elapsed: Duration,
}

/// Runs work items against an invoker under a concurrency bound.
pub struct Scheduler {
    invoker: Arc<dyn Invoker>,
    concurrency: usize,
}

impl Scheduler {
    pub fn new(invoker: Arc<dyn Invoker>, concurrency: usize) -> Result<Self, AuditError> {
        if concurrency == 0 {
            return Err(AuditError::InvalidConcurrency);
        }
        Ok(Self {
            invoker,
            concurrency,
        })
    }

    /// Run every item exactly once and return one result per item.
    pub async fn run<F>(&self, items: Vec<WorkItem>, mut on_progress: F) -> ScheduledRun
    where
        F: FnMut(ProgressEvent<'_>),
    {
        let start = Instant::now();

        let mut results = if self.concurrency == 1 {
            self.run_sequential(items, &mut on_progress).await
        } else {
            self.run_parallel(items, &mut on_progress).await
        };

        results.sort_by_key(|r| r.sequence_index);

        ScheduledRun {
            results,
            elapsed: start.elapsed(),
        }
    }

    async fn run_sequential<F>(&self, items: Vec<WorkItem>, on_progress: &mut F) -> Vec<WorkResult>
    where
        F: FnMut(ProgressEvent<'_>),
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for (i, item) in items.into_iter().enumerate() {
            on_progress(ProgressEvent::Started {
                position: i + 1,
                total,
                item: &item,
            });

            let result = execute(Arc::clone(&self.invoker), item).await;

            on_progress(ProgressEvent::Finished {
                completed: i + 1,
                total,
                result: &result,
            });
            results.push(result);
        }

        results
    }

    async fn run_parallel<F>(&self, items: Vec<WorkItem>, on_progress: &mut F) -> Vec<WorkResult>
    where
        F: FnMut(ProgressEvent<'_>),
    {
        let total = items.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        debug!(
            "Submitting {} items to a pool of {} workers",
            total, self.concurrency
        );

        for item in items.iter().cloned() {
            let invoker = Arc::clone(&self.invoker);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                execute(invoker, item).await
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => {
                    on_progress(ProgressEvent::Finished {
                        completed: results.len() + 1,
                        total,
                        result: &result,
                    });
                    results.push(result);
                }
                Err(e) => error!("Analysis task did not complete: {}", e),
            }
        }

        // Every item gets a result, even if its task was lost.
        let seen: HashSet<usize> = results.iter().map(|r| r.sequence_index).collect();
        for item in items.into_iter().filter(|i| !seen.contains(&i.sequence_index)) {
            results.push(failed_result(
                item,
                "Analysis task did not complete".to_string(),
                Duration::ZERO,
            ));
        }

        results
    }
}

/// Invoke one item, converting every failure mode into a failed result.
async fn execute(invoker: Arc<dyn Invoker>, item: WorkItem) -> WorkResult {
    let start = Instant::now();
    let outcome = AssertUnwindSafe(invoker.invoke(&item)).catch_unwind().await;
    let elapsed = start.elapsed();

    let (success, raw_output) = match outcome {
        Ok(Ok(output)) if output.is_success() => (true, output.stdout),
        Ok(Ok(output)) => {
            debug!(
                "Analyzer exited with code {} for {}",
                output.exit_code, item.agent.name
            );
            let message = if output.stderr.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                output.stderr
            };
            (false, message)
        }
        Ok(Err(e)) => (false, format!("{:#}", e)),
        Err(panic) => (false, format!("Analysis panicked: {}", panic_message(&*panic))),
    };

    finish(item, success, raw_output, elapsed)
}

fn failed_result(item: WorkItem, message: String, elapsed: Duration) -> WorkResult {
    finish(item, false, message, elapsed)
}

fn finish(item: WorkItem, success: bool, raw_output: String, elapsed: Duration) -> WorkResult {
    WorkResult {
        sequence_index: item.sequence_index,
        had_log: item.log.is_some(),
        log_name: item.log.map(|l| l.name),
        agent: item.agent,
        success,
        raw_output,
        elapsed,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
