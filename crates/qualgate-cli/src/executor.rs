//! Bounded-parallelism execution of validated specs.
//!
//! A fixed set of worker tasks pulls spec indices from a single preloaded
//! queue; there is no work-stealing pool to reason about. Results are
//! collected by submission index, which makes report ordering stable across
//! runs.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use qualgate_common::config::CommandSpec;
use qualgate_filter::ProcessResult;

use crate::runner;

/// One unit of work: a display id (group label) plus the spec to run.
#[derive(Debug, Clone)]
pub struct ExecItem {
    pub id: String,
    pub spec: CommandSpec,
}

/// Executor-wide knobs, resolved by the dispatcher from config and flags.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Worker count. The dispatcher passes [`default_parallelism`] unless
    /// overridden by `--parallel`.
    pub parallel: usize,
    /// Cancel all siblings after the first non-zero exit.
    pub fail_fast: bool,
    /// Timeout for specs that do not set their own, in milliseconds.
    pub default_timeout_ms: u64,
    /// Working directory for specs that do not set their own.
    pub invocation_dir: PathBuf,
}

/// Default worker count: logical CPUs, capped at 8.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZero::get).min(8)
}

/// Run every item and return `(id, result)` pairs in submission order.
///
/// External cancellation (or fail-fast) cancels in-flight runs and drains
/// still-queued items with the not-started sentinel. A worker panic is
/// surfaced as launch-error text on the item it was running; other items
/// complete normally.
pub async fn execute(
    items: Vec<ExecItem>,
    opts: &ExecOptions,
    cancel: &CancellationToken,
) -> Vec<(String, ProcessResult)> {
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let run_token = cancel.child_token();
    let (tx, rx) = mpsc::channel::<usize>(total);
    for idx in 0..total {
        // Preloading cannot fail: the channel holds exactly `total` slots.
        let _ = tx.send(idx).await;
    }
    drop(tx);

    let queue = Arc::new(tokio::sync::Mutex::new(rx));
    let items = Arc::new(items);
    let results: Arc<Mutex<Vec<Option<ProcessResult>>>> =
        Arc::new(Mutex::new(vec![None; total]));

    let workers = opts.parallel.clamp(1, total);
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let items = Arc::clone(&items);
        let results = Arc::clone(&results);
        let run_token = run_token.clone();
        let fail_fast = opts.fail_fast;
        let default_timeout_ms = opts.default_timeout_ms;
        let invocation_dir = opts.invocation_dir.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let next = { queue.lock().await.recv().await };
                let Some(idx) = next else {
                    break;
                };

                let result = if run_token.is_cancelled() {
                    ProcessResult::not_started()
                } else {
                    run_isolated(&items[idx].spec, default_timeout_ms, &invocation_dir, &run_token)
                        .await
                };

                if fail_fast && result.exit_code != 0 {
                    run_token.cancel();
                }
                results.lock().unwrap_or_else(PoisonError::into_inner)[idx] = Some(result);
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    let collected = {
        let mut slots = results.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *slots)
    };
    items
        .iter()
        .zip(collected)
        .map(|(item, slot)| (item.id.clone(), slot.unwrap_or_else(ProcessResult::not_started)))
        .collect()
}

/// Run one spec inside its own task so a panic cannot take the worker down.
async fn run_isolated(
    spec: &CommandSpec,
    default_timeout_ms: u64,
    invocation_dir: &std::path::Path,
    cancel: &CancellationToken,
) -> ProcessResult {
    let spec = spec.clone();
    let invocation_dir = invocation_dir.to_path_buf();
    let cancel = cancel.clone();
    let task = tokio::spawn(async move {
        runner::run(&spec, default_timeout_ms, &invocation_dir, &cancel).await
    });
    match task.await {
        Ok(result) => result,
        Err(e) => ProcessResult::launch_failure(format!("internal worker error: {e}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests;
