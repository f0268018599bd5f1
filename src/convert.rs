//! Batch conversion entry points.
//!
//! [`run_batch`] is the batch runner: it keeps at most `concurrency`
//! conversions running, drains their outcomes in completion order, reports
//! each one to the progress callback, and returns the aggregated
//! [`BatchResult`]. Use [`crate::stream::convert_stream`] instead when you
//! want the outcomes as a `Stream` and will aggregate them yourself.

use crate::config::BatchConfig;
use crate::error::{ConvertError, Ppt2PdfError};
use crate::output::{BatchResult, ConversionOutcome};
use crate::pipeline::automation::Automation;
use crate::pipeline::converter::convert_task;
use crate::pipeline::input::{self, ConversionTask};
use crate::progress::percent_complete;
use futures::stream::{self, Stream, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every task, at most `config.concurrency` at a time.
///
/// This never fails: per-file errors are recorded as failure outcomes.
///
/// # Events
/// For a non-empty batch the callback receives `on_batch_start`, then
/// `on_message` + `on_progress` for every drained outcome, then exactly one
/// `on_finished`. An empty batch only receives `on_finished`.
///
/// # Cancellation
/// `config.cancel_flag` is checked before waiting for each outcome and again
/// when one arrives. Once it is set no further events fire, no further
/// conversions start, and the result is returned with `cancelled = true`.
/// Conversions already running are left to finish on their blocking threads
/// so no PowerPoint instance is orphaned mid-call.
pub async fn run_batch(tasks: Vec<ConversionTask>, config: &BatchConfig) -> BatchResult {
    let start = Instant::now();
    let total = tasks.len();
    let callback = config.progress_callback.clone();
    let cancel = config.cancel_flag.clone();
    let mut result = BatchResult::with_total(total);

    if total == 0 {
        debug!("Empty batch, nothing to convert");
        if let Some(ref cb) = callback {
            cb.on_finished(&result);
        }
        return result;
    }

    info!(
        "Starting batch: {} files, concurrency {}",
        total, config.concurrency
    );
    if let Some(ref cb) = callback {
        cb.on_batch_start(total);
    }

    let automation = config.resolve_automation();
    let mut outcomes = Box::pin(dispatch(tasks, automation, config.concurrency));

    while result.outcomes.len() < total {
        if cancel.is_cancelled() {
            result.cancelled = true;
            break;
        }
        let Some(outcome) = outcomes.next().await else {
            break;
        };
        if cancel.is_cancelled() {
            result.cancelled = true;
            break;
        }

        let completed = result.outcomes.len() + 1;
        if let Some(ref cb) = callback {
            cb.on_message(&outcome);
            cb.on_progress(percent_complete(completed, total), completed, total);
        }
        result.outcomes.push(outcome);
    }
    drop(outcomes);

    result.duration_ms = start.elapsed().as_millis() as u64;
    if result.cancelled {
        warn!(
            "Batch cancelled after {}/{} files",
            result.outcomes.len(),
            total
        );
    } else {
        info!(
            "Batch complete: {} converted, {} failed, {}ms",
            result.success_count(),
            result.failure_count(),
            result.duration_ms
        );
    }

    if let Some(ref cb) = callback {
        cb.on_finished(&result);
    }
    result
}

/// Discover the presentations in `dir` and convert them all.
///
/// # Errors
/// Only discovery can fail (missing directory, unreadable listing).
pub async fn convert_directory(
    dir: impl AsRef<Path>,
    config: &BatchConfig,
) -> Result<BatchResult, Ppt2PdfError> {
    let paths = input::discover_presentations(dir)?;
    Ok(run_batch(input::tasks_from_paths(paths), config).await)
}

/// Synchronous wrapper around [`run_batch`].
///
/// Creates a Tokio runtime internally; for callers (GUI threads, scripts)
/// without one. Returns once the runtime has shut down, which includes
/// waiting for conversions left running by a cancellation.
pub fn run_batch_sync(
    tasks: Vec<ConversionTask>,
    config: &BatchConfig,
) -> Result<BatchResult, Ppt2PdfError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Ppt2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    Ok(runtime.block_on(run_batch(tasks, config)))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// The worker pool: each task runs on the blocking pool, at most
/// `concurrency` at once, yielded in completion order.
///
/// Tasks are dispatched lazily as the stream is polled, so dropping the
/// stream stops new conversions from starting.
pub(crate) fn dispatch(
    tasks: Vec<ConversionTask>,
    automation: Arc<dyn Automation>,
    concurrency: usize,
) -> impl Stream<Item = ConversionOutcome> + Send + 'static {
    stream::iter(tasks)
        .map(move |task| {
            let automation = Arc::clone(&automation);
            async move {
                let job = {
                    let task = task.clone();
                    tokio::task::spawn_blocking(move || convert_task(automation.as_ref(), &task))
                };
                match job.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Worker for {} died: {}", task.input().display(), e);
                        ConversionOutcome::failed(
                            &task,
                            ConvertError::Panicked {
                                detail: e.to_string(),
                            },
                            0,
                        )
                    }
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
}
