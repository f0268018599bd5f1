//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as the batch drains conversion outcomes.
//!
//! A GUI front-end maps the three core events onto its widgets: `on_progress`
//! drives a progress bar, `on_message` appends to a log view, `on_finished`
//! flips the status line back to idle. The CLI renders the same events with
//! an indicatif bar.
//!
//! # Example
//!
//! ```rust
//! use ppt2pdf::{BatchConfig, BatchProgressCallback, ConversionOutcome};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     failures: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_message(&self, outcome: &ConversionOutcome) {
//!         if !outcome.success {
//!             self.failures.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { failures: AtomicUsize::new(0) });
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{BatchResult, ConversionOutcome};
use std::sync::Arc;

/// Called by the batch runner as outcomes are drained.
///
/// All events are emitted from the task that drives the batch, one at a time
/// and in completion order, so implementations never see two calls at once
/// for the same batch. They still must be `Send + Sync` because the batch may
/// be driven from any runtime thread. All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first conversion is dispatched.
    ///
    /// Not called for an empty batch.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called for every drained outcome, success or failure.
    ///
    /// `outcome.message` is the output path on success and a readable
    /// `Error converting …` line on failure.
    fn on_message(&self, outcome: &ConversionOutcome) {
        let _ = outcome;
    }

    /// Called right after [`on_message`](Self::on_message).
    ///
    /// # Arguments
    /// * `percent`   — `round(completed / total * 100)`, never decreasing
    /// * `completed` — outcomes drained so far, failures included
    /// * `total`     — tasks submitted to the batch
    fn on_progress(&self, percent: u8, completed: usize, total: usize) {
        let _ = (percent, completed, total);
    }

    /// Called exactly once, on natural completion or after cancellation.
    fn on_finished(&self, result: &BatchResult) {
        let _ = result;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

/// Percentage of the batch drained so far, rounded to the nearest integer.
///
/// Returns 0 for an empty batch.
pub fn percent_complete(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed.min(total) as f64 / total as f64 * 100.0).round();
    pct as u8
}
