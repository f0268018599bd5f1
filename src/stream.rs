//! Streaming conversion API: emit outcomes as they complete.
//!
//! Unlike the eager [`crate::convert::run_batch`], which aggregates into a
//! [`crate::output::BatchResult`] and drives the progress callback,
//! [`convert_stream`] hands the raw outcomes to the caller in completion
//! order. Dropping the stream stops further conversions from being started;
//! conversions already running finish in the background.

use crate::config::BatchConfig;
use crate::convert::dispatch;
use crate::output::ConversionOutcome;
use crate::pipeline::input::ConversionTask;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of conversion outcomes.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = ConversionOutcome> + Send>>;

/// Convert `tasks`, streaming each outcome as soon as it is ready.
///
/// Uses the same bounded worker pool as `run_batch`. The progress callback
/// and cancel flag in `config` are not consulted.
///
/// # Example
/// ```rust,no_run
/// use ppt2pdf::{convert_stream, tasks_from_paths, BatchConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let tasks = tasks_from_paths(["talk.pptx", "slides.ppt"]);
/// let mut outcomes = convert_stream(tasks, &BatchConfig::default());
/// while let Some(outcome) = outcomes.next().await {
///     println!("{}", outcome.message);
/// }
/// # }
/// ```
pub fn convert_stream(tasks: Vec<ConversionTask>, config: &BatchConfig) -> OutcomeStream {
    info!(
        "Starting streaming conversion: {} files, concurrency {}",
        tasks.len(),
        config.concurrency
    );
    let automation = config.resolve_automation();
    Box::pin(dispatch(tasks, automation, config.concurrency))
}
