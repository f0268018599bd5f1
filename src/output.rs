//! Result types produced by the conversion pipeline.

use crate::error::ConvertError;
use crate::pipeline::input::ConversionTask;
use serde::Serialize;
use std::path::PathBuf;

/// The result of converting one presentation.
///
/// Exactly one outcome is produced per [`ConversionTask`], whether the
/// conversion succeeded or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionOutcome {
    /// Absolute path of the source presentation.
    pub input: PathBuf,
    /// Absolute path of the PDF that was (or would have been) written.
    pub output: PathBuf,
    pub success: bool,
    /// Output path on success, `Error converting <input>: <reason>` on failure.
    pub message: String,
    /// Typed failure; `None` on success.
    pub error: Option<ConvertError>,
    /// Wall-clock time spent in the automation lifecycle.
    pub duration_ms: u64,
}

impl ConversionOutcome {
    pub fn succeeded(task: &ConversionTask, duration_ms: u64) -> Self {
        Self {
            input: task.input().to_path_buf(),
            output: task.output().to_path_buf(),
            success: true,
            message: task.output().display().to_string(),
            error: None,
            duration_ms,
        }
    }

    pub fn failed(task: &ConversionTask, error: ConvertError, duration_ms: u64) -> Self {
        Self {
            input: task.input().to_path_buf(),
            output: task.output().to_path_buf(),
            success: false,
            message: format!("Error converting {}: {}", task.input().display(), error),
            error: Some(error),
            duration_ms,
        }
    }
}

/// Aggregate view over every outcome drained during one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// Outcomes in completion order.
    pub outcomes: Vec<ConversionOutcome>,
    /// Number of tasks submitted, drained or not.
    pub total: usize,
    /// `true` when the run stopped early because the cancel flag was set.
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl BatchResult {
    /// A finished, zero-count result (the result of an empty batch).
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn with_total(total: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(total),
            total,
            ..Self::default()
        }
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    /// Output paths of every successful conversion, in completion order.
    pub fn successes(&self) -> Vec<&PathBuf> {
        self.outcomes
            .iter()
            .filter(|o| o.success)
            .map(|o| &o.output)
            .collect()
    }

    /// Readable failure lines, in completion order.
    pub fn failure_messages(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.message.as_str())
            .collect()
    }

    /// `true` when every submitted task has a recorded outcome.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.outcomes.len() == self.total
    }
}
