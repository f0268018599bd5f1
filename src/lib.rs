//! # ppt2pdf
//!
//! Bulk-convert PowerPoint presentations (`.ppt`, `.pptx`, `.pptm`) to PDF by
//! driving PowerPoint itself through automation.
//!
//! ## Why drive PowerPoint?
//!
//! Only PowerPoint renders its own files faithfully: embedded fonts, SmartArt,
//! charts and animations-as-build-slides all come out the way the author saw
//! them. This crate owns none of the conversion logic. It owns the batch
//! around it: how many PowerPoint instances run at once, how each file's
//! failure is contained, and how progress reaches the caller.
//!
//! ## Pipeline Overview
//!
//! ```text
//! directory / file list
//!  │
//!  ├─ 1. Input      discover presentations, derive `<stem>.pdf` beside each
//!  ├─ 2. Dispatch   at most N conversions at once (default 4)
//!  ├─ 3. Convert    launch → Open → SaveAs(PDF) → Close → Quit, per file
//!  ├─ 4. Drain      outcomes in completion order → message + progress events
//!  └─ 5. Result     BatchResult with successes, failures, cancelled flag
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ppt2pdf::{convert_directory, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::default();
//!     let result = convert_directory("C:\\Talks", &config).await?;
//!     println!("{} converted, {} failed", result.success_count(), result.failure_count());
//!     for line in result.failure_messages() {
//!         eprintln!("{line}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ppt2pdf` binary (clap + anyhow + tracing-subscriber + indicatif + dialoguer) |
//!
//! ## Platform
//!
//! The default backend needs Windows with PowerPoint installed. Elsewhere
//! every file fails with a launch error; supply your own
//! [`Automation`] through [`BatchConfigBuilder::automation`] to test or to
//! drive another host.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BatchConfig, BatchConfigBuilder, CancelFlag, DEFAULT_CONCURRENCY};
pub use convert::{convert_directory, run_batch, run_batch_sync};
pub use error::{ConvertError, Ppt2PdfError};
pub use output::{BatchResult, ConversionOutcome};
pub use pipeline::automation::{Application, Automation, Presentation, PP_SAVE_AS_PDF};
pub use pipeline::converter::convert_task;
pub use pipeline::input::{discover_presentations, is_presentation, tasks_from_paths, ConversionTask};
pub use pipeline::powershell::{PowerShellAutomation, DEFAULT_STEP_TIMEOUT};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, OutcomeStream};
