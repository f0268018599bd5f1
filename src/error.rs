//! Error types for the ppt2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Ppt2PdfError`] — **Fatal**: the batch cannot be assembled at all
//!   (input directory missing, invalid configuration). Returned as
//!   `Err(Ppt2PdfError)` from the discovery and configuration functions.
//!
//! * [`ConvertError`] — **Non-fatal**: a single presentation failed to
//!   convert (PowerPoint refused to open it, export rejected, host crashed)
//!   but every other file in the batch is unaffected. Stored inside
//!   [`crate::output::ConversionOutcome`]; it never crosses the per-file
//!   boundary as an `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ppt2pdf library.
///
/// Per-file failures use [`ConvertError`] and are stored in
/// [`crate::output::ConversionOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Ppt2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input directory does not exist.
    #[error("Directory not found: '{path}'\nCheck the path exists and is readable.")]
    DirectoryNotFound { path: PathBuf },

    /// The path exists but is a file, not a directory.
    #[error("Not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    /// Listing the directory failed (permissions, I/O error).
    #[error("Failed to read directory '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single presentation.
///
/// The variant records which lifecycle step failed; the `detail` is the text
/// reported by PowerPoint or by the automation host.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ConvertError {
    /// The automation host or the PowerPoint application could not start.
    #[error("cannot launch automation host: {detail}")]
    Launch { detail: String },

    /// PowerPoint could not open the presentation.
    #[error("open failed: {detail}")]
    Open { detail: String },

    /// PowerPoint rejected the save-as-PDF request.
    #[error("export failed: {detail}")]
    Export { detail: String },

    /// Closing the presentation failed after a successful export.
    #[error("close failed: {detail}")]
    Close { detail: String },

    /// The automation host stopped answering or its pipe broke.
    #[error("automation host error: {detail}")]
    Host { detail: String },

    /// The worker running the conversion panicked.
    #[error("conversion worker panicked: {detail}")]
    Panicked { detail: String },
}
