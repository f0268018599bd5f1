//! Pipeline stages for PowerPoint-to-PDF conversion.
//!
//! Each submodule implements exactly one concern of a single file's journey.
//! The batch orchestration on top of them lives in [`crate::convert`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ converter ──▶ automation ──▶ powershell
//! (tasks)    (lifecycle)   (guards)       (COM host)
//! ```
//!
//! 1. [`input`]      — discover presentations and pair each with its PDF path
//! 2. [`converter`]  — run open → save-as-PDF → close → quit for one task and
//!    turn any failure into a failure outcome
//! 3. [`automation`] — the application/presentation traits and the scoped
//!    handles that release them on every exit path
//! 4. [`powershell`] — the default backend, one PowerShell-hosted
//!    `PowerPoint.Application` per launch

pub mod automation;
pub mod converter;
pub mod input;
pub mod powershell;
