//! Single-file conversion: the open → export → close → quit lifecycle.
//!
//! [`convert_task`] always returns a [`ConversionOutcome`] — never propagates
//! an error upward — so a single bad presentation can't abort the batch.
//! Callers check `outcome.success` to tell the two apart.

use crate::error::ConvertError;
use crate::output::ConversionOutcome;
use crate::pipeline::automation::{AppHandle, Automation, PP_SAVE_AS_PDF};
use crate::pipeline::input::ConversionTask;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert one presentation to PDF with a dedicated application instance.
///
/// Blocks for as long as the external application takes; run it on a
/// blocking thread when called from async code.
pub fn convert_task(automation: &dyn Automation, task: &ConversionTask) -> ConversionOutcome {
    let start = Instant::now();
    debug!("Converting {}", task.input().display());

    let result = run_lifecycle(automation, task);
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => {
            info!(
                "Converted {} -> {} in {}ms",
                task.input().display(),
                task.output().display(),
                duration_ms
            );
            ConversionOutcome::succeeded(task, duration_ms)
        }
        Err(e) => {
            warn!("Failed to convert {}: {}", task.input().display(), e);
            ConversionOutcome::failed(task, e, duration_ms)
        }
    }
}

fn run_lifecycle(automation: &dyn Automation, task: &ConversionTask) -> Result<(), ConvertError> {
    // Declaration order matters: on an early return `deck` drops (closes)
    // before `app` drops (quits).
    let mut app = AppHandle::launch(automation)?;
    let mut deck = app.open(task.input())?;

    deck.save_as(task.output(), PP_SAVE_AS_PDF)?;
    deck.close()?;

    // The PDF is already on disk at this point.
    if let Err(e) = app.quit() {
        warn!(
            "PowerPoint did not quit cleanly after converting {}: {}",
            task.input().display(),
            e
        );
    }
    Ok(())
}
