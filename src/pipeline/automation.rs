//! Automation boundary: the four calls PowerPoint exposes for conversion.
//!
//! The traits mirror the object model of the external application:
//! an [`Automation`] factory launches an [`Application`], which opens a
//! [`Presentation`], which can be saved in another format and closed. A
//! backend only needs to forward these calls; everything else (scoping,
//! cleanup, error containment) lives in [`AppHandle`] and [`DeckHandle`].
//!
//! ## Scoped handles
//!
//! Every live application and presentation is owned by a guard. Releasing a
//! guard explicitly (`close`, `quit`) reports errors to the caller. A guard
//! dropped without an explicit release (an earlier step failed) performs the
//! release itself and swallows the error, so a cleanup failure can never
//! mask the error that caused the early exit, and the application is quit on
//! every path.

use crate::error::ConvertError;
use std::path::Path;
use tracing::debug;

/// `PpSaveAsFileType.ppSaveAsPDF` in PowerPoint's object model.
pub const PP_SAVE_AS_PDF: i32 = 32;

/// Launches one application instance per call.
///
/// Shared between all workers of a batch; each worker calls `launch` for its
/// own task and never shares the returned application.
pub trait Automation: Send + Sync {
    /// Start a dedicated application instance.
    fn launch(&self) -> Result<Box<dyn Application>, ConvertError>;

    /// Short backend name for logs.
    fn name(&self) -> &str {
        "automation"
    }
}

/// A running application instance (`PowerPoint.Application`).
pub trait Application: Send {
    /// `Presentations.Open(path)`.
    fn open(&mut self, path: &Path) -> Result<Box<dyn Presentation>, ConvertError>;

    /// `Application.Quit()`. Must release the instance even if it fails.
    fn quit(&mut self) -> Result<(), ConvertError>;
}

/// An opened document (`Presentation`).
pub trait Presentation: Send {
    /// `Presentation.SaveAs(path, format)`.
    fn save_as(&mut self, path: &Path, format: i32) -> Result<(), ConvertError>;

    /// `Presentation.Close()`.
    fn close(&mut self) -> Result<(), ConvertError>;
}

/// Owns one application instance; quits it when dropped.
pub struct AppHandle {
    app: Option<Box<dyn Application>>,
}

impl AppHandle {
    pub fn launch(automation: &dyn Automation) -> Result<Self, ConvertError> {
        let app = automation.launch()?;
        debug!("{}: application launched", automation.name());
        Ok(Self { app: Some(app) })
    }

    /// Open a presentation owned by this instance.
    pub fn open(&mut self, path: &Path) -> Result<DeckHandle, ConvertError> {
        let app = self.app.as_mut().ok_or_else(|| ConvertError::Host {
            detail: "application already released".to_string(),
        })?;
        let deck = app.open(path)?;
        debug!("Opened {}", path.display());
        Ok(DeckHandle { deck: Some(deck) })
    }

    /// Quit the application, reporting any error.
    pub fn quit(mut self) -> Result<(), ConvertError> {
        match self.app.take() {
            Some(mut app) => app.quit(),
            None => Ok(()),
        }
    }
}

impl Drop for AppHandle {
    fn drop(&mut self) {
        if let Some(mut app) = self.app.take() {
            if let Err(e) = app.quit() {
                debug!("Ignoring quit failure during cleanup: {}", e);
            }
        }
    }
}

/// Owns one opened presentation; closes it when dropped.
pub struct DeckHandle {
    deck: Option<Box<dyn Presentation>>,
}

impl DeckHandle {
    pub fn save_as(&mut self, path: &Path, format: i32) -> Result<(), ConvertError> {
        let deck = self.deck.as_mut().ok_or_else(|| ConvertError::Host {
            detail: "presentation already closed".to_string(),
        })?;
        deck.save_as(path, format)
    }

    /// Close the presentation, reporting any error.
    pub fn close(mut self) -> Result<(), ConvertError> {
        match self.deck.take() {
            Some(mut deck) => deck.close(),
            None => Ok(()),
        }
    }
}

impl Drop for DeckHandle {
    fn drop(&mut self) {
        if let Some(mut deck) = self.deck.take() {
            if let Err(e) = deck.close() {
                debug!("Ignoring close failure during cleanup: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct FakeAutomation {
        log: Log,
        fail_close: bool,
    }

    struct FakeApp {
        log: Log,
        fail_close: bool,
    }

    struct FakeDeck {
        log: Log,
        fail_close: bool,
    }

    impl Automation for FakeAutomation {
        fn launch(&self) -> Result<Box<dyn Application>, ConvertError> {
            self.log.lock().unwrap().push("launch");
            Ok(Box::new(FakeApp {
                log: Arc::clone(&self.log),
                fail_close: self.fail_close,
            }))
        }
    }

    impl Application for FakeApp {
        fn open(&mut self, _path: &Path) -> Result<Box<dyn Presentation>, ConvertError> {
            self.log.lock().unwrap().push("open");
            Ok(Box::new(FakeDeck {
                log: Arc::clone(&self.log),
                fail_close: self.fail_close,
            }))
        }

        fn quit(&mut self) -> Result<(), ConvertError> {
            self.log.lock().unwrap().push("quit");
            Err(ConvertError::Host {
                detail: "already gone".into(),
            })
        }
    }

    impl Presentation for FakeDeck {
        fn save_as(&mut self, _path: &Path, format: i32) -> Result<(), ConvertError> {
            assert_eq!(format, PP_SAVE_AS_PDF);
            self.log.lock().unwrap().push("save_as");
            Ok(())
        }

        fn close(&mut self) -> Result<(), ConvertError> {
            self.log.lock().unwrap().push("close");
            if self.fail_close {
                Err(ConvertError::Close {
                    detail: "busy".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn automation(fail_close: bool) -> (FakeAutomation, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        (
            FakeAutomation {
                log: Arc::clone(&log),
                fail_close,
            },
            log,
        )
    }

    #[test]
    fn pdf_constant_matches_powerpoint() {
        assert_eq!(PP_SAVE_AS_PDF, 32);
    }

    #[test]
    fn dropped_guards_release_in_reverse_order() {
        let (auto, log) = automation(false);
        {
            let mut app = AppHandle::launch(&auto).unwrap();
            let _deck = app.open(Path::new("a.pptx")).unwrap();
        }
        assert_eq!(*log.lock().unwrap(), vec!["launch", "open", "close", "quit"]);
    }

    #[test]
    fn explicit_release_runs_once() {
        let (auto, log) = automation(false);
        let mut app = AppHandle::launch(&auto).unwrap();
        let mut deck = app.open(Path::new("a.pptx")).unwrap();
        deck.save_as(Path::new("a.pdf"), PP_SAVE_AS_PDF).unwrap();
        deck.close().unwrap();
        assert!(app.quit().is_err());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["launch", "open", "save_as", "close", "quit"]
        );
    }

    #[test]
    fn drop_swallows_cleanup_errors() {
        let (auto, log) = automation(true);
        {
            let mut app = AppHandle::launch(&auto).unwrap();
            let _deck = app.open(Path::new("a.pptx")).unwrap();
        }
        assert_eq!(log.lock().unwrap().len(), 4);
    }
}
