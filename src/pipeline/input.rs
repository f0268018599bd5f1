//! Input resolution: find presentations and pair each with its PDF target.
//!
//! Discovery is deliberately shallow: only the entries directly inside the
//! chosen directory are considered, matched on extension alone. Whether a
//! file really is a presentation is left to PowerPoint; a bad file simply
//! fails to open and becomes a failure outcome.

use crate::error::Ppt2PdfError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions treated as PowerPoint presentations (compared case-insensitively).
pub const PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx", "pptm"];

/// One file to convert: the absolute input path and the PDF written beside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConversionTask {
    input: PathBuf,
    output: PathBuf,
}

impl ConversionTask {
    /// Build a task for `input`.
    ///
    /// Relative paths are resolved against the current directory. The output
    /// keeps the input's directory and stem and swaps the extension for `.pdf`.
    pub fn new(input: impl AsRef<Path>) -> Self {
        let input = input.as_ref();
        let input = std::path::absolute(input).unwrap_or_else(|_| input.to_path_buf());
        let output = input.with_extension("pdf");
        Self { input, output }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Build one task per path, preserving order and duplicates.
pub fn tasks_from_paths<I, P>(paths: I) -> Vec<ConversionTask>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths.into_iter().map(ConversionTask::new).collect()
}

/// Check whether `path` carries a presentation extension.
///
/// PowerPoint owner files (`~$deck.pptx`), written next to a deck that is
/// open in PowerPoint, are rejected: they are never valid presentations.
pub fn is_presentation(path: &Path) -> bool {
    let is_owner_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$"));
    if is_owner_file {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            PRESENTATION_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// List the presentations directly inside `dir`, sorted by path.
///
/// Sub-directories are not descended into.
pub fn discover_presentations(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, Ppt2PdfError> {
    let dir = dir.as_ref();

    if !dir.exists() {
        return Err(Ppt2PdfError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(Ppt2PdfError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let read_err = |source| Ppt2PdfError::ReadDirFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if path.is_file() && is_presentation(&path) {
            found.push(path);
        }
    }
    found.sort();

    debug!("Discovered {} presentations in {}", found.len(), dir.display());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_presentation() {
        assert!(is_presentation(Path::new("deck.ppt")));
        assert!(is_presentation(Path::new("deck.pptx")));
        assert!(is_presentation(Path::new("macro.pptm")));
        assert!(is_presentation(Path::new("LOUD.PPTX")));
        assert!(!is_presentation(Path::new("notes.pdf")));
        assert!(!is_presentation(Path::new("pptx")));
        assert!(!is_presentation(Path::new("~$deck.pptx")));
        assert!(!is_presentation(Path::new("sheet.xlsx")));
    }

    #[test]
    fn task_swaps_extension_and_is_absolute() {
        let t = ConversionTask::new("talks/intro.pptx");
        assert!(t.input().is_absolute());
        assert!(t.output().is_absolute());
        assert_eq!(t.output().extension().unwrap(), "pdf");
        assert_eq!(t.output().file_stem().unwrap(), "intro");
        assert_eq!(t.output().parent(), t.input().parent());
    }

    #[test]
    fn task_is_deterministic() {
        assert_eq!(ConversionTask::new("a.ppt"), ConversionTask::new("a.ppt"));
    }

    #[test]
    fn tasks_keep_order_and_duplicates() {
        let tasks = tasks_from_paths(["b.pptx", "a.pptx", "b.pptx"]);
        assert_eq!(tasks.len(), 3);
        assert!(tasks[0].input().ends_with("b.pptx"));
        assert!(tasks[1].input().ends_with("a.pptx"));
        assert_eq!(tasks[0], tasks[2]);
    }

    #[test]
    fn discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pptx", "a.ppt", "c.PPTM", "notes.txt", "~$b.pptx"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pptx")).unwrap();
        std::fs::write(dir.path().join("nested.pptx").join("deep.pptx"), b"x").unwrap();

        let found = discover_presentations(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.ppt", "b.pptx", "c.PPTM"]);
    }

    #[test]
    fn discover_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_presentations(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn discover_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        assert!(matches!(
            discover_presentations(&missing),
            Err(Ppt2PdfError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn discover_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("deck.pptx");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            discover_presentations(&file),
            Err(Ppt2PdfError::NotADirectory { .. })
        ));
    }
}
