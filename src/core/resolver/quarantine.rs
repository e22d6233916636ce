//! Moving rejected images out of the corpus.

use crate::core::paths;
use crate::error::ResolveError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What happened to a file sent to quarantine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    Moved {
        from: PathBuf,
        to: PathBuf,
        /// A file already at the destination was replaced
        overwrote: bool,
    },
    /// The file was already gone
    Missing { path: PathBuf },
}

/// A directory that mirrors the corpus roots' layout for removed images
#[derive(Debug, Clone)]
pub struct Quarantine {
    roots: Vec<PathBuf>,
    dir: PathBuf,
}

impl Quarantine {
    pub fn new(roots: Vec<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            roots,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `path` lands: its location under the containing root, re-rooted
    /// at the quarantine directory. Files outside every root keep only their
    /// file name.
    pub fn destination_for(&self, path: &Path) -> PathBuf {
        paths::rebase(&self.roots, &self.dir, path).unwrap_or_else(|| {
            let name = path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("unnamed"));
            self.dir.join(name)
        })
    }

    /// Move a file into quarantine.
    ///
    /// A file already at the destination is overwritten with a warning. On
    /// failure the source is left where it was.
    pub fn move_file(&self, path: &Path) -> Result<MoveOutcome, ResolveError> {
        if !path.exists() {
            warn!(path = %path.display(), "image no longer exists");
            return Ok(MoveOutcome::Missing {
                path: path.to_path_buf(),
            });
        }

        let destination = self.destination_for(path);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| ResolveError::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let overwrote = destination.exists();
        if overwrote {
            warn!(destination = %destination.display(), "already exists, overwriting");
        }

        info!(from = %path.display(), to = %destination.display(), "moving image to quarantine");
        if let Err(rename_error) = fs::rename(path, &destination) {
            // Typically a cross-device move; fall back to copy + delete.
            copy_then_remove(path, &destination).map_err(|source| {
                warn!(error = %rename_error, "rename failed before copy fallback");
                ResolveError::MoveFailed {
                    from: path.to_path_buf(),
                    to: destination.clone(),
                    source,
                }
            })?;
        }

        Ok(MoveOutcome::Moved {
            from: path.to_path_buf(),
            to: destination,
            overwrote,
        })
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let expected = fs::metadata(from)?.len();
    let copied = fs::copy(from, to)?;

    if copied != expected {
        let _ = fs::remove_file(to);
        return Err(io::Error::other(format!(
            "copied {copied} of {expected} bytes"
        )));
    }

    if let Err(e) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn destination_keeps_the_subdirectory() {
        let quarantine = Quarantine::new(
            vec![PathBuf::from("images/download"), PathBuf::from("images/pass")],
            "images/trash",
        );

        assert_eq!(
            quarantine.destination_for(Path::new("images/download/reddit/cats/a.jpg")),
            PathBuf::from("images/trash/reddit/cats/a.jpg")
        );
        assert_eq!(
            quarantine.destination_for(Path::new("images/pass/b.jpg")),
            PathBuf::from("images/trash/b.jpg")
        );
    }

    #[test]
    fn destination_outside_roots_uses_the_file_name() {
        let quarantine = Quarantine::new(vec![PathBuf::from("images/pass")], "trash");
        assert_eq!(
            quarantine.destination_for(Path::new("/tmp/elsewhere/x.png")),
            PathBuf::from("trash/x.png")
        );
    }

    #[test]
    fn move_file_relocates_and_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("pass");
        let source = root.join("vk/wall/a.jpg");
        touch(&source, b"pixels");
        let quarantine = Quarantine::new(vec![root], temp_dir.path().join("trash"));

        let outcome = quarantine.move_file(&source).unwrap();

        let expected = temp_dir.path().join("trash/vk/wall/a.jpg");
        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                from: source.clone(),
                to: expected.clone(),
                overwrote: false
            }
        );
        assert!(!source.exists());
        assert_eq!(fs::read(expected).unwrap(), b"pixels");
    }

    #[test]
    fn move_file_overwrites_an_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("pass");
        let source = root.join("a.jpg");
        touch(&source, b"new");
        let existing = temp_dir.path().join("trash/a.jpg");
        touch(&existing, b"old");
        let quarantine = Quarantine::new(vec![root], temp_dir.path().join("trash"));

        let outcome = quarantine.move_file(&source).unwrap();

        assert!(matches!(outcome, MoveOutcome::Moved { overwrote: true, .. }));
        assert_eq!(fs::read(existing).unwrap(), b"new");
    }

    #[test]
    fn missing_source_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let quarantine = Quarantine::new(vec![], temp_dir.path().join("trash"));
        let missing = temp_dir.path().join("gone.jpg");

        let outcome = quarantine.move_file(&missing).unwrap();

        assert_eq!(outcome, MoveOutcome::Missing { path: missing });
    }

    #[test]
    fn copy_fallback_moves_content() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("a.bin");
        let to = temp_dir.path().join("b.bin");
        touch(&from, b"0123456789");

        copy_then_remove(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(to).unwrap(), b"0123456789");
    }
}
