//! Moves duplicate images into a target directory.

use crate::error::MoveError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Outcome of moving a duplicate set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveReport {
    /// Destination of every file that was moved
    pub moved: Vec<PathBuf>,
    /// One message per file that stayed where it was
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Moves files into one directory, never overwriting anything there
pub struct DuplicateMover {
    target: PathBuf,
}

impl DuplicateMover {
    /// Mover into `target`, created if missing
    pub fn new(target: impl Into<PathBuf>) -> Result<Self, MoveError> {
        let target = target.into();

        if target.exists() && !target.is_dir() {
            return Err(MoveError::TargetNotDirectory { path: target });
        }
        fs::create_dir_all(&target).map_err(|e| MoveError::CreateTarget {
            path: target.clone(),
            source: e,
        })?;

        Ok(Self { target })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move each path into the target directory.
    ///
    /// A file that cannot be moved is reported and left in place; the
    /// remaining files are still moved.
    pub fn move_all(&self, paths: &[PathBuf]) -> MoveReport {
        let start = Instant::now();
        let mut report = MoveReport::default();

        for source in paths {
            let Some(name) = source.file_name() else {
                report
                    .errors
                    .push(format!("{}: not a file path", source.display()));
                continue;
            };
            let destination = self.target.join(name);

            match move_file(source, &destination) {
                Ok(()) => {
                    tracing::debug!(
                        from = %source.display(),
                        to = %destination.display(),
                        "Moved duplicate"
                    );
                    report.moved.push(destination);
                }
                Err(e) => {
                    tracing::warn!(path = %source.display(), error = %e, "Could not move duplicate");
                    report.errors.push(format!("{}: {}", source.display(), e));
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }
}

fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if !source.exists() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "source file not found"));
    }
    if destination.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", destination.display()),
        ));
    }

    // rename fails across filesystems, fall back to copy + verify + delete
    fs::rename(source, destination).or_else(|_| {
        let source_size = fs::metadata(source)?.len();
        fs::copy(source, destination)?;

        let dest_size = fs::metadata(destination)?.len();
        if dest_size != source_size {
            let _ = fs::remove_file(destination);
            return Err(io::Error::other(format!(
                "copy verification failed: source {} bytes, dest {} bytes",
                source_size, dest_size
            )));
        }

        fs::remove_file(source)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn moves_files_into_target() {
        let source_dir = TempDir::new().unwrap();
        let target_dir = TempDir::new().unwrap();
        let a = source_dir.path().join("a.jpg");
        let b = source_dir.path().join("b.jpg");
        fs::write(&a, b"first").unwrap();
        fs::write(&b, b"second").unwrap();

        let mover = DuplicateMover::new(target_dir.path().join("similar_images")).unwrap();
        let report = mover.move_all(&[a.clone(), b.clone()]);

        assert_eq!(report.moved.len(), 2);
        assert!(report.errors.is_empty());
        assert!(!a.exists());
        assert_eq!(fs::read(mover.target().join("b.jpg")).unwrap(), b"second");
    }

    #[test]
    fn existing_destination_is_not_overwritten() {
        let source_dir = TempDir::new().unwrap();
        let target_dir = TempDir::new().unwrap();
        let a = source_dir.path().join("a.jpg");
        fs::write(&a, b"new").unwrap();
        fs::write(target_dir.path().join("a.jpg"), b"old").unwrap();

        let mover = DuplicateMover::new(target_dir.path()).unwrap();
        let report = mover.move_all(std::slice::from_ref(&a));

        assert!(report.moved.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert!(a.exists());
        assert_eq!(fs::read(target_dir.path().join("a.jpg")).unwrap(), b"old");
    }

    #[test]
    fn missing_source_is_reported() {
        let target_dir = TempDir::new().unwrap();
        let mover = DuplicateMover::new(target_dir.path()).unwrap();

        let report = mover.move_all(&[PathBuf::from("/nonexistent/file.jpg")]);

        assert!(report.moved.is_empty());
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn file_target_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        fs::write(&file, b"x").unwrap();

        assert!(matches!(
            DuplicateMover::new(&file),
            Err(MoveError::TargetNotDirectory { .. })
        ));
    }
}
