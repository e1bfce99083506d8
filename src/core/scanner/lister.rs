//! Directory listing implementation using walkdir.

use super::{filter::ImageFilter, ImageLister, ListingResult};
use crate::core::partition::ImageListing;
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Configuration for the directory lister
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files
    pub include_hidden: bool,
    /// Maximum directory depth; 1 lists only the directory itself
    pub max_depth: usize,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: false,
            max_depth: 1,
            extensions: None,
        }
    }
}

/// Lister implementation using the walkdir crate
pub struct DirectoryLister {
    config: ScanConfig,
    filter: ImageFilter,
}

impl DirectoryLister {
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ImageFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self { config, filter }
    }

    fn walk_error(error: walkdir::Error) -> ScanError {
        let path = error.path().map(Path::to_path_buf).unwrap_or_default();
        if error.io_error().map(|e| e.kind()) == Some(std::io::ErrorKind::PermissionDenied) {
            ScanError::PermissionDenied { path }
        } else {
            ScanError::ReadDirectory {
                path,
                source: std::io::Error::other(error.to_string()),
            }
        }
    }
}

impl Default for DirectoryLister {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl ImageLister for DirectoryLister {
    fn list_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<ListingResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Started {
            path: root.to_path_buf(),
        }));

        let mut images: Vec<PathBuf> = Vec::new();
        let mut errors = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.config.max_depth.max(1))
            .follow_links(self.config.follow_symlinks);

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() && !entry.path().is_file() {
                        continue;
                    }
                    if !self.filter.should_include(entry.path()) {
                        continue;
                    }

                    events.send(Event::Scan(ScanEvent::ImageFound {
                        path: entry.path().to_path_buf(),
                    }));
                    images.push(entry.into_path());
                }
                Err(e) => {
                    let error = Self::walk_error(e);
                    tracing::warn!(error = %error, "Skipping unreadable entry");

                    let path = match &error {
                        ScanError::PermissionDenied { path }
                        | ScanError::ReadDirectory { path, .. }
                        | ScanError::DirectoryNotFound { path } => path.clone(),
                    };
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    errors.push(error);
                }
            }
        }

        let listing = ImageListing::new(images);
        tracing::debug!(root = %root.display(), images = listing.len(), "Listed directory");
        events.send(Event::Scan(ScanEvent::Completed {
            total_images: listing.len(),
        }));

        Ok(ListingResult { listing, errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn lists_only_images_in_canonical_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "10.jpg");
        touch(dir.path(), "2.png");
        touch(dir.path(), "1.jpg");
        touch(dir.path(), "notes.txt");

        let result = DirectoryLister::default().list(dir.path()).unwrap();
        let names: Vec<_> = result
            .listing
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["1.jpg", "2.png", "10.jpg"]);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn does_not_descend_by_default() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.jpg");
        fs::create_dir(dir.path().join("nested")).unwrap();
        touch(&dir.path().join("nested"), "b.jpg");

        let result = DirectoryLister::default().list(dir.path()).unwrap();
        assert_eq!(result.listing.len(), 1);

        let deep = DirectoryLister::new(ScanConfig {
            max_depth: 2,
            ..ScanConfig::default()
        });
        assert_eq!(deep.list(dir.path()).unwrap().listing.len(), 2);
    }

    #[test]
    fn skips_hidden_files_unless_asked() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.jpg");
        touch(dir.path(), ".b.jpg");

        assert_eq!(DirectoryLister::default().list(dir.path()).unwrap().listing.len(), 1);

        let lister = DirectoryLister::new(ScanConfig {
            include_hidden: true,
            ..ScanConfig::default()
        });
        assert_eq!(lister.list(dir.path()).unwrap().listing.len(), 2);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let result = DirectoryLister::default().list(Path::new("/nonexistent/pics"));
        assert!(matches!(result, Err(ScanError::DirectoryNotFound { .. })));
    }

    #[test]
    fn emits_scan_events() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "b.jpg");

        let (sender, receiver) = crate::events::EventChannel::new();
        DirectoryLister::default()
            .list_with_events(dir.path(), &sender)
            .unwrap();
        drop(sender);

        let events: Vec<_> = receiver.iter().collect();
        let found = events
            .iter()
            .filter(|e| matches!(e, Event::Scan(ScanEvent::ImageFound { .. })))
            .count();
        assert_eq!(found, 2);
        assert!(matches!(
            events.last(),
            Some(Event::Scan(ScanEvent::Completed { total_images: 2 }))
        ));
    }
}
