//! # Scanner Module
//!
//! Lists the images of the input directory.
//!
//! ## Supported Formats
//! Anything the decoder can open: JPEG, PNG, WebP, GIF, BMP, TIFF.
//!
//! ## Example
//! ```rust,ignore
//! use similar_images::core::scanner::{DirectoryLister, ImageLister, ScanConfig};
//!
//! let lister = DirectoryLister::new(ScanConfig::default());
//! let result = lister.list(Path::new("pics"))?;
//! println!("{} images", result.listing.len());
//! ```

mod filter;
mod lister;

pub use filter::ImageFilter;
pub use lister::{DirectoryLister, ScanConfig};

use crate::core::partition::ImageListing;
use crate::error::ScanError;
use crate::events::EventSender;
use std::path::Path;

/// Result of listing a directory
#[derive(Debug)]
pub struct ListingResult {
    /// Images in canonical pair order
    pub listing: ImageListing,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for image listers
///
/// Implement this trait to feed the pipeline from somewhere other than the
/// file system (e.g., in tests).
pub trait ImageLister: Send + Sync {
    /// List the images under `root`
    fn list(&self, root: &Path) -> Result<ListingResult, ScanError> {
        self.list_with_events(root, &crate::events::null_sender())
    }

    /// List with progress reporting via events
    fn list_with_events(&self, root: &Path, events: &EventSender)
        -> Result<ListingResult, ScanError>;
}
