//! # similar-images CLI
//!
//! Command-line interface for the similar image finder.
//!
//! ## Usage
//! ```bash
//! similar-images scan pics/ --move-to similar_images/
//! similar-images records pics/ --db records.db --workers 8
//! ```

mod cli;

use similar_images::Result;

fn main() -> Result<()> {
    cli::run()
}
