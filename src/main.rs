//! # image-curator CLI
//!
//! Command-line front end for the image curator.
//!
//! ## Usage
//! ```bash
//! image-curator scan images/download images/pass
//! image-curator curate images/download images/pass --quarantine images/trash --watch
//! ```

mod cli;

use image_curator::Result;

fn main() -> Result<()> {
    cli::run()
}
