//! # Store Module
//!
//! Persistent records that outlive a session.
//!
//! ## Logs
//! - `image_hash.txt` - content hash to fingerprint, one `<md5> <base64>` per line
//! - `skipped_image_pairs.txt` - pairs the user kept, as JSON lines
//!
//! Both files are append-only. Malformed lines are logged and skipped on
//! load so a partially written record never blocks startup.

mod append;
mod log;
mod memory;
mod skips;
mod traits;

pub use log::{format_line, parse_line, LogStore};
pub use memory::InMemoryStore;
pub use skips::{SkipSet, SkippedPair};
pub use traits::FingerprintStore;

use serde::{Deserialize, Serialize};

/// Store statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of distinct content hashes known
    pub total_entries: usize,
    /// Lines that failed to parse on load
    pub malformed_lines: usize,
}

/// File name of the fingerprint log inside the data directory
pub const FINGERPRINT_LOG: &str = "image_hash.txt";

/// File name of the skip log inside the data directory
pub const SKIP_LOG: &str = "skipped_image_pairs.txt";
