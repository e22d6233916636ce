//! # Image Curator
//!
//! Finds near-duplicate images in an aggregated corpus and lets a human
//! resolve them one pair at a time.
//!
//! ## How It Works
//! - Every image gets a compact perceptual fingerprint, cached by exact
//!   content hash across runs
//! - The matcher surfaces the next pair under a similarity threshold that
//!   widens when nothing is close enough
//! - Decisions move files into a quarantine directory (never deleting them)
//!   or record the pair as skipped for good
//!
//! ## Architecture
//! - `core` - The curation engine
//! - `events` - Event-driven progress reporting
//! - `error` - Typed error hierarchy

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{CuratorError, Result};

/// Initialize tracing for the library
///
/// `RUST_LOG` takes precedence; `default_level` applies when it is unset.
/// Calling this more than once is harmless.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
