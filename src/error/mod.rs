//! # Error Module
//!
//! Error types for the image curator.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - Decode failures and malformed log lines are reported by the caller
//!   that owns the loop; only the top-level operation decides whether to abort

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum CuratorError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Watcher error: {0}")]
    Watcher(#[from] WatcherError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while walking the corpus
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Corpus root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Errors that occur while decoding images or computing fingerprints
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Invalid fingerprint parameters: size {size} is not divisible by downsample {downsample}")]
    InvalidParameters { size: u32, downsample: u32 },

    #[error("Fingerprint length mismatch: {left} vs {right} samples")]
    LengthMismatch { left: usize, right: usize },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Image is empty: {path}")]
    EmptyImage { path: PathBuf },

    #[error("Failed to encode image {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Invalid fingerprint encoding: {0}")]
    Encoding(String),

    #[error("Failed to read image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the persisted fingerprint and skip logs
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open log at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to log at {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Serialize(String),

    #[error("In-memory state at {what} is poisoned by a panicked writer")]
    Poisoned { what: &'static str },
}

/// Errors raised while resolving a candidate pair
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Failed to move {from} to {to}: {source}. The source file was left in place.")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create quarantine directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the folder watcher
#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to initialize watcher: {0}")]
    InitFailed(String),

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Failed to watch {}: {reason}", path.display())]
    WatchFailed { path: PathBuf, reason: String },

    #[error("Failed to unwatch {}: {reason}", path.display())]
    UnwatchFailed { path: PathBuf, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, CuratorError>;
