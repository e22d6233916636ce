//! Event type definitions for progress and decision reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the curator engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Corpus scanning events
    Scan(ScanEvent),
    /// Similarity search events
    Match(MatchEvent),
    /// Decisions applied to the corpus
    Resolve(ResolveEvent),
    /// File watcher events
    Watcher(WatcherEvent),
}

/// Events from the folder watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WatcherEvent {
    /// Watcher started monitoring a folder
    Started { path: PathBuf },
    /// Watcher stopped monitoring a folder
    Stopped { path: PathBuf },
    /// A new image was detected and forwarded to the scanner
    ImageAdded { path: PathBuf },
    /// An error occurred
    Error { message: String },
}

/// Events during corpus scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { roots: Vec<PathBuf> },
    /// Files were added to the scan queue
    Queued { count: usize },
    /// An image joined the working set
    Fingerprinted { path: PathBuf, cached: bool },
    /// An image could not be fingerprinted and was left out
    Failed { path: PathBuf, message: String },
    /// Progress update
    Progress(ScanProgress),
    /// The queue is drained; the scanner is waiting for notifications
    Idle { working_set: usize },
}

/// Progress information during scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Files taken off the queue so far
    pub processed: usize,
    /// Files still waiting in the queue
    pub remaining: usize,
    /// Fingerprints served from the store
    pub cache_hits: usize,
    /// Size of the working set
    pub working_set: usize,
}

/// Events from the similarity matcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchEvent {
    /// No pair was found, so the threshold was widened
    ThresholdRaised { from: u32, to: u32 },
    /// A pair under the threshold was found
    CandidateFound {
        left: PathBuf,
        right: PathBuf,
        distance: u32,
    },
    /// No pair was found at the current threshold
    Exhausted { threshold: u32 },
}

/// Events from the resolution controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResolveEvent {
    /// A file was moved into quarantine
    Moved {
        from: PathBuf,
        to: PathBuf,
        overwrote: bool,
    },
    /// The file had already disappeared
    Missing { path: PathBuf },
    /// An exact duplicate was removed without asking
    AutoResolved { kept: PathBuf, removed: PathBuf },
    /// An exact duplicate could not be moved and is shown to the user instead
    AutoResolveFailed {
        kept: PathBuf,
        removed: PathBuf,
        message: String,
    },
    /// The pair was recorded as not-a-duplicate
    Skipped { left: PathBuf, right: PathBuf },
}
