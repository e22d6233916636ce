//! # Core Module
//!
//! The front-end agnostic curation engine.
//!
//! ## Modules
//! - `hasher` - Perceptual fingerprints and exact content hashes
//! - `store` - Persisted fingerprint log and skip set
//! - `corpus` - The shared working set and lazy image attributes
//! - `scanner` - Walks the corpus and fingerprints it in the background
//! - `matcher` - Finds the next near-duplicate pair under a widening threshold
//! - `resolver` - Applies decisions and auto-resolves exact duplicates
//! - `session` - Wires one owned context from configuration
//! - `watcher` - Announces new images as they appear on disk

pub mod corpus;
pub mod hasher;
pub mod matcher;
pub mod paths;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod store;
pub mod watcher;

// Re-export commonly used types
pub use corpus::{Digest, ImageInfo, ImageProbe, WorkingSet};
pub use hasher::{Fingerprint, FingerprintParams, PerceptualHasher};
pub use matcher::{CandidatePair, Image, SimilarityMatcher, ThresholdPolicy};
pub use resolver::{ResolutionController, Side};
pub use session::{Session, SessionConfig};
