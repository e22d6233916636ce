//! Fingerprint store trait definition.

use super::StoreStats;
use crate::core::hasher::{ContentHash, Fingerprint};
use crate::error::StoreError;

/// Maps exact content hashes to perceptual fingerprints.
///
/// Entries are never overwritten: recording a hash that is already known
/// is a no-op.
pub trait FingerprintStore: Send + Sync {
    /// Get the fingerprint recorded for this content, if any
    fn lookup(&self, hash: &ContentHash) -> Result<Option<Fingerprint>, StoreError>;

    /// Record a fingerprint for new content.
    ///
    /// Returns `true` if the entry was added, `false` if the hash was
    /// already present.
    fn record(&self, hash: &ContentHash, fingerprint: &Fingerprint) -> Result<bool, StoreError>;

    /// Get store statistics
    fn stats(&self) -> Result<StoreStats, StoreError>;
}
