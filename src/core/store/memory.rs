//! In-memory fingerprint store for testing.

use super::{FingerprintStore, StoreStats};
use crate::core::hasher::{ContentHash, Fingerprint};
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory fingerprint store
///
/// Useful for tests and one-off runs where persistence isn't needed.
pub struct InMemoryStore {
    entries: RwLock<HashMap<ContentHash, Fingerprint>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintStore for InMemoryStore {
    fn lookup(&self, hash: &ContentHash) -> Result<Option<Fingerprint>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned {
            what: "fingerprint store",
        })?;
        Ok(entries.get(hash).cloned())
    }

    fn record(&self, hash: &ContentHash, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned {
            what: "fingerprint store",
        })?;

        if entries.contains_key(hash) {
            return Ok(false);
        }
        entries.insert(hash.clone(), fingerprint.clone());
        Ok(true)
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned {
            what: "fingerprint store",
        })?;

        Ok(StoreStats {
            total_entries: entries.len(),
            malformed_lines: 0,
        })
    }
}
