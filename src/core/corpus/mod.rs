//! # Corpus Module
//!
//! The in-memory view of the image corpus shared by the scanner and the
//! matcher.
//!
//! - [`WorkingSet`] holds every `(path, fingerprint)` digest ready for
//!   comparison. The scanner appends, the resolver prunes.
//! - [`ImageProbe`] resolves the lazily-known attributes of an image
//!   (dimensions and byte size) at the moment a pair is considered.

mod probe;

pub use probe::{DecodingProbe, ImageInfo, ImageProbe};

use crate::core::hasher::Fingerprint;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// An image path and its perceptual fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
}

impl Digest {
    pub fn new(path: impl Into<PathBuf>, fingerprint: Fingerprint) -> Self {
        Self {
            path: path.into(),
            fingerprint,
        }
    }
}

/// Shared, append-mostly set of fingerprinted images.
///
/// Each path appears at most once. Wrap in an `Arc` to share between the
/// scanner thread and the resolution controller.
#[derive(Debug, Default)]
pub struct WorkingSet {
    digests: RwLock<Vec<Digest>>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a working set from existing digests, keeping the first of any
    /// repeated path
    pub fn from_digests(digests: impl IntoIterator<Item = Digest>) -> Self {
        let set = Self::new();
        if let Ok(mut inner) = set.digests.write() {
            for digest in digests {
                if !inner.iter().any(|d| d.path == digest.path) {
                    inner.push(digest);
                }
            }
        }
        set
    }

    /// Add a digest, replacing the fingerprint if the path is already known.
    ///
    /// Returns `true` when the path was new.
    pub fn insert(&self, digest: Digest) -> Result<bool, StoreError> {
        let mut digests = self.write()?;
        match digests.iter_mut().find(|d| d.path == digest.path) {
            Some(existing) => {
                existing.fingerprint = digest.fingerprint;
                Ok(false)
            }
            None => {
                digests.push(digest);
                Ok(true)
            }
        }
    }

    /// Drop a path. Returns `true` if it was present.
    pub fn remove(&self, path: &Path) -> Result<bool, StoreError> {
        let mut digests = self.write()?;
        let before = digests.len();
        digests.retain(|d| d.path != path);
        Ok(digests.len() != before)
    }

    pub fn contains(&self, path: &Path) -> Result<bool, StoreError> {
        Ok(self.read()?.iter().any(|d| d.path == path))
    }

    /// Fingerprint recorded for a path, if any
    pub fn get(&self, path: &Path) -> Result<Option<Fingerprint>, StoreError> {
        Ok(self
            .read()?
            .iter()
            .find(|d| d.path == path)
            .map(|d| d.fingerprint.clone()))
    }

    /// Copy of the current contents, in insertion order
    pub fn snapshot(&self) -> Result<Vec<Digest>, StoreError> {
        Ok(self.read()?.clone())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Digest>>, StoreError> {
        self.digests
            .read()
            .map_err(|_| StoreError::Poisoned { what: "working set" })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Digest>>, StoreError> {
        self.digests
            .write()
            .map_err(|_| StoreError::Poisoned { what: "working set" })
    }
}
