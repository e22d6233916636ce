//! Per-file fingerprint work, run on the scanner's worker pool.

use crate::core::corpus::Digest;
use crate::core::hasher::{ContentHash, PerceptualHasher};
use crate::core::store::FingerprintStore;
use crate::error::FingerprintError;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// A fingerprint ready to join the working set
#[derive(Debug)]
pub(super) struct Fingerprinted {
    pub digest: Digest,
    /// Served from the store instead of being computed
    pub cached: bool,
}

/// Fingerprint one file, reusing the store when its content is known.
///
/// Returns `Ok(None)` if the file vanished before it could be read.
pub(super) fn fingerprint_file(
    path: &Path,
    store: &dyn FingerprintStore,
    hasher: &PerceptualHasher,
) -> Result<Option<Fingerprinted>, FingerprintError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "image vanished before fingerprinting");
            return Ok(None);
        }
        Err(e) => {
            return Err(FingerprintError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let hash = ContentHash::of_bytes(&bytes);
    let expected = hasher.params().sample_count();

    match store.lookup(&hash) {
        Ok(Some(fingerprint)) if fingerprint.len() == expected => {
            return Ok(Some(Fingerprinted {
                digest: Digest::new(path, fingerprint),
                cached: true,
            }));
        }
        Ok(Some(fingerprint)) => {
            warn!(
                path = %path.display(),
                stored = fingerprint.len(),
                expected,
                "stored fingerprint has the wrong length, recomputing"
            );
        }
        Ok(None) => {}
        Err(e) => warn!(path = %path.display(), error = %e, "fingerprint lookup failed"),
    }

    let fingerprint = hasher.hash_bytes(path, &bytes)?;
    if let Err(e) = store.record(&hash, &fingerprint) {
        warn!(path = %path.display(), error = %e, "could not persist fingerprint");
    }

    Ok(Some(Fingerprinted {
        digest: Digest::new(path, fingerprint),
        cached: false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::InMemoryStore;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, shade: u8) -> std::path::PathBuf {
        let path = dir.join(name);
        RgbImage::from_fn(16, 16, |x, _| Rgb([shade, (x * 8) as u8, 0]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn first_pass_computes_then_store_serves() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_png(temp_dir.path(), "a.png", 100);
        let store = InMemoryStore::new();
        let hasher = PerceptualHasher::default();

        let first = fingerprint_file(&path, &store, &hasher).unwrap().unwrap();
        let second = fingerprint_file(&path, &store, &hasher).unwrap().unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.digest.fingerprint, second.digest.fingerprint);
        assert_eq!(store.stats().unwrap().total_entries, 1);
    }

    #[test]
    fn identical_content_shares_one_entry() {
        let temp_dir = TempDir::new().unwrap();
        let a = write_png(temp_dir.path(), "a.png", 100);
        let b = temp_dir.path().join("copy.png");
        fs::copy(&a, &b).unwrap();
        let store = InMemoryStore::new();
        let hasher = PerceptualHasher::default();

        fingerprint_file(&a, &store, &hasher).unwrap();
        let copy = fingerprint_file(&b, &store, &hasher).unwrap().unwrap();

        assert!(copy.cached);
        assert_eq!(copy.digest.path, b);
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        fs::write(&path, b"not an image at all").unwrap();

        let result = fingerprint_file(&path, &InMemoryStore::new(), &PerceptualHasher::default());

        assert!(matches!(result, Err(FingerprintError::Decode { .. })));
    }

    #[test]
    fn vanished_file_is_skipped() {
        let result = fingerprint_file(
            Path::new("/nonexistent/gone.png"),
            &InMemoryStore::new(),
            &PerceptualHasher::default(),
        );
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn wrong_length_cache_entry_is_recomputed() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_png(temp_dir.path(), "a.png", 100);
        let store = InMemoryStore::new();
        let hash = ContentHash::of_file(&path).unwrap();
        store
            .record(&hash, &crate::core::hasher::Fingerprint::new(vec![1, 2, 3]))
            .unwrap();

        let result = fingerprint_file(&path, &store, &PerceptualHasher::default())
            .unwrap()
            .unwrap();

        assert!(!result.cached);
        assert_eq!(result.digest.fingerprint.len(), 64);
    }
}
