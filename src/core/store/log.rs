//! Append-only text log backend for persistent fingerprints.
//!
//! One entry per line: `<md5-hex> <base64 fingerprint bytes>`.

use super::append::AppendLog;
use super::{FingerprintStore, StoreStats};
use crate::core::hasher::{ContentHash, Fingerprint};
use crate::error::StoreError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Fingerprint store persisted as an append-only log
pub struct LogStore {
    log: AppendLog,
    entries: RwLock<HashMap<ContentHash, Fingerprint>>,
    malformed_lines: usize,
}

impl LogStore {
    /// Open or create the log and load every well-formed entry.
    ///
    /// Malformed lines are logged and skipped. When a hash appears more
    /// than once, the first entry wins.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let (log, lines) = AppendLog::open(path)?;
        let mut entries = HashMap::new();
        let mut malformed_lines = 0;

        for line in lines {
            match line.text.as_deref().and_then(parse_line) {
                Some((hash, fingerprint)) => {
                    entries.entry(hash).or_insert(fingerprint);
                }
                None => {
                    malformed_lines += 1;
                    warn!(
                        path = %path.display(),
                        line = line.number,
                        "skipping malformed fingerprint record"
                    );
                }
            }
        }

        debug!(
            path = %path.display(),
            entries = entries.len(),
            "fingerprint log loaded"
        );

        Ok(Self {
            log,
            entries: RwLock::new(entries),
            malformed_lines,
        })
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }
}

/// Parse one `<hash> <base64>` record
pub fn parse_line(line: &str) -> Option<(ContentHash, Fingerprint)> {
    let (hash, encoded) = line.trim().split_once(' ')?;
    if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let fingerprint = Fingerprint::from_base64(encoded).ok()?;
    if fingerprint.is_empty() {
        return None;
    }
    Some((ContentHash::from_hex(hash), fingerprint))
}

/// Render one record, without the trailing newline
pub fn format_line(hash: &ContentHash, fingerprint: &Fingerprint) -> String {
    format!("{} {}", hash, fingerprint.to_base64())
}

impl FingerprintStore for LogStore {
    fn lookup(&self, hash: &ContentHash) -> Result<Option<Fingerprint>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned {
            what: "fingerprint store",
        })?;
        Ok(entries.get(hash).cloned())
    }

    fn record(&self, hash: &ContentHash, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        // Held across the append so two writers cannot log the same hash twice.
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned {
            what: "fingerprint store",
        })?;

        if entries.contains_key(hash) {
            return Ok(false);
        }

        self.log.append(&[format_line(hash, fingerprint)])?;
        entries.insert(hash.clone(), fingerprint.clone());
        Ok(true)
    }

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned {
            what: "fingerprint store",
        })?;

        Ok(StoreStats {
            total_entries: entries.len(),
            malformed_lines: self.malformed_lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample_fingerprint(seed: u8) -> Fingerprint {
        Fingerprint::new((0..64).map(|i| seed.wrapping_mul(i as u8)).collect())
    }

    #[test]
    fn log_store_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("image_hash.txt");

        let store = LogStore::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(store.stats().unwrap().total_entries, 0);
    }

    #[test]
    fn recorded_fingerprint_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("image_hash.txt");
        let hash = ContentHash::of_bytes(b"cat picture");
        let fingerprint = sample_fingerprint(7);

        {
            let store = LogStore::open(&path).unwrap();
            assert!(store.record(&hash, &fingerprint).unwrap());
        }

        let reopened = LogStore::open(&path).unwrap();
        assert_eq!(reopened.lookup(&hash).unwrap(), Some(fingerprint));
    }

    #[test]
    fn duplicate_record_is_not_appended() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("image_hash.txt");
        let hash = ContentHash::of_bytes(b"cat picture");

        let store = LogStore::open(&path).unwrap();
        store.record(&hash, &sample_fingerprint(3)).unwrap();
        assert!(!store.record(&hash, &sample_fingerprint(5)).unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("image_hash.txt");
        let good = format_line(&ContentHash::of_bytes(b"a"), &sample_fingerprint(1));
        fs::write(
            &path,
            format!("{}\nno-separator\nabc !!!notbase64\n\n", good),
        )
        .unwrap();

        let store = LogStore::open(&path).unwrap();
        let stats = store.stats().unwrap();

        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.malformed_lines, 2);
    }

    #[test]
    fn record_after_a_torn_last_line_reloads_intact() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("image_hash.txt");
        fs::write(&path, "d41d8cd98f00b204e9800998ecf8427e AAE").unwrap();
        let hash = ContentHash::of_bytes(b"cat picture");
        let fingerprint = sample_fingerprint(7);

        LogStore::open(&path)
            .unwrap()
            .record(&hash, &fingerprint)
            .unwrap();

        let reopened = LogStore::open(&path).unwrap();
        assert_eq!(reopened.lookup(&hash).unwrap(), Some(fingerprint));
        assert_eq!(reopened.stats().unwrap().malformed_lines, 1);
    }

    #[test]
    fn records_use_the_hash_space_base64_format() {
        let line = format_line(&ContentHash::from_hex("d41d8cd98f00b204e9800998ecf8427e"), &Fingerprint::new(vec![0, 1, 2]));
        assert_eq!(line, "d41d8cd98f00b204e9800998ecf8427e AAEC");
        let (hash, fp) = parse_line(&line).unwrap();
        assert_eq!(hash.as_str(), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(fp.as_bytes(), &[0, 1, 2]);
    }
}
