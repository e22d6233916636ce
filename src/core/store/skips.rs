//! Persisted record of pairs the user chose to keep both of.
//!
//! Stored as JSON lines, one `{"path1": .., "path2": ..}` object per line.
//! Every skip is written in both orderings so a lookup in either direction
//! hits.

use super::append::AppendLog;
use crate::core::paths;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, warn};

/// One ordered skip record as it appears in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPair {
    pub path1: String,
    pub path2: String,
}

impl SkippedPair {
    pub fn new(a: &Path, b: &Path) -> Self {
        Self {
            path1: paths::key(a),
            path2: paths::key(b),
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            path1: self.path2.clone(),
            path2: self.path1.clone(),
        }
    }
}

/// Symmetric set of skipped path pairs, optionally backed by a log file
pub struct SkipSet {
    log: Option<AppendLog>,
    pairs: RwLock<HashSet<(String, String)>>,
}

impl SkipSet {
    /// A skip set that lives only for this process
    pub fn in_memory() -> Self {
        Self {
            log: None,
            pairs: RwLock::new(HashSet::new()),
        }
    }

    /// Open or create the skip log and load every well-formed record
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let (log, lines) = AppendLog::open(path)?;
        let mut pairs = HashSet::new();

        for line in lines {
            let parsed = line
                .text
                .as_deref()
                .and_then(|text| serde_json::from_str::<SkippedPair>(text).ok());

            match parsed {
                Some(pair) => {
                    // Older logs may only hold one ordering.
                    pairs.insert((pair.path2.clone(), pair.path1.clone()));
                    pairs.insert((pair.path1, pair.path2));
                }
                None => {
                    warn!(
                        path = %path.display(),
                        line = line.number,
                        "skipping malformed skip record"
                    );
                }
            }
        }

        debug!(path = %path.display(), pairs = pairs.len(), "skip log loaded");

        Ok(Self {
            log: Some(log),
            pairs: RwLock::new(pairs),
        })
    }

    /// True if the user has already kept this pair, in either order
    pub fn contains(&self, a: &Path, b: &Path) -> Result<bool, StoreError> {
        let pairs = self
            .pairs
            .read()
            .map_err(|_| StoreError::Poisoned { what: "skip set" })?;
        let (a, b) = (paths::key(a), paths::key(b));
        Ok(pairs.contains(&(a.clone(), b.clone())) || pairs.contains(&(b, a)))
    }

    /// Record a skip in both orderings
    pub fn record(&self, a: &Path, b: &Path) -> Result<(), StoreError> {
        let mut pairs = self
            .pairs
            .write()
            .map_err(|_| StoreError::Poisoned { what: "skip set" })?;

        let forward = SkippedPair::new(a, b);
        let backward = forward.reversed();

        if let Some(log) = &self.log {
            let lines = [&forward, &backward]
                .iter()
                .map(|pair| serde_json::to_string(pair))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StoreError::Serialize(e.to_string()))?;
            log.append(&lines)?;
        }

        pairs.insert((forward.path1, forward.path2));
        pairs.insert((backward.path1, backward.path2));
        Ok(())
    }

    /// Number of distinct ordered pairs held
    pub fn len(&self) -> Result<usize, StoreError> {
        let pairs = self
            .pairs
            .read()
            .map_err(|_| StoreError::Poisoned { what: "skip set" })?;
        Ok(pairs.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn skip_is_symmetric() {
        let skips = SkipSet::in_memory();
        skips.record(Path::new("a.jpg"), Path::new("b.jpg")).unwrap();

        assert!(skips.contains(Path::new("a.jpg"), Path::new("b.jpg")).unwrap());
        assert!(skips.contains(Path::new("b.jpg"), Path::new("a.jpg")).unwrap());
        assert!(!skips.contains(Path::new("a.jpg"), Path::new("c.jpg")).unwrap());
    }

    #[test]
    fn lookups_normalize_paths() {
        let skips = SkipSet::in_memory();
        skips
            .record(Path::new("images/./pass/a.jpg"), Path::new("images/x/../b.jpg"))
            .unwrap();

        assert!(skips
            .contains(Path::new("images/b.jpg"), Path::new("images/pass/a.jpg"))
            .unwrap());
    }

    #[test]
    fn record_writes_both_orderings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("skipped_image_pairs.txt");

        let skips = SkipSet::open(&path).unwrap();
        skips.record(Path::new("a.jpg"), Path::new("b.jpg")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let records: Vec<SkippedPair> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(
            records,
            vec![
                SkippedPair {
                    path1: "a.jpg".into(),
                    path2: "b.jpg".into()
                },
                SkippedPair {
                    path1: "b.jpg".into(),
                    path2: "a.jpg".into()
                },
            ]
        );
    }

    #[test]
    fn skips_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("skipped_image_pairs.txt");

        {
            let skips = SkipSet::open(&path).unwrap();
            skips.record(Path::new("a.jpg"), Path::new("b.jpg")).unwrap();
        }

        let reopened = SkipSet::open(&path).unwrap();
        assert!(reopened.contains(Path::new("b.jpg"), Path::new("a.jpg")).unwrap());
    }

    #[test]
    fn one_sided_and_malformed_records_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("skipped_image_pairs.txt");
        fs::write(
            &path,
            "{\"path1\": \"a.jpg\", \"path2\": \"b.jpg\"}\nnot json\n{\"path1\": \"x\"}\n",
        )
        .unwrap();

        let skips = SkipSet::open(&path).unwrap();

        assert!(skips.contains(Path::new("b.jpg"), Path::new("a.jpg")).unwrap());
        assert_eq!(skips.len().unwrap(), 2);
    }
}
