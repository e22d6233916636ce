//! Exact content identity (MD5 of the file bytes).
//!
//! Used only as the fingerprint log key; it is not a security boundary.

use crate::error::FingerprintError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Lowercase hex MD5 digest of a file's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an already-computed digest string, e.g. one read back from a log
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", md5::compute(bytes)))
    }

    /// Stream a file through the digest without holding it in memory
    pub fn of_file(path: &Path) -> Result<Self, FingerprintError> {
        let io_error = |e| FingerprintError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        let file = File::open(path).map_err(io_error)?;
        let mut reader = BufReader::new(file);
        let mut context = md5::Context::new();
        let mut buffer = [0u8; 8192];

        loop {
            let read = reader.read(&mut buffer).map_err(io_error)?;
            if read == 0 {
                break;
            }
            context.consume(&buffer[..read]);
        }

        Ok(Self(format!("{:x}", context.compute())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
