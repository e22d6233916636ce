//! Line-oriented append-only log file shared by both persisted stores.

use crate::error::StoreError;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One line read back from a log, with its 1-based line number.
///
/// `text` is `None` when the line is not valid UTF-8.
pub(super) struct LogLine {
    pub number: usize,
    pub text: Option<String>,
}

pub(super) struct AppendLog {
    path: PathBuf,
    writer: Mutex<Writer>,
}

struct Writer {
    file: File,
    /// False while the file ends in a record cut short by a crash
    at_line_start: bool,
}

impl AppendLog {
    /// Open (creating if needed) the log and read back its existing lines.
    ///
    /// Blank lines are dropped.
    pub fn open(path: &Path) -> Result<(Self, Vec<LogLine>), StoreError> {
        let open_error = |e| StoreError::Open {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_error)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_error)?;

        let content = fs::read(path).map_err(open_error)?;
        let at_line_start = content.last().map_or(true, |&b| b == b'\n');
        let lines = content
            .split(|&b| b == b'\n')
            .enumerate()
            .filter(|(_, raw)| !raw.iter().all(|b| b.is_ascii_whitespace()))
            .map(|(i, raw)| LogLine {
                number: i + 1,
                text: std::str::from_utf8(raw).ok().map(|s| s.trim().to_string()),
            })
            .collect();

        Ok((
            Self {
                path: path.to_path_buf(),
                writer: Mutex::new(Writer {
                    file,
                    at_line_start,
                }),
            },
            lines,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append lines in one write; each line gets its own trailing newline.
    ///
    /// A truncated last record is terminated first so it cannot swallow the
    /// new one.
    pub fn append(&self, lines: &[String]) -> Result<(), StoreError> {
        let mut writer = self.writer.lock().map_err(|_| StoreError::Poisoned {
            what: "append log",
        })?;

        let mut buffer = String::new();
        if !writer.at_line_start {
            buffer.push('\n');
        }
        for line in lines {
            buffer.push_str(line);
            buffer.push('\n');
        }

        writer
            .file
            .write_all(buffer.as_bytes())
            .and_then(|_| writer.file.flush())
            .map_err(|e| StoreError::Append {
                path: self.path.clone(),
                source: e,
            })?;
        writer.at_line_start = true;
        Ok(())
    }
}
