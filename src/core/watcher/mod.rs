//! # Folder Watcher Module
//!
//! Watches the corpus roots and announces newly created images to the
//! scanner, so they join the working set without a full re-walk.
//!
//! ## Example
//! ```rust,ignore
//! use image_curator::core::watcher::{FolderWatcher, WatcherConfig};
//!
//! let mut watcher = FolderWatcher::new(WatcherConfig::default(), session.notifier(), events)?;
//! watcher.watch("images/download")?;
//! ```

use crate::core::scanner::{ImageFilter, NewImageSender};
use crate::error::WatcherError;
use crate::events::{Event, EventSender, WatcherEvent};
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Configuration for the folder watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Whether to watch subdirectories recursively
    pub recursive: bool,
    /// Which files count as images
    pub filter: ImageFilter,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            filter: ImageFilter::new(),
        }
    }
}

/// Forwards new image files under watched folders to the scanner
pub struct FolderWatcher {
    watcher: RecommendedWatcher,
    config: WatcherConfig,
    watched_paths: Arc<Mutex<HashSet<PathBuf>>>,
    events: EventSender,
}

impl FolderWatcher {
    pub fn new(
        config: WatcherConfig,
        notifier: NewImageSender,
        events: EventSender,
    ) -> Result<Self, WatcherError> {
        let filter = config.filter.clone();
        let handler_events = events.clone();

        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    for path in Self::new_images(event, &filter) {
                        debug!(path = %path.display(), "new image detected");
                        handler_events.send(Event::Watcher(WatcherEvent::ImageAdded {
                            path: path.clone(),
                        }));
                        notifier.notify(path);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "folder watcher error");
                    handler_events.send(Event::Watcher(WatcherEvent::Error {
                        message: e.to_string(),
                    }));
                }
            }
        })
        .map_err(|e| WatcherError::InitFailed(e.to_string()))?;

        Ok(Self {
            watcher,
            config,
            watched_paths: Arc::new(Mutex::new(HashSet::new())),
            events,
        })
    }

    /// Image paths that a notify event brings into existence or finishes.
    ///
    /// Creations, renames into place and a writer closing the file count;
    /// in-progress edits and removals do not. A creation usually arrives
    /// before any bytes are written, so the close is what lets a download
    /// be fingerprinted complete.
    fn new_images(event: notify::Event, filter: &ImageFilter) -> Vec<PathBuf> {
        let paths = match event.kind {
            EventKind::Create(_) => event.paths,
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => event.paths,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths,
            // Both paths are reported; the destination comes last.
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                event.paths.into_iter().last().into_iter().collect()
            }
            _ => return Vec::new(),
        };

        paths
            .into_iter()
            .filter(|p| filter.should_include(p))
            .collect()
    }

    /// Start watching a directory
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<(), WatcherError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(WatcherError::PathNotFound(path));
        }

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        self.watcher
            .watch(&path, mode)
            .map_err(|e| WatcherError::WatchFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        self.events.send(Event::Watcher(WatcherEvent::Started { path: path.clone() }));
        if let Ok(mut paths) = self.watched_paths.lock() {
            paths.insert(path);
        }

        Ok(())
    }

    /// Stop watching a directory
    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> Result<(), WatcherError> {
        let path = path.as_ref();

        self.watcher
            .unwatch(path)
            .map_err(|e| WatcherError::UnwatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        self.events.send(Event::Watcher(WatcherEvent::Stopped {
            path: path.to_path_buf(),
        }));
        if let Ok(mut paths) = self.watched_paths.lock() {
            paths.remove(path);
        }

        Ok(())
    }

    /// Get list of currently watched paths
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths
            .lock()
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if a path is being watched
    pub fn is_watching(&self, path: impl AsRef<Path>) -> bool {
        self.watched_paths
            .lock()
            .map(|paths| paths.contains(path.as_ref()))
            .unwrap_or(false)
    }
}
