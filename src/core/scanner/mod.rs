//! # Scanner Module
//!
//! Feeds the corpus into the working set.
//!
//! ## How It Works
//! 1. Walk every root once, filter to image extensions, and shuffle the
//!    result so progress is spread evenly over the corpus
//! 2. Take a batch off the queue and fingerprint it on a dedicated rayon
//!    pool: exact content hash first, decode and hash only on a store miss
//! 3. Integrate each finished fingerprint into the shared [`WorkingSet`]
//! 4. Pick up paths announced on the new-image channel between batches
//!
//! Decode failures are logged and the file is left out; nothing in a single
//! file stops the loop. An announced file is often still being written, so
//! one that fails gets a single retry after `poll_interval`.
//!
//! ## Example
//! ```rust,ignore
//! let (notify, notifications) = notification_channel();
//! let mut scanner = CorpusScanner::new(config, store, working_set, notifications, rng)?;
//! let stats = scanner.run_until_idle()?;
//! println!("{} images ready", stats.working_set);
//! ```

mod filter;
mod walker;
mod worker;

pub use filter::{ImageFilter, DEFAULT_EXTENSIONS};
pub use walker::{CorpusWalker, WalkResult};

use crate::core::corpus::WorkingSet;
use crate::core::hasher::{FingerprintParams, PerceptualHasher};
use crate::core::store::FingerprintStore;
use crate::error::{CuratorError, ScanError};
use crate::events::{null_sender, Event, EventSender, ScanEvent, ScanProgress};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// How often the working-set size is logged, in fingerprints
const PROGRESS_LOG_EVERY: usize = 100;

/// Configuration for the corpus scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directories that make up the corpus
    pub roots: Vec<PathBuf>,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Files fingerprinted per batch before checking for notifications
    pub batch_size: usize,
    /// How long an idle scanner waits for a notification before rechecking
    /// the shutdown signal; also the delay before a failed announced file
    /// is retried
    pub poll_interval: Duration,
    /// Worker pool size (0 = one per core)
    pub worker_threads: usize,
    /// Grid parameters for every fingerprint
    pub fingerprint: FingerprintParams,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extensions: None,
            include_hidden: false,
            follow_symlinks: false,
            batch_size: 32,
            poll_interval: Duration::from_millis(500),
            worker_threads: 0,
            fingerprint: FingerprintParams::DEFAULT,
        }
    }
}

impl ScanConfig {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    fn filter(&self) -> ImageFilter {
        let filter = ImageFilter::new().with_hidden(self.include_hidden);
        match &self.extensions {
            Some(extensions) => filter.with_extensions(extensions),
            None => filter,
        }
    }
}

/// Announces newly created images to a running scanner
#[derive(Clone)]
pub struct NewImageSender {
    inner: Sender<PathBuf>,
}

impl NewImageSender {
    /// Queue a path. Dropped silently if the scanner is gone.
    pub fn notify(&self, path: impl Into<PathBuf>) {
        let _ = self.inner.send(path.into());
    }
}

/// The scanner's side of the new-image channel
pub struct NewImageReceiver {
    inner: Receiver<PathBuf>,
}

/// Create the channel external producers use to announce new images
pub fn notification_channel() -> (NewImageSender, NewImageReceiver) {
    let (sender, receiver) = unbounded();
    (
        NewImageSender { inner: sender },
        NewImageReceiver { inner: receiver },
    )
}

/// Cooperative stop flag shared between the scanner thread and its owner
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Running totals for one scanner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Files taken off the queue
    pub processed: usize,
    /// Fingerprints served from the store
    pub cache_hits: usize,
    /// Fingerprints computed from pixels
    pub computed: usize,
    /// Files that could not be fingerprinted
    pub failures: usize,
    /// Working set size after the last batch
    pub working_set: usize,
}

/// Background producer of the working set
pub struct CorpusScanner {
    config: ScanConfig,
    walker: CorpusWalker,
    filter: ImageFilter,
    hasher: PerceptualHasher,
    store: Arc<dyn FingerprintStore>,
    working_set: Arc<WorkingSet>,
    notifications: NewImageReceiver,
    pool: rayon::ThreadPool,
    queue: VecDeque<PathBuf>,
    /// Announced paths that have not had their first attempt yet
    announced: HashSet<PathBuf>,
    /// Announced paths that failed once, with the time they are due again
    retries: Vec<(PathBuf, Instant)>,
    walked: bool,
    rng: StdRng,
    stats: ScanStats,
    events: EventSender,
}

impl CorpusScanner {
    pub fn new(
        config: ScanConfig,
        store: Arc<dyn FingerprintStore>,
        working_set: Arc<WorkingSet>,
        notifications: NewImageReceiver,
        rng: StdRng,
    ) -> Result<Self, ScanError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("fingerprint-{i}"))
            .build()
            .map_err(|e| ScanError::WorkerPool(e.to_string()))?;

        let filter = config.filter();

        Ok(Self {
            walker: CorpusWalker::new(filter.clone(), config.follow_symlinks),
            filter,
            hasher: PerceptualHasher::new(config.fingerprint),
            config,
            store,
            working_set,
            notifications,
            pool,
            queue: VecDeque::new(),
            announced: HashSet::new(),
            retries: Vec::new(),
            walked: false,
            rng,
            stats: ScanStats::default(),
            events: null_sender(),
        })
    }

    /// Report progress through an event channel
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Files waiting to be fingerprinted
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Announced files waiting out their retry delay
    pub fn retrying(&self) -> usize {
        self.retries.len()
    }

    /// Walk the roots (once) and fingerprint everything found, plus anything
    /// announced on the notification channel, then return.
    pub fn run_until_idle(&mut self) -> Result<ScanStats, CuratorError> {
        self.walk_roots();

        loop {
            self.drain_notifications();
            if self.queue.is_empty() {
                break;
            }
            self.process_batch()?;
            thread::yield_now();
        }

        self.events.send(Event::Scan(ScanEvent::Idle {
            working_set: self.stats.working_set,
        }));
        Ok(self.stats)
    }

    /// Scan until `shutdown` is triggered, waiting for notifications once
    /// the walk is exhausted.
    pub fn run(mut self, shutdown: ShutdownSignal) -> Result<ScanStats, CuratorError> {
        info!(roots = ?self.config.roots, "corpus scanner started");

        while !shutdown.is_triggered() {
            self.run_until_idle()?;

            match self.notifications.inner.recv_timeout(self.config.poll_interval) {
                Ok(path) => self.enqueue_notified(path),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => thread::sleep(self.config.poll_interval),
            }
        }

        info!(working_set = self.stats.working_set, "corpus scanner stopped");
        Ok(self.stats)
    }

    /// Move the scanner onto its own thread
    pub fn spawn(
        self,
        shutdown: ShutdownSignal,
    ) -> Result<JoinHandle<Result<ScanStats, CuratorError>>, ScanError> {
        thread::Builder::new()
            .name("corpus-scanner".into())
            .spawn(move || self.run(shutdown))
            .map_err(|e| ScanError::WorkerPool(e.to_string()))
    }

    fn walk_roots(&mut self) {
        if self.walked {
            return;
        }
        self.walked = true;

        self.events.send(Event::Scan(ScanEvent::Started {
            roots: self.config.roots.clone(),
        }));

        let result = self.walker.walk(&self.config.roots, &mut self.rng);
        for error in &result.errors {
            self.events.send(Event::Scan(ScanEvent::Failed {
                path: error_path(error),
                message: error.to_string(),
            }));
        }

        info!(images = result.paths.len(), "corpus walk complete");
        self.events.send(Event::Scan(ScanEvent::Queued {
            count: result.paths.len(),
        }));
        self.queue.extend(result.paths);
    }

    fn drain_notifications(&mut self) {
        loop {
            match self.notifications.inner.try_recv() {
                Ok(path) => self.enqueue_notified(path),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .retries
            .drain(..)
            .partition(|(_, due_at)| *due_at <= now);
        self.retries = waiting;
        for (path, _) in due {
            debug!(path = %path.display(), "retrying announced image");
            self.queue.push_back(path);
        }
    }

    fn enqueue_notified(&mut self, path: PathBuf) {
        if !self.filter.should_include(&path) {
            debug!(path = %path.display(), "ignoring non-image notification");
            return;
        }
        debug!(path = %path.display(), "new image queued");
        // A fresh announcement supersedes a pending retry.
        self.retries.retain(|(waiting, _)| *waiting != path);
        self.announced.insert(path.clone());
        self.queue.push_back(path);
        self.events.send(Event::Scan(ScanEvent::Queued { count: 1 }));
    }

    fn process_batch(&mut self) -> Result<(), CuratorError> {
        let take = self.config.batch_size.max(1).min(self.queue.len());
        let batch: Vec<PathBuf> = self.queue.drain(..take).collect();

        let store = self.store.as_ref();
        let hasher = &self.hasher;
        let results: Vec<_> = self.pool.install(|| {
            batch
                .par_iter()
                .map(|path| (path, worker::fingerprint_file(path, store, hasher)))
                .collect()
        });

        for (path, result) in results {
            self.stats.processed += 1;
            let first_attempt = self.announced.remove(path);
            match result {
                Ok(Some(done)) => {
                    let cached = done.cached;
                    if cached {
                        self.stats.cache_hits += 1;
                    } else {
                        self.stats.computed += 1;
                    }

                    let added = self.working_set.insert(done.digest)?;
                    let size = self.working_set.len()?;
                    if added && size % PROGRESS_LOG_EVERY == 0 {
                        info!(working_set = size, "images ready for matching");
                    }

                    self.events.send(Event::Scan(ScanEvent::Fingerprinted {
                        path: path.clone(),
                        cached,
                    }));
                }
                Ok(None) => {}
                Err(e) if first_attempt => {
                    debug!(path = %path.display(), error = %e, "announced image not readable yet");
                    self.retries
                        .push((path.clone(), Instant::now() + self.config.poll_interval));
                }
                Err(e) => {
                    self.stats.failures += 1;
                    error!(path = %path.display(), error = %e, "could not fingerprint image");
                    self.events.send(Event::Scan(ScanEvent::Failed {
                        path: path.clone(),
                        message: e.to_string(),
                    }));
                }
            }
        }

        self.stats.working_set = self.working_set.len()?;
        self.events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
            processed: self.stats.processed,
            remaining: self.queue.len(),
            cache_hits: self.stats.cache_hits,
            working_set: self.stats.working_set,
        })));
        Ok(())
    }
}

fn error_path(error: &ScanError) -> PathBuf {
    match error {
        ScanError::RootNotFound { path }
        | ScanError::PermissionDenied { path }
        | ScanError::ReadDirectory { path, .. } => path.clone(),
        ScanError::WorkerPool(_) => PathBuf::new(),
    }
}
