//! # Session Module
//!
//! Wires one explicitly owned curation context: fingerprint store, skip set,
//! working set, scanner and resolution controller.
//!
//! Every session owns fresh state, so tests can build as many isolated
//! sessions as they like.
//!
//! ## Example
//! ```rust,ignore
//! let mut session = Session::builder()
//!     .roots(vec!["images/download".into(), "images/pass".into()])
//!     .quarantine_dir("images/trash")
//!     .seed(7)
//!     .build()?;
//!
//! session.scan_until_idle()?;
//! if let Some(pair) = session.controller().get_current()? {
//!     println!("{} vs {}", pair.left.path.display(), pair.right.path.display());
//! }
//! ```

use crate::core::corpus::{ImageProbe, WorkingSet};
use crate::core::matcher::{SimilarityMatcher, ThresholdPolicy};
use crate::core::resolver::{Quarantine, ResolutionController};
use crate::core::scanner::{
    notification_channel, CorpusScanner, NewImageSender, ScanConfig, ScanStats, ShutdownSignal,
};
use crate::core::store::{
    FingerprintStore, InMemoryStore, LogStore, SkipSet, FINGERPRINT_LOG, SKIP_LOG,
};
use crate::error::CuratorError;
use crate::events::{null_sender, EventSender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

/// Default directory for the persisted logs
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("image-curator"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Everything needed to start a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Corpus roots; also the bases used to lay out the quarantine
    pub roots: Vec<PathBuf>,
    /// Where `image_hash.txt` and `skipped_image_pairs.txt` live
    pub data_dir: PathBuf,
    /// Where rejected images are moved
    pub quarantine_dir: PathBuf,
    pub scan: ScanConfig,
    pub threshold: ThresholdPolicy,
    /// Fixed seed for repeatable ordering (None = fresh entropy)
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            roots: Vec::new(),
            quarantine_dir: data_dir.join("quarantine"),
            data_dir,
            scan: ScanConfig::default(),
            threshold: ThresholdPolicy::default(),
            seed: None,
        }
    }
}

/// Builder for [`Session`]
pub struct SessionBuilder {
    config: SessionConfig,
    store: Option<Arc<dyn FingerprintStore>>,
    skips: Option<Arc<SkipSet>>,
    probe: Option<Box<dyn ImageProbe>>,
    events: EventSender,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            store: None,
            skips: None,
            probe: None,
            events: null_sender(),
        }
    }

    /// Start from a complete configuration
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.config.roots = roots;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn quarantine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.quarantine_dir = dir.into();
        self
    }

    pub fn scan_config(mut self, scan: ScanConfig) -> Self {
        self.config.scan = scan;
        self
    }

    pub fn threshold(mut self, policy: ThresholdPolicy) -> Self {
        self.config.threshold = policy;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Use a specific fingerprint store instead of the log in the data dir
    pub fn store(mut self, store: Arc<dyn FingerprintStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a specific skip set instead of the log in the data dir
    pub fn skips(mut self, skips: Arc<SkipSet>) -> Self {
        self.skips = Some(skips);
        self
    }

    /// Keep fingerprints and skips in memory only
    pub fn in_memory(self) -> Self {
        self.store(Arc::new(InMemoryStore::new()))
            .skips(Arc::new(SkipSet::in_memory()))
    }

    pub fn probe(mut self, probe: impl ImageProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Open the persisted logs and wire every component
    pub fn build(self) -> Result<Session, CuratorError> {
        let SessionBuilder {
            config,
            store,
            skips,
            probe,
            events,
        } = self;

        if config.roots.is_empty() {
            return Err(CuratorError::Config("no corpus roots configured".into()));
        }

        let store: Arc<dyn FingerprintStore> = match store {
            Some(store) => store,
            None => Arc::new(LogStore::open(&config.data_dir.join(FINGERPRINT_LOG))?),
        };
        let skips = match skips {
            Some(skips) => skips,
            None => Arc::new(SkipSet::open(&config.data_dir.join(SKIP_LOG))?),
        };

        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        info!(seed, "session random seed");

        let working_set = Arc::new(WorkingSet::new());
        let (notifier, notifications) = notification_channel();

        let scan = ScanConfig {
            roots: config.roots.clone(),
            ..config.scan.clone()
        };
        let scanner = CorpusScanner::new(
            scan,
            store.clone(),
            working_set.clone(),
            notifications,
            StdRng::seed_from_u64(seed),
        )?
        .with_events(events.clone());

        let mut matcher = SimilarityMatcher::new(
            working_set.clone(),
            skips.clone(),
            config.threshold,
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        )
        .with_events(events.clone());
        if let Some(probe) = probe {
            matcher = matcher.with_boxed_probe(probe);
        }

        let controller = ResolutionController::new(
            matcher,
            Quarantine::new(config.roots.clone(), &config.quarantine_dir),
            skips.clone(),
            working_set.clone(),
        )
        .with_events(events);

        Ok(Session {
            config,
            store,
            skips,
            working_set,
            scanner: Some(scanner),
            controller,
            notifier,
            shutdown: ShutdownSignal::new(),
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One curation context
pub struct Session {
    config: SessionConfig,
    store: Arc<dyn FingerprintStore>,
    skips: Arc<SkipSet>,
    working_set: Arc<WorkingSet>,
    scanner: Option<CorpusScanner>,
    controller: ResolutionController,
    notifier: NewImageSender,
    shutdown: ShutdownSignal,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn store(&self) -> &Arc<dyn FingerprintStore> {
        &self.store
    }

    pub fn skips(&self) -> &Arc<SkipSet> {
        &self.skips
    }

    pub fn working_set(&self) -> &Arc<WorkingSet> {
        &self.working_set
    }

    pub fn controller(&mut self) -> &mut ResolutionController {
        &mut self.controller
    }

    /// Handle for announcing new images to the scanner
    pub fn notifier(&self) -> NewImageSender {
        self.notifier.clone()
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Fingerprint the corpus in the foreground until nothing is queued.
    ///
    /// Fails if the scanner has already been moved to a background thread.
    pub fn scan_until_idle(&mut self) -> Result<ScanStats, CuratorError> {
        match self.scanner.as_mut() {
            Some(scanner) => scanner.run_until_idle(),
            None => Err(CuratorError::Config(
                "scanner is already running in the background".into(),
            )),
        }
    }

    /// Move the scanner onto its own thread; it runs until [`Session::shutdown`]
    pub fn start_scanner(
        &mut self,
    ) -> Result<JoinHandle<Result<ScanStats, CuratorError>>, CuratorError> {
        let scanner = self.scanner.take().ok_or_else(|| {
            CuratorError::Config("scanner is already running in the background".into())
        })?;
        Ok(scanner.spawn(self.shutdown.clone())?)
    }

    /// Ask the background scanner to stop
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }
}
