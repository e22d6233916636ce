//! # Matcher Module
//!
//! Finds the next pair of near-duplicate images for a human to resolve.
//!
//! ## Search Order
//! 1. **Continuity** - if the previous pair still has an image on disk, look
//!    for another partner for that image first, so a cluster of related
//!    duplicates is worked through before jumping elsewhere
//! 2. **Random scan** - every unordered pair of the working set, in shuffled
//!    order
//! 3. **Widening** - if nothing is under the threshold, widen it one step
//!    and scan once more
//!
//! A pair qualifies when it is not in the skip set, its distance is strictly
//! below the threshold, and both images still exist and report valid
//! dimensions. Order is deliberately random; only the seed makes it
//! repeatable.

mod threshold;

pub use threshold::{Threshold, ThresholdPolicy};

use crate::core::corpus::{DecodingProbe, Digest, ImageInfo, ImageProbe, WorkingSet};
use crate::core::store::SkipSet;
use crate::error::CuratorError;
use crate::events::{null_sender, Event, EventSender, MatchEvent};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// An image with its lazily resolved attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// File size in bytes
    pub size: u64,
}

impl Image {
    pub fn new(path: impl Into<PathBuf>, info: ImageInfo) -> Self {
        Self {
            path: path.into(),
            width: info.width,
            height: info.height,
            size: info.size,
        }
    }

    pub fn same_dimensions(&self, other: &Image) -> bool {
        self.width == other.width && self.height == other.height
    }
}

/// Two images presented side by side, with their fingerprint distance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePair {
    pub left: Image,
    pub right: Image,
    pub distance: u32,
}

impl CandidatePair {
    /// Same pair with the sides exchanged
    pub fn swapped(self) -> Self {
        Self {
            left: self.right,
            right: self.left,
            distance: self.distance,
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.left.path == path || self.right.path == path
    }

    /// Zero distance and identical dimensions: safe to resolve unattended
    pub fn is_exact_duplicate(&self) -> bool {
        self.distance == 0 && self.left.same_dimensions(&self.right)
    }
}

/// Searches the working set for candidate pairs
pub struct SimilarityMatcher {
    working_set: Arc<WorkingSet>,
    skips: Arc<SkipSet>,
    probe: Box<dyn ImageProbe>,
    threshold: Threshold,
    rng: StdRng,
    events: EventSender,
}

impl SimilarityMatcher {
    pub fn new(
        working_set: Arc<WorkingSet>,
        skips: Arc<SkipSet>,
        policy: ThresholdPolicy,
        rng: StdRng,
    ) -> Self {
        Self {
            working_set,
            skips,
            probe: Box::new(DecodingProbe),
            threshold: Threshold::new(policy),
            rng,
            events: null_sender(),
        }
    }

    /// Replace how image attributes are resolved
    pub fn with_probe(mut self, probe: impl ImageProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub(crate) fn with_boxed_probe(mut self, probe: Box<dyn ImageProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Current threshold value
    pub fn threshold(&self) -> u32 {
        self.threshold.current()
    }

    pub(crate) fn probe(&self) -> &dyn ImageProbe {
        self.probe.as_ref()
    }

    /// Find the next candidate, preferring partners of whichever image of
    /// `previous` is still on disk.
    ///
    /// Widens the threshold at most once per call. Fails only on a
    /// fingerprint length mismatch or poisoned shared state.
    pub fn find_next(
        &mut self,
        previous: Option<&CandidatePair>,
    ) -> Result<Option<CandidatePair>, CuratorError> {
        let mut digests = self.working_set.snapshot()?;
        digests.shuffle(&mut self.rng);

        if let Some(pair) = self.continue_from(previous, &digests)? {
            return Ok(Some(self.found(pair)));
        }

        let mut widened = false;
        loop {
            if let Some(pair) = self.scan_all(&digests)? {
                return Ok(Some(self.found(pair)));
            }

            if widened {
                break;
            }
            match self.threshold.widen() {
                Some((from, to)) => {
                    info!(from, to, "no similar pair found, widening threshold");
                    self.events
                        .send(Event::Match(MatchEvent::ThresholdRaised { from, to }));
                    widened = true;
                }
                None => break,
            }
        }

        debug!(threshold = self.threshold.current(), "no candidate pair");
        self.events.send(Event::Match(MatchEvent::Exhausted {
            threshold: self.threshold.current(),
        }));
        Ok(None)
    }

    fn found(&self, pair: CandidatePair) -> CandidatePair {
        self.events.send(Event::Match(MatchEvent::CandidateFound {
            left: pair.left.path.clone(),
            right: pair.right.path.clone(),
            distance: pair.distance,
        }));
        pair
    }

    /// Partner search for the surviving image of the previous pair.
    ///
    /// The survivor is presented on the right.
    fn continue_from(
        &self,
        previous: Option<&CandidatePair>,
        digests: &[Digest],
    ) -> Result<Option<CandidatePair>, CuratorError> {
        let Some(previous) = previous else {
            return Ok(None);
        };
        let survivor = [&previous.left, &previous.right]
            .into_iter()
            .find(|image| self.probe.exists(&image.path));
        let Some(survivor) = survivor else {
            return Ok(None);
        };
        let Some(anchor) = digests.iter().find(|d| d.path == survivor.path) else {
            debug!(path = %survivor.path.display(), "surviving image is not in the working set");
            return Ok(None);
        };

        for other in digests.iter().filter(|d| d.path != anchor.path) {
            if let Some(pair) = self.test(anchor, other)? {
                return Ok(Some(pair.swapped()));
            }
        }
        Ok(None)
    }

    fn scan_all(&self, digests: &[Digest]) -> Result<Option<CandidatePair>, CuratorError> {
        for (i, first) in digests.iter().enumerate() {
            for second in &digests[i + 1..] {
                if let Some(pair) = self.test(first, second)? {
                    return Ok(Some(pair));
                }
            }
        }
        Ok(None)
    }

    fn test(&self, a: &Digest, b: &Digest) -> Result<Option<CandidatePair>, CuratorError> {
        let distance = a.fingerprint.distance(&b.fingerprint)?;
        if !self.threshold.admits(distance) {
            return Ok(None);
        }
        if self.skips.contains(&a.path, &b.path)? {
            return Ok(None);
        }
        if !self.probe.exists(&a.path) || !self.probe.exists(&b.path) {
            return Ok(None);
        }

        let (Some(left), Some(right)) = (self.probe.probe(&a.path), self.probe.probe(&b.path))
        else {
            return Ok(None);
        };

        Ok(Some(CandidatePair {
            left: Image::new(&a.path, left),
            right: Image::new(&b.path, right),
            distance,
        }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::hasher::Fingerprint;
    use crate::error::FingerprintError;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// Probe backed by a table; paths not in the table do not exist
    #[derive(Default, Clone)]
    pub(crate) struct TableProbe {
        infos: Arc<RwLock<HashMap<PathBuf, ImageInfo>>>,
    }

    impl TableProbe {
        pub(crate) fn insert(&self, path: &str, width: u32, height: u32, size: u64) {
            self.infos.write().unwrap().insert(
                PathBuf::from(path),
                ImageInfo {
                    width,
                    height,
                    size,
                },
            );
        }

        pub(crate) fn forget(&self, path: &Path) {
            self.infos.write().unwrap().remove(path);
        }
    }

    impl ImageProbe for TableProbe {
        fn probe(&self, path: &Path) -> Option<ImageInfo> {
            self.infos.read().unwrap().get(path).copied()
        }

        fn exists(&self, path: &Path) -> bool {
            self.infos.read().unwrap().contains_key(path)
        }
    }

    /// A 64-sample fingerprint with `delta` added to its first few samples
    pub(crate) fn fingerprint(base: u8, delta: u8) -> Fingerprint {
        let mut samples: Vec<u8> = (0..64).map(|i| base.wrapping_add(i as u8 * 3)).collect();
        samples[0] = samples[0].saturating_add(delta);
        Fingerprint::new(samples)
    }

    fn matcher(digests: Vec<Digest>, probe: TableProbe, seed: u64) -> SimilarityMatcher {
        SimilarityMatcher::new(
            Arc::new(WorkingSet::from_digests(digests)),
            Arc::new(SkipSet::in_memory()),
            ThresholdPolicy::default(),
            StdRng::seed_from_u64(seed),
        )
        .with_probe(probe)
    }

    fn corpus() -> (Vec<Digest>, TableProbe) {
        let probe = TableProbe::default();
        probe.insert("a.jpg", 500, 500, 1000);
        probe.insert("b.jpg", 500, 500, 1200);
        probe.insert("c.jpg", 300, 200, 800);
        let digests = vec![
            Digest::new("a.jpg", fingerprint(10, 0)),
            Digest::new("b.jpg", fingerprint(10, 3)),
            Digest::new("c.jpg", fingerprint(200, 0)),
        ];
        (digests, probe)
    }

    fn pair_paths(pair: &CandidatePair) -> [PathBuf; 2] {
        let mut paths = [pair.left.path.clone(), pair.right.path.clone()];
        paths.sort();
        paths
    }

    #[test]
    fn finds_the_close_pair_for_any_seed() {
        for seed in 0..10 {
            let (digests, probe) = corpus();
            let mut matcher = matcher(digests, probe, seed);

            let pair = matcher.find_next(None).unwrap().unwrap();

            assert_eq!(pair.distance, 3);
            assert_eq!(pair_paths(&pair), [PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);
        }
    }

    #[test]
    fn skipped_pair_is_never_returned() {
        let (digests, probe) = corpus();
        let mut matcher = matcher(digests, probe, 1);
        matcher
            .skips
            .record(Path::new("b.jpg"), Path::new("a.jpg"))
            .unwrap();

        let next = matcher.find_next(None).unwrap();

        assert!(next.is_none());
        assert_eq!(matcher.threshold(), 100);
    }

    #[test]
    fn widening_happens_once_per_call_and_is_kept() {
        let probe = TableProbe::default();
        probe.insert("a.jpg", 10, 10, 1);
        probe.insert("b.jpg", 10, 10, 1);
        let mut matcher = matcher(
            vec![
                Digest::new("a.jpg", fingerprint(10, 0)),
                Digest::new("b.jpg", fingerprint(10, 120)),
            ],
            probe,
            3,
        );

        // 50 -> 100 is not enough for a distance of 120
        assert!(matcher.find_next(None).unwrap().is_none());
        assert_eq!(matcher.threshold(), 100);

        let pair = matcher.find_next(None).unwrap().unwrap();
        assert_eq!(pair.distance, 120);
        assert_eq!(matcher.threshold(), 150);

        // The widened threshold is kept once a pair is found
        assert!(matcher.find_next(None).unwrap().is_some());
        assert_eq!(matcher.threshold(), 150);
    }

    #[test]
    fn missing_or_unreadable_images_are_passed_over() {
        let (digests, probe) = corpus();
        probe.forget(Path::new("b.jpg"));
        let mut matcher = matcher(digests, probe, 5);

        assert!(matcher.find_next(None).unwrap().is_none());
    }

    #[test]
    fn continuity_keeps_the_survivor_on_the_right() {
        let probe = TableProbe::default();
        for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
            probe.insert(name, 100, 100, 10);
        }
        let digests = vec![
            Digest::new("a.jpg", fingerprint(10, 0)),
            Digest::new("b.jpg", fingerprint(10, 5)),
            Digest::new("c.jpg", fingerprint(10, 9)),
            Digest::new("d.jpg", fingerprint(10, 20)),
        ];

        for seed in 0..10 {
            let mut matcher = matcher(digests.clone(), probe.clone(), seed);
            let previous = CandidatePair {
                left: Image::new("gone.jpg", ImageInfo { width: 1, height: 1, size: 1 }),
                right: Image::new("c.jpg", ImageInfo { width: 100, height: 100, size: 10 }),
                distance: 1,
            };

            let pair = matcher.find_next(Some(&previous)).unwrap().unwrap();

            assert_eq!(pair.right.path, PathBuf::from("c.jpg"));
            assert_ne!(pair.left.path, PathBuf::from("c.jpg"));
        }
    }

    #[test]
    fn continuity_prefers_the_left_survivor() {
        let probe = TableProbe::default();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            probe.insert(name, 100, 100, 10);
        }
        let digests = vec![
            Digest::new("a.jpg", fingerprint(10, 0)),
            Digest::new("b.jpg", fingerprint(10, 4)),
            Digest::new("c.jpg", fingerprint(10, 8)),
        ];
        let mut matcher = matcher(digests, probe, 11);
        let info = ImageInfo { width: 100, height: 100, size: 10 };
        let previous = CandidatePair {
            left: Image::new("a.jpg", info),
            right: Image::new("b.jpg", info),
            distance: 4,
        };
        matcher
            .skips
            .record(Path::new("a.jpg"), Path::new("b.jpg"))
            .unwrap();

        let pair = matcher.find_next(Some(&previous)).unwrap().unwrap();

        assert_eq!(pair.right.path, PathBuf::from("a.jpg"));
        assert_eq!(pair.left.path, PathBuf::from("c.jpg"));
    }

    #[test]
    fn length_mismatch_fails_loudly() {
        let probe = TableProbe::default();
        probe.insert("a.jpg", 10, 10, 1);
        probe.insert("b.jpg", 10, 10, 1);
        let mut matcher = matcher(
            vec![
                Digest::new("a.jpg", Fingerprint::new(vec![0; 64])),
                Digest::new("b.jpg", Fingerprint::new(vec![0; 16])),
            ],
            probe,
            1,
        );

        let result = matcher.find_next(None);

        assert!(matches!(
            result,
            Err(CuratorError::Fingerprint(FingerprintError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn exact_duplicate_needs_matching_dimensions() {
        let pair = |w| CandidatePair {
            left: Image::new("a", ImageInfo { width: 10, height: 10, size: 1 }),
            right: Image::new("b", ImageInfo { width: w, height: 10, size: 2 }),
            distance: 0,
        };
        assert!(pair(10).is_exact_duplicate());
        assert!(!pair(11).is_exact_duplicate());
    }
}
