//! # Resolver Module
//!
//! Applies the user's decisions to the corpus and keeps exactly one
//! candidate pair outstanding.
//!
//! ## Operations
//! - `get_current` - the outstanding pair, computed on demand
//! - `delete_left` / `delete_right` / `delete_both` - quarantine, then advance
//! - `skip` - remember the pair as not-a-duplicate, then advance
//!
//! Every operation is a no-op on a missing pair or an already-moved file,
//! and every operation ends by pre-fetching the next pair. A resolved pair
//! never stays current, even when that pre-fetch fails.
//!
//! ## Auto-resolution
//! A pair with zero distance and identical dimensions is resolved without
//! asking: the larger file is quarantined (on a size tie, the
//! lexicographically smaller path survives) and the search continues. If
//! that move fails, the pair is presented like any other.

mod quarantine;

pub use quarantine::{MoveOutcome, Quarantine};

use crate::core::corpus::WorkingSet;
use crate::core::matcher::{CandidatePair, Image, SimilarityMatcher};
use crate::core::store::SkipSet;
use crate::error::CuratorError;
use crate::events::{null_sender, Event, EventSender, ResolveEvent};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Which side of the current pair a decision applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Both,
}

/// Owns the current candidate and drives the resolve-then-find-next loop
pub struct ResolutionController {
    matcher: SimilarityMatcher,
    quarantine: Quarantine,
    skips: Arc<SkipSet>,
    working_set: Arc<WorkingSet>,
    current: Option<CandidatePair>,
    events: EventSender,
}

impl ResolutionController {
    pub fn new(
        matcher: SimilarityMatcher,
        quarantine: Quarantine,
        skips: Arc<SkipSet>,
        working_set: Arc<WorkingSet>,
    ) -> Self {
        Self {
            matcher,
            quarantine,
            skips,
            working_set,
            current: None,
            events: null_sender(),
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Current similarity threshold, for display
    pub fn threshold(&self) -> u32 {
        self.matcher.threshold()
    }

    pub fn quarantine(&self) -> &Quarantine {
        &self.quarantine
    }

    /// The outstanding pair, computing a fresh one if there is none or if
    /// one of its files has disappeared.
    pub fn get_current(&mut self) -> Result<Option<CandidatePair>, CuratorError> {
        let stale = match &self.current {
            None => true,
            Some(pair) => {
                let probe = self.matcher.probe();
                !probe.exists(&pair.left.path) || !probe.exists(&pair.right.path)
            }
        };
        if stale {
            let previous = self.current.take();
            self.advance(previous.as_ref())?;
        }
        Ok(self.current.clone())
    }

    pub fn delete_left(&mut self) -> Result<Option<CandidatePair>, CuratorError> {
        self.delete(Side::Left)
    }

    pub fn delete_right(&mut self) -> Result<Option<CandidatePair>, CuratorError> {
        self.delete(Side::Right)
    }

    pub fn delete_both(&mut self) -> Result<Option<CandidatePair>, CuratorError> {
        self.delete(Side::Both)
    }

    /// Quarantine one or both images of the current pair, then advance.
    ///
    /// If a move fails the error is returned and the pair stays current.
    pub fn delete(&mut self, side: Side) -> Result<Option<CandidatePair>, CuratorError> {
        let previous = self.current.take();
        if let Some(pair) = &previous {
            let targets = match side {
                Side::Left => vec![&pair.left],
                Side::Right => vec![&pair.right],
                Side::Both => vec![&pair.left, &pair.right],
            };
            if let Err(e) = targets
                .into_iter()
                .try_for_each(|image| self.remove(&image.path))
            {
                self.current = previous;
                return Err(e);
            }
        }
        self.advance(previous.as_ref())?;
        Ok(self.current.clone())
    }

    /// Record the current pair as skipped in both orderings, then advance
    pub fn skip(&mut self) -> Result<Option<CandidatePair>, CuratorError> {
        let previous = self.current.take();
        if let Some(pair) = &previous {
            if let Err(e) = self.skips.record(&pair.left.path, &pair.right.path) {
                self.current = previous;
                return Err(e.into());
            }
            info!(
                left = %pair.left.path.display(),
                right = %pair.right.path.display(),
                "pair skipped"
            );
            self.events.send(Event::Resolve(ResolveEvent::Skipped {
                left: pair.left.path.clone(),
                right: pair.right.path.clone(),
            }));
        }
        self.advance(previous.as_ref())?;
        Ok(self.current.clone())
    }

    /// Find the pair after `previous`, auto-resolving exact duplicates along
    /// the way. The current slot is empty on entry.
    ///
    /// An exact duplicate whose loser cannot be moved becomes the current
    /// pair so the user can decide it by hand.
    fn advance(&mut self, previous: Option<&CandidatePair>) -> Result<(), CuratorError> {
        let mut next = self.matcher.find_next(previous)?;

        while let Some(pair) = next.take() {
            if !pair.is_exact_duplicate() {
                next = Some(pair);
                break;
            }

            let (kept, removed) = exact_duplicate_loser(&pair);
            let (kept, removed) = (kept.path.clone(), removed.path.clone());
            info!(
                kept = %kept.display(),
                removed = %removed.display(),
                "auto-resolving exact duplicate"
            );

            if let Err(e) = self.remove(&removed) {
                error!(
                    removed = %removed.display(),
                    error = %e,
                    "could not auto-resolve exact duplicate"
                );
                self.events.send(Event::Resolve(ResolveEvent::AutoResolveFailed {
                    kept,
                    removed,
                    message: e.to_string(),
                }));
                next = Some(pair);
                break;
            }
            self.events
                .send(Event::Resolve(ResolveEvent::AutoResolved { kept, removed }));

            // The resolved pair anchors the next search on the survivor.
            next = self.matcher.find_next(Some(&pair))?;
        }

        self.current = next;
        Ok(())
    }

    /// Quarantine a file and drop it from the working set
    fn remove(&mut self, path: &Path) -> Result<(), CuratorError> {
        let event = match self.quarantine.move_file(path)? {
            MoveOutcome::Moved {
                from,
                to,
                overwrote,
            } => ResolveEvent::Moved {
                from,
                to,
                overwrote,
            },
            MoveOutcome::Missing { path } => ResolveEvent::Missing { path },
        };
        self.working_set.remove(path)?;
        self.events.send(Event::Resolve(event));
        Ok(())
    }
}

/// `(kept, removed)` for an exact duplicate pair
fn exact_duplicate_loser(pair: &CandidatePair) -> (&Image, &Image) {
    let (left, right) = (&pair.left, &pair.right);
    let left_loses = match left.size.cmp(&right.size) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => left.path > right.path,
    };
    if left_loses {
        (right, left)
    } else {
        (left, right)
    }
}
