//! Progressive relaxation of the similarity threshold.

use serde::{Deserialize, Serialize};

/// How the similarity threshold starts and how far it may widen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// Starting threshold; pairs must be strictly below it
    pub initial: u32,
    /// Increment applied when a search comes up empty
    pub step: u32,
    /// The threshold never widens past this value
    pub ceiling: u32,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            initial: 50,
            step: 50,
            ceiling: 700,
        }
    }
}

impl ThresholdPolicy {
    /// Same step and ceiling, different starting point
    pub fn starting_at(mut self, initial: u32) -> Self {
        self.initial = initial;
        self
    }
}

/// The live threshold for one session. Widening is never undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    policy: ThresholdPolicy,
    current: u32,
}

impl Threshold {
    pub fn new(policy: ThresholdPolicy) -> Self {
        Self {
            policy,
            current: policy.initial,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    /// True if `distance` is close enough to count as a candidate
    pub fn admits(&self, distance: u32) -> bool {
        distance < self.current
    }

    /// Widen by one step, capped at the ceiling.
    ///
    /// Returns the `(from, to)` change, or `None` when already at the ceiling.
    pub fn widen(&mut self) -> Option<(u32, u32)> {
        if self.current >= self.policy.ceiling {
            return None;
        }
        let from = self.current;
        let to = from.saturating_add(self.policy.step).min(self.policy.ceiling);
        if to == from {
            return None;
        }
        self.current = to;
        Some((from, to))
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::new(ThresholdPolicy::default())
    }
}
