//! Bearing sequencing
//!
//! A session always opens with STRAIGHT (the control pose), then asks for
//! randomly chosen bearings so a pre-recorded video cannot anticipate them.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use crate::core::AngleBearingEvaluator;
use crate::types::{Bearing, SessionSettings};

/// Finite, randomized sequence of bearings for one session
#[derive(Debug, Clone)]
pub struct BearingSequencer<R = StdRng> {
    candidates: Vec<Bearing>,
    evaluator: AngleBearingEvaluator,
    max_bearings: usize,
    history: Vec<Bearing>,
    rng: R,
}

impl BearingSequencer<StdRng> {
    /// Sequencer seeded from the settings, or from entropy without a seed
    pub fn from_settings(settings: &SessionSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(settings, rng)
    }
}

impl<R: Rng> BearingSequencer<R> {
    pub fn with_rng(settings: &SessionSettings, rng: R) -> Self {
        Self {
            candidates: settings.bearings.clone(),
            evaluator: AngleBearingEvaluator::from_settings(settings),
            max_bearings: settings.max_bearings,
            history: Vec::with_capacity(settings.max_bearings),
            rng,
        }
    }

    /// Bearings issued so far, oldest first
    pub fn history(&self) -> &[Bearing] {
        &self.history
    }

    /// Bearing issued most recently
    pub fn current(&self) -> Option<Bearing> {
        self.history.last().copied()
    }

    /// Bearing issued before the current one
    pub fn previous(&self) -> Option<Bearing> {
        self.history.iter().rev().nth(1).copied()
    }

    pub fn remaining(&self) -> usize {
        self.max_bearings.saturating_sub(self.history.len())
    }
}

impl<R: Rng> Iterator for BearingSequencer<R> {
    type Item = Bearing;

    fn next(&mut self) -> Option<Bearing> {
        if self.history.len() >= self.max_bearings {
            return None;
        }
        let bearing = if self.history.is_empty() {
            Bearing::Straight
        } else {
            next_bearing(&self.history, &self.candidates, &self.evaluator, &mut self.rng)
        };
        self.history.push(bearing);
        Some(bearing)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

/// Pick the bearing to follow `history`
///
/// Two bearings are indistinguishable when their target yaw is equal.
/// Preference order: a bearing that differs from the previous one, whose
/// target yaw differs from the previous target yaw, and that has not been
/// used yet; then the same without the unused filter; then anything other
/// than the previous bearing; then any candidate at all.
pub fn next_bearing<R: Rng + ?Sized>(
    history: &[Bearing],
    candidates: &[Bearing],
    evaluator: &AngleBearingEvaluator,
    rng: &mut R,
) -> Bearing {
    let Some(&previous) = history.last() else {
        return Bearing::Straight;
    };
    let previous_yaw = evaluator.target_angle(previous).yaw;
    let distinct = |b: &&Bearing| {
        **b != previous && evaluator.target_angle(**b).yaw != previous_yaw
    };

    let unused: Vec<Bearing> = candidates
        .iter()
        .filter(distinct)
        .filter(|b| !history.contains(b))
        .copied()
        .collect();
    let distinguishable: Vec<Bearing> = candidates.iter().filter(distinct).copied().collect();
    let not_previous: Vec<Bearing> = candidates.iter().filter(|b| **b != previous).copied().collect();

    [unused, distinguishable, not_previous, candidates.to_vec()]
        .iter()
        .find(|pool| !pool.is_empty())
        .and_then(|pool| pool.choose(rng).copied())
        .unwrap_or(previous)
}
