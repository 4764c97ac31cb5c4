//! Diversity selection.
//!
//! [`select_diverse`] picks frames greedily so that each new frame is as far
//! as possible (in fingerprint space) from everything already chosen. This
//! max–min strategy spreads the selection across visually distinct scenes
//! instead of clustering on whichever scene happens to be sharpest.

use log::debug;

use crate::budget::FrameBudget;
use crate::configuration::SelectionConfig;
use crate::fingerprint::FingerprintedFrame;

/// The frames chosen for output, in timestamp order.
#[derive(Debug, Clone)]
pub struct Selection {
    frames: Vec<FingerprintedFrame>,
    required: u32,
}

impl Selection {
    /// Selected frames, sorted by timestamp.
    pub fn frames(&self) -> &[FingerprintedFrame] {
        &self.frames
    }

    /// Consume the selection, returning the frames.
    pub fn into_frames(self) -> Vec<FingerprintedFrame> {
        self.frames
    }

    /// Number of selected frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The budget minimum this selection was measured against.
    pub fn required(&self) -> u32 {
        self.required
    }

    /// Whether fewer frames than the budget minimum were available.
    pub fn is_reduced_yield(&self) -> bool {
        self.frames.len() < self.required as usize
    }
}

/// Choose a diverse subset of accepted frames within `budget`.
///
/// 1. The sharpest frame seeds the selection (earlier timestamp on ties).
/// 2. Each further pick is the frame whose smallest distance to the current
///    selection is largest; ties go to the sharper, then earlier, frame.
/// 3. Picking stops at `max(budget)`, or once the best remaining distance
///    drops below `min_diversity_distance` with at least `min(budget)`
///    frames chosen.
///
/// When fewer than `min(budget)` frames are supplied, all of them are
/// selected and the result reports reduced yield.
pub fn select_diverse(
    mut frames: Vec<FingerprintedFrame>,
    budget: FrameBudget,
    config: &SelectionConfig,
) -> Selection {
    frames.sort_by_key(|frame| frame.scored.frame.timestamp);
    let min = budget.min() as usize;
    let max = budget.max() as usize;

    if frames.len() < min {
        debug!(
            "Only {} accepted frames for a minimum of {}, keeping all",
            frames.len(),
            min
        );
        return Selection {
            frames,
            required: budget.min(),
        };
    }

    let sharpness = |index: usize| frames[index].scored.metrics.sharpness;

    let mut seed = 0;
    for index in 1..frames.len() {
        if sharpness(index) > sharpness(seed) {
            seed = index;
        }
    }

    let mut chosen = vec![false; frames.len()];
    let mut picked = vec![seed];
    chosen[seed] = true;
    // Smallest distance from each frame to the current selection.
    let mut nearest: Vec<u32> = frames
        .iter()
        .map(|frame| frame.fingerprint.distance(&frames[seed].fingerprint))
        .collect();

    while picked.len() < max {
        let mut best: Option<usize> = None;
        for index in (0..frames.len()).filter(|&index| !chosen[index]) {
            best = match best {
                Some(current)
                    if nearest[index] < nearest[current]
                        || (nearest[index] == nearest[current]
                            && sharpness(index) <= sharpness(current)) =>
                {
                    Some(current)
                }
                _ => Some(index),
            };
        }

        let Some(next) = best else {
            break;
        };
        if nearest[next] < config.min_diversity_distance && picked.len() >= min {
            debug!(
                "Stopping at {} frames: best remaining distance {} is below {}",
                picked.len(),
                nearest[next],
                config.min_diversity_distance
            );
            break;
        }

        chosen[next] = true;
        picked.push(next);
        let added = frames[next].fingerprint;
        for (index, distance) in nearest.iter_mut().enumerate() {
            if !chosen[index] {
                *distance = (*distance).min(frames[index].fingerprint.distance(&added));
            }
        }
    }

    picked.sort_unstable();
    let selected: Vec<FingerprintedFrame> = frames
        .into_iter()
        .enumerate()
        .filter(|(index, _)| picked.binary_search(index).is_ok())
        .map(|(_, frame)| frame)
        .collect();

    Selection {
        frames: selected,
        required: budget.min(),
    }
}
