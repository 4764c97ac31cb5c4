//! Candidate timestamp sampling.
//!
//! The sampler oversamples the budget: it proposes several evenly spaced
//! timestamps per output frame so later quality and diversity filtering has
//! something to choose from. The first and last [`edge_margin`] of the video
//! are skipped, since intros and outros are often black or static.
//!
//! All arithmetic is done in whole milliseconds, the resolution used in
//! output file names, so two candidates never collapse into the same name.
//!
//! [`edge_margin`]: crate::SelectionConfig::edge_margin

use std::slice::Iter;
use std::time::Duration;

use log::debug;

use crate::budget::FrameBudget;
use crate::configuration::SelectionConfig;

/// Strictly increasing candidate timestamps for one video.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    timestamps: Vec<Duration>,
    min_spacing: Duration,
}

impl CandidateSet {
    /// The candidate timestamps, in ascending order.
    pub fn timestamps(&self) -> &[Duration] {
        &self.timestamps
    }

    /// Spacing that every pair of adjacent candidates honours.
    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Iterate over the timestamps.
    pub fn iter(&self) -> Iter<'_, Duration> {
        self.timestamps.iter()
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Duration;
    type IntoIter = Iter<'a, Duration>;

    fn into_iter(self) -> Self::IntoIter {
        self.timestamps.iter()
    }
}

/// Number of candidates the sampler aims for before spacing is considered.
///
/// `oversampling × max(budget)`, capped at `max_candidates` but never below
/// `max(budget)`.
pub fn target_candidates(budget: FrameBudget, config: &SelectionConfig) -> usize {
    let budget_max = budget.max() as usize;
    let oversampled = budget_max.saturating_mul(config.oversampling as usize);
    oversampled.min(config.max_candidates.max(budget_max))
}

/// Propose evenly spaced candidate timestamps for a video.
///
/// Every returned timestamp lies in `[0, duration)`, adjacent timestamps are
/// at least [`CandidateSet::min_spacing`] apart, and none repeat at
/// millisecond resolution.
///
/// When the preferred spacing (the larger of `min_spacing_fraction × d` and
/// `min_spacing_floor`) cannot fit the target count, fewer candidates are
/// drawn, but never fewer than `max(budget)` unless the fractional spacing
/// itself forbids it.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use framesift::{FrameBudget, SelectionConfig, sample_candidates};
///
/// let duration = Duration::from_secs(120);
/// let budget = FrameBudget::for_duration(duration);
/// let candidates = sample_candidates(duration, budget, &SelectionConfig::default());
///
/// assert_eq!(candidates.len(), 80);
/// assert!(candidates.timestamps().iter().all(|t| *t < duration));
/// ```
pub fn sample_candidates(
    duration: Duration,
    budget: FrameBudget,
    config: &SelectionConfig,
) -> CandidateSet {
    let duration_ms = duration.as_millis() as u64;
    let hard_spacing_ms =
        (duration.as_secs_f64() * 1000.0 * config.min_spacing_fraction).ceil() as u64;
    let min_spacing = Duration::from_millis(hard_spacing_ms);

    if duration_ms == 0 {
        return CandidateSet {
            timestamps: vec![Duration::ZERO],
            min_spacing,
        };
    }

    let margin_ms = (config.edge_margin * duration_ms as f64).round() as u64;
    let start_ms = margin_ms.min(duration_ms - 1);
    let end_ms = duration_ms
        .saturating_sub(margin_ms)
        .min(duration_ms - 1)
        .max(start_ms);
    let span_ms = end_ms - start_ms;

    let preferred_spacing_ms = hard_spacing_ms.max(config.min_spacing_floor.as_millis() as u64);

    let target = target_candidates(budget, config);
    let budget_max = budget.max() as usize;
    let mut count = target.min(points_that_fit(span_ms, preferred_spacing_ms));
    if count < budget_max {
        count = budget_max.min(points_that_fit(span_ms, hard_spacing_ms));
    }
    let count = count.max(1);

    let mut timestamps: Vec<u64> = if count == 1 {
        vec![start_ms + span_ms / 2]
    } else {
        let step_ms = span_ms / (count as u64 - 1);
        (0..count as u64).map(|i| start_ms + i * step_ms).collect()
    };
    timestamps.dedup();

    debug!(
        "Sampled {} candidates over {:?} (target {}, spacing >= {:?})",
        timestamps.len(),
        duration,
        target,
        min_spacing,
    );

    CandidateSet {
        timestamps: timestamps.into_iter().map(Duration::from_millis).collect(),
        min_spacing,
    }
}

fn points_that_fit(span_ms: u64, spacing_ms: u64) -> usize {
    if spacing_ms == 0 {
        return usize::MAX;
    }
    (span_ms / spacing_ms).saturating_add(1) as usize
}
