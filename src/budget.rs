//! Frame budget planning.
//!
//! A [`FrameBudget`] is the acceptable range of output frames for a video of
//! a given duration. Longer videos earn larger budgets, up to a hard cap of
//! [`HARD_FRAME_CAP`] frames.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

/// No video ever yields more frames than this.
pub const HARD_FRAME_CAP: u32 = 60;

/// Duration tiers as `(upper bound in seconds, min, max)`.
///
/// A duration belongs to the first tier whose bound it does not reach. The
/// first tier is inclusive of 30 s; every later tier starts at its lower
/// bound.
const TIERS: [(f64, u32, u32); 4] = [
    (60.0, 10, 12),
    (300.0, 12, 20),
    (600.0, 20, 30),
    (f64::INFINITY, 30, HARD_FRAME_CAP),
];

const SHORT_CLIP_SECONDS: f64 = 30.0;
const SHORT_CLIP_FRAMES: u32 = 10;

/// Acceptable output frame-count range, `1 ≤ min ≤ max ≤ 60`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBudget {
    min: u32,
    max: u32,
}

impl FrameBudget {
    /// Plan the budget for a video of the given duration.
    ///
    /// | duration       | budget     |
    /// |----------------|------------|
    /// | ≤ 30 s         | `[10, 10]` |
    /// | 30 s – 60 s    | `[10, 12]` |
    /// | 60 s – 5 min   | `[12, 20]` |
    /// | 5 min – 10 min | `[20, 30]` |
    /// | ≥ 10 min       | `[30, 60]` |
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use framesift::FrameBudget;
    ///
    /// let budget = FrameBudget::for_duration(Duration::from_secs(120));
    /// assert_eq!((budget.min(), budget.max()), (12, 20));
    /// ```
    pub fn for_duration(duration: Duration) -> Self {
        let seconds = duration.as_secs_f64();
        if seconds <= SHORT_CLIP_SECONDS {
            return Self {
                min: SHORT_CLIP_FRAMES,
                max: SHORT_CLIP_FRAMES,
            };
        }

        let (_, min, max) = TIERS
            .iter()
            .copied()
            .find(|&(bound, _, _)| seconds < bound)
            .unwrap_or(TIERS[TIERS.len() - 1]);
        Self { min, max }
    }

    /// Plan the budget, then apply an optional maximum override.
    ///
    /// The override is clamped to `[1, 60]`, replaces `max`, and pulls `min`
    /// down with it when necessary.
    pub fn with_override(self, max_frames: Option<u32>) -> Self {
        match max_frames {
            Some(frames) => {
                let max = frames.clamp(1, HARD_FRAME_CAP);
                Self {
                    min: self.min.min(max),
                    max,
                }
            }
            None => self,
        }
    }

    /// Fewest frames a successful selection should contain.
    pub fn min(&self) -> u32 {
        self.min
    }

    /// Most frames a selection may contain.
    pub fn max(&self) -> u32 {
        self.max
    }
}

impl Display for FrameBudget {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
