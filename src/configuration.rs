//! Selection and run configuration.
//!
//! [`SelectionConfig`] holds the tuning thresholds of the selection
//! pipeline. It is immutable once handed to a
//! [`FrameSelector`](crate::FrameSelector) and validated up front.
//!
//! [`RunOptions`] threads progress callbacks, cancellation tokens, and
//! scratch storage settings through a run without polluting every function
//! signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesift::{CancellationToken, ProgressCallback, ProgressInfo, RunOptions, SelectionConfig};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} done", info.operation, info.current);
//!     }
//! }
//!
//! let config = SelectionConfig::default()
//!     .with_oversampling(5)
//!     .with_min_diversity_distance(12);
//! config.validate()?;
//!
//! let token = CancellationToken::new();
//! let options = RunOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone())
//!     .with_batch_size(10);
//! # Ok::<(), framesift::FrameSiftError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::budget::FrameBudget;
use crate::error::FrameSiftError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Tuning thresholds for one selection pipeline.
///
/// All fields have empirical defaults; see [`SelectionConfig::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    /// Candidates sampled per budgeted output frame. Must be at least 3.
    pub oversampling: u32,
    /// Upper bound on the number of candidates per video.
    pub max_candidates: usize,
    /// Fraction of the duration skipped at each end of the video.
    pub edge_margin: f64,
    /// Minimum candidate spacing as a fraction of the duration.
    pub min_spacing_fraction: f64,
    /// Absolute lower bound on candidate spacing.
    pub min_spacing_floor: Duration,
    /// Longest edge, in pixels, of the image used for scoring and hashing.
    pub analysis_max_dimension: u32,
    /// Minimum Laplacian variance for a frame to be accepted.
    pub sharpness_min: f64,
    /// Lower bound of the accepted brightness window (0–1).
    pub brightness_min: f64,
    /// Upper bound of the accepted brightness window (0–1).
    pub brightness_max: f64,
    /// Hamming distance below which further frames are not worth adding.
    pub min_diversity_distance: u32,
    /// Replaces the budget maximum when set. Clamped to `[1, 60]`.
    pub max_frames_override: Option<u32>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            oversampling: 4,
            max_candidates: 200,
            edge_margin: 0.01,
            min_spacing_fraction: 0.004,
            min_spacing_floor: Duration::from_millis(40),
            analysis_max_dimension: 640,
            sharpness_min: 40.0,
            brightness_min: 0.08,
            brightness_max: 0.98,
            min_diversity_distance: 10,
            max_frames_override: None,
        }
    }
}

impl SelectionConfig {
    /// Set the oversampling factor.
    #[must_use]
    pub fn with_oversampling(mut self, factor: u32) -> Self {
        self.oversampling = factor;
        self
    }

    /// Set the candidate cap.
    #[must_use]
    pub fn with_max_candidates(mut self, cap: usize) -> Self {
        self.max_candidates = cap;
        self
    }

    /// Set the fraction of the duration skipped at both ends.
    #[must_use]
    pub fn with_edge_margin(mut self, margin: f64) -> Self {
        self.edge_margin = margin;
        self
    }

    /// Set the minimum candidate spacing as a fraction of the duration.
    #[must_use]
    pub fn with_min_spacing_fraction(mut self, fraction: f64) -> Self {
        self.min_spacing_fraction = fraction;
        self
    }

    /// Set the absolute minimum candidate spacing.
    #[must_use]
    pub fn with_min_spacing_floor(mut self, floor: Duration) -> Self {
        self.min_spacing_floor = floor;
        self
    }

    /// Set the longest edge of the analysis image.
    #[must_use]
    pub fn with_analysis_max_dimension(mut self, pixels: u32) -> Self {
        self.analysis_max_dimension = pixels;
        self
    }

    /// Set the sharpness acceptance threshold.
    #[must_use]
    pub fn with_sharpness_min(mut self, threshold: f64) -> Self {
        self.sharpness_min = threshold;
        self
    }

    /// Set the accepted brightness window.
    #[must_use]
    pub fn with_brightness_window(mut self, min: f64, max: f64) -> Self {
        self.brightness_min = min;
        self.brightness_max = max;
        self
    }

    /// Set the diversity stopping threshold in fingerprint bits.
    #[must_use]
    pub fn with_min_diversity_distance(mut self, bits: u32) -> Self {
        self.min_diversity_distance = bits;
        self
    }

    /// Override the budget maximum.
    ///
    /// The value is clamped to `[1, 60]` when the budget is resolved.
    #[must_use]
    pub fn with_max_frames(mut self, frames: u32) -> Self {
        self.max_frames_override = Some(frames);
        self
    }

    /// Check that every threshold is within its meaningful range.
    ///
    /// # Errors
    ///
    /// Returns [`FrameSiftError::InvalidConfiguration`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), FrameSiftError> {
        let invalid = |message: String| Err(FrameSiftError::InvalidConfiguration(message));

        if self.oversampling < 3 {
            return invalid(format!(
                "oversampling must be at least 3, got {}",
                self.oversampling
            ));
        }
        if self.max_candidates == 0 {
            return invalid("max_candidates must be positive".to_string());
        }
        if !(0.0..0.5).contains(&self.edge_margin) {
            return invalid(format!(
                "edge_margin must be in [0, 0.5), got {}",
                self.edge_margin
            ));
        }
        if !self.min_spacing_fraction.is_finite() || self.min_spacing_fraction < 0.0 {
            return invalid(format!(
                "min_spacing_fraction must be a non-negative number, got {}",
                self.min_spacing_fraction
            ));
        }
        if self.analysis_max_dimension < 16 {
            return invalid(format!(
                "analysis_max_dimension must be at least 16, got {}",
                self.analysis_max_dimension
            ));
        }
        if !self.sharpness_min.is_finite() || self.sharpness_min < 0.0 {
            return invalid(format!(
                "sharpness_min must be a non-negative number, got {}",
                self.sharpness_min
            ));
        }
        if !(0.0..=1.0).contains(&self.brightness_min)
            || !(0.0..=1.0).contains(&self.brightness_max)
            || self.brightness_min > self.brightness_max
        {
            return invalid(format!(
                "brightness window [{}, {}] must be an ordered range within [0, 1]",
                self.brightness_min, self.brightness_max
            ));
        }
        if self.min_diversity_distance > 64 {
            return invalid(format!(
                "min_diversity_distance cannot exceed 64 bits, got {}",
                self.min_diversity_distance
            ));
        }
        Ok(())
    }

    /// The frame budget for a video of `duration`, with any override applied.
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use framesift::SelectionConfig;
    ///
    /// let config = SelectionConfig::default().with_max_frames(15);
    /// let budget = config.budget_for(Duration::from_secs(400));
    /// assert_eq!((budget.min(), budget.max()), (15, 15));
    /// ```
    pub fn budget_for(&self, duration: Duration) -> FrameBudget {
        FrameBudget::for_duration(duration).with_override(self.max_frames_override)
    }
}

/// Operational settings for a pipeline run.
///
/// Carries the progress callback, cancellation token, and scratch storage
/// location. A default-constructed value reports nothing, never cancels,
/// and places scratch directories in the system temp dir.
#[derive(Clone)]
pub struct RunOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) batch_size: u64,
    pub(crate) scratch_root: Option<PathBuf>,
}

impl Debug for RunOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RunOptions")
            .field("has_progress", &true)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("scratch_root", &self.scratch_root)
            .finish()
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RunOptions {
    /// Create options with no progress callback, no cancellation, batch
    /// size 1, and the system temp dir as scratch root.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            scratch_root: None,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled, the run stops at the next check and
    /// returns [`FrameSiftError::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires (every N items).
    ///
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Place per-video scratch directories under `root`.
    #[must_use]
    pub fn with_scratch_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.scratch_root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Whether cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    /// Return [`FrameSiftError::Cancelled`] if cancellation was requested.
    pub(crate) fn check_cancelled(&self) -> Result<(), FrameSiftError> {
        if self.is_cancelled() {
            return Err(FrameSiftError::Cancelled);
        }
        Ok(())
    }
}
