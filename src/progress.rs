//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring a pipeline run,
//! [`CancellationToken`] for cooperative cancellation, and [`ProgressInfo`]
//! for progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesift::{
//!     FfmpegCli, FrameSelector, ProgressCallback, ProgressInfo, RunOptions, SelectionConfig,
//!     VideoJob,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! let selector = FrameSelector::new(FfmpegCli::new(), SelectionConfig::default())?;
//! let options = RunOptions::new().with_progress(Arc::new(PrintProgress));
//! let report = selector.run(&VideoJob::new("input.mp4"), "frames", &options);
//! # Ok::<(), framesift::FrameSiftError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use std::time::{Duration, Instant};

/// The pipeline stage currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Probing the video duration.
    Probing,
    /// Decoding candidate frames.
    Extraction,
    /// Computing sharpness and brightness.
    Scoring,
    /// Fingerprinting and diversity selection.
    Selection,
    /// Writing the selected frames.
    Writing,
    /// Processing a batch of videos (one item per video).
    Batch,
}

/// A snapshot of pipeline progress.
///
/// Delivered to [`ProgressCallback::on_progress`] at a cadence controlled
/// by [`RunOptions::with_batch_size`](crate::RunOptions::with_batch_size).
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items have been processed so far.
    pub current: u64,
    /// Total items expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the stage started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// The candidate timestamp that was just processed, if any.
    pub current_timestamp: Option<Duration>,
}

/// Trait for receiving progress updates during a run.
///
/// Implementations must be [`Send`] and [`Sync`] because extraction reports
/// from rayon worker threads.
///
/// Progress callbacks are **infallible**: they observe but cannot halt the
/// run. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during a stage.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to abort the
/// associated runs. Scratch files of an aborted run are still removed.
///
/// # Example
///
/// ```
/// use framesift::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks progress timing for one stage and emits callbacks.
///
/// Shared by reference between worker threads, so the counters are atomic.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: AtomicU64,
    batch_size: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: AtomicU64::new(0),
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
        }
    }

    /// Record one completed item and fire the callback every `batch_size`
    /// items.
    pub(crate) fn advance(&self, timestamp: Option<Duration>) {
        let current = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        if current % self.batch_size == 0 {
            self.report(current, timestamp);
        }
    }

    /// Unconditionally emit a final progress report.
    pub(crate) fn finish(&self) {
        self.report(self.current.load(Ordering::Acquire), None);
    }

    fn report(&self, current: u64, timestamp: Option<Duration>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (current as f32 / t as f32) * 100.0);

        let estimated_remaining = if current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(current);
                let per_item = elapsed / current as u32;
                per_item * remaining as u32
            })
        } else {
            None
        };

        let info = ProgressInfo {
            operation: self.operation,
            current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_timestamp: timestamp,
        };

        self.callback.on_progress(&info);
    }
}
