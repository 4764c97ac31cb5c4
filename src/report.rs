//! Jobs, warnings, and per-video reports.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::budget::FrameBudget;
use crate::error::FrameSiftError;

/// A video to process: a local path plus the name its frames are filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    /// Local path of the video file.
    pub path: PathBuf,
    /// Logical name, used for the output directory.
    pub name: String,
}

impl VideoJob {
    /// Create a job named after the file stem of `path`.
    ///
    /// ```
    /// use framesift::VideoJob;
    ///
    /// assert_eq!(VideoJob::new("/videos/beach day.mp4").name, "beach day");
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// Use `name` instead of the file stem.
    #[must_use]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }
}

/// A non-fatal condition observed while processing a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Warning {
    /// Some candidates could not be decoded and were skipped.
    PartialExtraction {
        /// Candidates that failed.
        failed: usize,
        /// Candidates attempted.
        attempted: usize,
    },
    /// Fewer frames were selected than the budget minimum.
    ReducedYield {
        /// Frames actually selected.
        selected: usize,
        /// The budget minimum.
        required: u32,
    },
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Warning::PartialExtraction { failed, attempted } => {
                write!(f, "{failed} of {attempted} candidate frames could not be decoded")
            }
            Warning::ReducedYield { selected, required } => {
                write!(f, "only {selected} usable frames, below the minimum of {required}")
            }
        }
    }
}

/// How processing a video ended.
#[derive(Debug)]
pub enum VideoOutcome {
    /// The selection met the budget minimum.
    Success,
    /// Processing completed, but with fewer frames than the budget minimum.
    ReducedYield,
    /// Processing stopped with an error; no frames were written.
    Failed(FrameSiftError),
}

impl VideoOutcome {
    /// Whether processing completed, regardless of yield.
    pub fn is_completed(&self) -> bool {
        !matches!(self, VideoOutcome::Failed(_))
    }

    /// The error, if processing failed.
    pub fn error(&self) -> Option<&FrameSiftError> {
        match self {
            VideoOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Short lowercase label for display.
    pub fn label(&self) -> &'static str {
        match self {
            VideoOutcome::Success => "success",
            VideoOutcome::ReducedYield => "reduced-yield",
            VideoOutcome::Failed(_) => "failed",
        }
    }
}

/// Everything known about one video after a run.
///
/// Fields that depend on a stage the run never reached keep their defaults
/// (`None` or zero).
#[derive(Debug)]
pub struct VideoReport {
    /// The job that was processed.
    pub job: VideoJob,
    /// Final outcome.
    pub outcome: VideoOutcome,
    /// Probed duration.
    pub duration: Option<Duration>,
    /// Planned frame budget.
    pub budget: Option<FrameBudget>,
    /// Candidate timestamps sampled.
    pub candidates: usize,
    /// Candidates decoded successfully.
    pub extracted: usize,
    /// Frames that passed the quality thresholds.
    pub accepted: usize,
    /// Directory the frames were written to.
    pub frames_dir: Option<PathBuf>,
    /// Written frame files in chronological order.
    pub frames: Vec<PathBuf>,
    /// Non-fatal warnings.
    pub warnings: Vec<Warning>,
    /// Wall-clock processing time.
    pub elapsed: Duration,
}

impl VideoReport {
    pub(crate) fn new(job: VideoJob) -> Self {
        Self {
            job,
            outcome: VideoOutcome::Success,
            duration: None,
            budget: None,
            candidates: 0,
            extracted: 0,
            accepted: 0,
            frames_dir: None,
            frames: Vec::new(),
            warnings: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }
}
