//! # framesift
//!
//! Select a small, sharp, visually diverse set of still frames from a video.
//!
//! `framesift` replaces a full video with a bounded set of representative
//! images, for example when building an image dataset from video sources.
//! Frames are proposed at evenly spaced timestamps, filtered for sharpness
//! and exposure, and then picked greedily for visual diversity using
//! perceptual fingerprints.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framesift::{FfmpegCli, FrameSelector, RunOptions, SelectionConfig, VideoJob};
//!
//! let selector = FrameSelector::new(FfmpegCli::new(), SelectionConfig::default())?;
//! let report = selector.run(&VideoJob::new("input.mp4"), "frames", &RunOptions::new());
//!
//! // frames/input_frames/frame_001_t1250ms.jpg, frame_002_t5980ms.jpg, ...
//! for path in &report.frames {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), framesift::FrameSiftError>(())
//! ```
//!
//! ## Pipeline
//!
//! 1. **Probe** the duration through a [`MediaBackend`].
//! 2. **Plan** a [`FrameBudget`] from the duration (10 to 60 frames).
//! 3. **Sample** oversampled, evenly spaced candidate timestamps.
//! 4. **Extract** each candidate into a private scratch directory.
//! 5. **Score** sharpness (Laplacian variance) and brightness.
//! 6. **Select** a diverse subset by max–min Hamming distance.
//! 7. **Write** the selection as `frame_<index>_t<ms>ms.jpg`.
//!
//! Every stage can also be called on its own.
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | Parallel extraction, scoring, and batch processing (default) |
//! | `native` | [`NativeBackend`], decoding in-process through `ffmpeg-next` |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! The default [`FfmpegCli`] backend needs the `ffmpeg` and `ffprobe`
//! executables. The `native` feature needs the FFmpeg development libraries
//! instead.

pub mod backend;
pub mod budget;
pub mod configuration;
pub mod error;
pub mod extraction;
pub mod ffmpeg;
pub mod fingerprint;
#[cfg(feature = "native")]
pub mod native;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod quality;
pub mod report;
pub mod sampler;
pub mod selection;

pub use backend::{MediaBackend, with_deadline};
pub use budget::{FrameBudget, HARD_FRAME_CAP};
pub use configuration::{RunOptions, SelectionConfig};
pub use error::{BackendError, FrameSiftError};
pub use extraction::{ExtractedFrame, Extraction, extract_frames};
pub use ffmpeg::FfmpegCli;
pub use fingerprint::{Fingerprint, FingerprintedFrame, fingerprint_accepted};
#[cfg(feature = "native")]
pub use native::NativeBackend;
pub use output::{frames_directory, output_file_name, sanitize_name, write_selection};
pub use pipeline::FrameSelector;
pub use probe::{VideoHandle, probe_video};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use quality::{QualityMetrics, ScoredFrame, score_frame, score_frames};
pub use report::{VideoJob, VideoOutcome, VideoReport, Warning};
pub use sampler::{CandidateSet, sample_candidates, target_candidates};
pub use selection::{Selection, select_diverse};
