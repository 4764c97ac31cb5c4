//! Error types for the `framesift` crate.
//!
//! [`FrameSiftError`] is the error returned by every fallible pipeline
//! operation. [`BackendError`] describes a failure of the external media
//! capability (probing a duration or decoding a single frame). A backend
//! failure is only fatal for a video when it happens while probing; a
//! failed decode merely drops that candidate.

use std::{io::Error as IoError, path::PathBuf, process::ExitStatus, time::Duration};

use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framesift` operations.
///
/// Every variant is scoped to a single video. Batch runs convert these into
/// a failed [`VideoOutcome`](crate::VideoOutcome) instead of aborting.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameSiftError {
    /// The duration of the video could not be determined.
    #[error("Failed to probe duration of {path}: {source}")]
    Probe {
        /// Path of the video that was probed.
        path: PathBuf,
        /// Underlying capability failure.
        #[source]
        source: BackendError,
    },

    /// Not a single candidate frame could be decoded.
    #[error("No frames could be decoded from {path} ({attempted} candidates attempted)")]
    Extraction {
        /// Path of the video.
        path: PathBuf,
        /// Number of candidate timestamps that were tried.
        attempted: usize,
    },

    /// The output directory or one of the output files could not be written.
    #[error("Failed to write frames to {path}: {source}")]
    Write {
        /// The directory or file that could not be written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: IoError,
    },

    /// A [`SelectionConfig`](crate::SelectionConfig) value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The run was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error outside of the output directory (e.g. scratch storage).
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

/// Failure of a [`MediaBackend`](crate::MediaBackend) operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The external program could not be started (usually not installed).
    #[error("{program} is not available: {source}")]
    Unavailable {
        /// Program that was invoked.
        program: String,
        /// Error returned by the spawn attempt.
        #[source]
        source: IoError,
    },

    /// The invocation did not finish in time and was abandoned.
    #[error("{program} did not finish within {timeout:?}")]
    TimedOut {
        /// Program (or operation) that timed out.
        program: String,
        /// The limit that was exceeded.
        timeout: Duration,
    },

    /// The external program ran but reported failure.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        /// Program that failed.
        program: String,
        /// Its exit status.
        status: ExitStatus,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The capability produced output that could not be interpreted.
    #[error("Unexpected output: {0}")]
    InvalidOutput(String),

    /// A frame could not be decoded at the requested position.
    #[error("Failed to decode video frame: {0}")]
    Decode(String),

    /// The decoded bytes were not a readable image.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// An I/O error while talking to the capability.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

#[cfg(feature = "native")]
impl From<ffmpeg_next::Error> for BackendError {
    fn from(error: ffmpeg_next::Error) -> Self {
        BackendError::Decode(error.to_string())
    }
}
