//! Duration probing.
//!
//! [`probe_video`] asks the media backend for a video's total duration and
//! wraps the answer in an immutable [`VideoHandle`]. A video that cannot be
//! probed is skipped; nothing else in the pipeline runs for it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::backend::MediaBackend;
use crate::error::{BackendError, FrameSiftError};

/// A local video whose duration is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoHandle {
    path: PathBuf,
    duration: Duration,
}

impl VideoHandle {
    /// Path of the video file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total duration, always greater than zero.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Determine the duration of the video at `path`.
///
/// # Errors
///
/// Returns [`FrameSiftError::Probe`] when the file does not exist, is not a
/// recognised media container, the backend is unavailable or times out, or
/// the reported duration is zero.
///
/// # Example
///
/// ```no_run
/// use framesift::{FfmpegCli, probe_video};
///
/// let video = probe_video(&FfmpegCli::new(), "input.mp4")?;
/// println!("{} lasts {:?}", video.path().display(), video.duration());
/// # Ok::<(), framesift::FrameSiftError>(())
/// ```
pub fn probe_video<B, P>(backend: &B, path: P) -> Result<VideoHandle, FrameSiftError>
where
    B: MediaBackend + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let fail = |source: BackendError| FrameSiftError::Probe {
        path: path.to_path_buf(),
        source,
    };

    if !path.is_file() {
        return Err(fail(BackendError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "video file not found",
        ))));
    }

    let duration = backend.probe(path).map_err(fail)?;
    if duration.is_zero() {
        return Err(fail(BackendError::InvalidOutput(
            "duration must be positive, got 0".to_string(),
        )));
    }

    debug!("Probed {}: {:?}", path.display(), duration);
    Ok(VideoHandle {
        path: path.to_path_buf(),
        duration,
    })
}
