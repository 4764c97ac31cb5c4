//! The media capability boundary.
//!
//! The pipeline never touches a container or codec directly. Everything it
//! needs from a video goes through [`MediaBackend`]: the total duration, and
//! a decoded raster at a given offset. [`FfmpegCli`](crate::FfmpegCli) is the
//! default implementation; tests substitute in-memory backends.

use std::path::Path;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use image::DynamicImage;

use crate::error::BackendError;

/// A source of durations and decoded frames.
///
/// Implementations must be [`Send`] and [`Sync`]: a single backend is shared
/// by every worker thread of a run, and by every video of a batch.
///
/// Every call must be bounded in time. Implementations that cannot enforce a
/// timeout themselves can wrap their work in [`with_deadline`].
pub trait MediaBackend: Send + Sync {
    /// Total duration of the video at `path`.
    fn probe(&self, path: &Path) -> Result<Duration, BackendError>;

    /// Decode the frame displayed at `timestamp`.
    ///
    /// The returned image is at the video's native resolution.
    fn decode(&self, path: &Path, timestamp: Duration) -> Result<DynamicImage, BackendError>;
}

impl<B: MediaBackend + ?Sized> MediaBackend for &B {
    fn probe(&self, path: &Path) -> Result<Duration, BackendError> {
        (**self).probe(path)
    }

    fn decode(&self, path: &Path, timestamp: Duration) -> Result<DynamicImage, BackendError> {
        (**self).decode(path, timestamp)
    }
}

impl<B: MediaBackend + ?Sized> MediaBackend for Arc<B> {
    fn probe(&self, path: &Path) -> Result<Duration, BackendError> {
        (**self).probe(path)
    }

    fn decode(&self, path: &Path, timestamp: Duration) -> Result<DynamicImage, BackendError> {
        (**self).decode(path, timestamp)
    }
}

impl<B: MediaBackend + ?Sized> MediaBackend for Box<B> {
    fn probe(&self, path: &Path) -> Result<Duration, BackendError> {
        (**self).probe(path)
    }

    fn decode(&self, path: &Path, timestamp: Duration) -> Result<DynamicImage, BackendError> {
        (**self).decode(path, timestamp)
    }
}

/// Run `work` on a helper thread and give up after `timeout`.
///
/// On timeout the helper thread is detached rather than killed: its result
/// is discarded whenever it eventually arrives. Use this for in-process work
/// that offers no cancellation hook of its own.
///
/// # Errors
///
/// Returns [`BackendError::TimedOut`] labelled with `operation` when the
/// deadline passes, or whatever error `work` produced.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use framesift::{BackendError, with_deadline};
///
/// let answer = with_deadline("compute", Duration::from_secs(1), || Ok(42))?;
/// assert_eq!(answer, 42);
/// # Ok::<(), BackendError>(())
/// ```
pub fn with_deadline<T, F>(operation: &str, timeout: Duration, work: F) -> Result<T, BackendError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BackendError> + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name(format!("framesift-{operation}"))
        .spawn(move || {
            // The receiver is gone once the deadline has passed.
            let _ = sender.send(work());
        })?;

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(BackendError::TimedOut {
            program: operation.to_string(),
            timeout,
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(BackendError::Decode(format!(
            "{operation} worker exited without a result"
        ))),
    }
}
