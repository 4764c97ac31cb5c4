//! The default media backend: the `ffmpeg` and `ffprobe` command-line tools.
//!
//! [`FfmpegCli`] shells out once per operation. Every child process is
//! bounded by a timeout and killed if it overruns, so a corrupt file can
//! stall a single candidate but never the pipeline.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::time::Duration;
//!
//! use framesift::{FfmpegCli, MediaBackend};
//!
//! let backend = FfmpegCli::new().with_decode_timeout(Duration::from_secs(20));
//! backend.check_available()?;
//!
//! let duration = backend.probe(Path::new("input.mp4"))?;
//! let frame = backend.decode(Path::new("input.mp4"), duration / 2)?;
//! println!("{}x{}", frame.width(), frame.height());
//! # Ok::<(), framesift::BackendError>(())
//! ```

use std::io::{Read, Result as IoResult};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::{DynamicImage, ImageFormat};
use log::debug;
use wait_timeout::ChildExt;

use crate::backend::MediaBackend;
use crate::error::BackendError;

const STDERR_EXCERPT_LIMIT: usize = 400;

/// Media backend that invokes the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegCli {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    probe_timeout: Duration,
    decode_timeout: Duration,
}

impl Default for FfmpegCli {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegCli {
    /// Use `ffmpeg` and `ffprobe` from `PATH`, with a 30 s probe timeout and a
    /// 60 s decode timeout.
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            probe_timeout: Duration::from_secs(30),
            decode_timeout: Duration::from_secs(60),
        }
    }

    /// Use a specific `ffmpeg` executable.
    #[must_use]
    pub fn with_ffmpeg<P: AsRef<Path>>(mut self, program: P) -> Self {
        self.ffmpeg = program.as_ref().to_path_buf();
        self
    }

    /// Use a specific `ffprobe` executable.
    #[must_use]
    pub fn with_ffprobe<P: AsRef<Path>>(mut self, program: P) -> Self {
        self.ffprobe = program.as_ref().to_path_buf();
        self
    }

    /// Limit each duration probe to `timeout`.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Limit each single-frame decode to `timeout`.
    #[must_use]
    pub fn with_decode_timeout(mut self, timeout: Duration) -> Self {
        self.decode_timeout = timeout;
        self
    }

    /// Verify that both executables can be started.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] naming the first missing
    /// program.
    pub fn check_available(&self) -> Result<(), BackendError> {
        for program in [&self.ffmpeg, &self.ffprobe] {
            let mut command = Command::new(program);
            command.arg("-version");
            run_bounded(command, program, self.probe_timeout)?;
        }
        Ok(())
    }
}

impl MediaBackend for FfmpegCli {
    fn probe(&self, path: &Path) -> Result<Duration, BackendError> {
        let mut command = Command::new(&self.ffprobe);
        command
            .args(["-v", "error", "-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path);

        let stdout = run_bounded(command, &self.ffprobe, self.probe_timeout)?;
        let text = String::from_utf8_lossy(&stdout);
        parse_duration(&text)
    }

    fn decode(&self, path: &Path, timestamp: Duration) -> Result<DynamicImage, BackendError> {
        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-v", "error", "-nostdin"])
            .args(["-ss", &format!("{:.3}", timestamp.as_secs_f64())])
            .arg("-i")
            .arg(path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "pipe:1"]);

        let stdout = run_bounded(command, &self.ffmpeg, self.decode_timeout)?;
        if stdout.is_empty() {
            return Err(BackendError::Decode(format!(
                "no frame produced at {timestamp:?}"
            )));
        }
        Ok(image::load_from_memory_with_format(&stdout, ImageFormat::Png)?)
    }
}

/// Parse `ffprobe`'s bare duration output into a positive [`Duration`].
fn parse_duration(text: &str) -> Result<Duration, BackendError> {
    let trimmed = text.trim();
    let seconds: f64 = trimmed
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .parse()
        .map_err(|_| BackendError::InvalidOutput(format!("unparseable duration {trimmed:?}")))?;

    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(BackendError::InvalidOutput(format!(
            "duration must be positive, got {seconds}"
        )));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| BackendError::InvalidOutput(format!("duration out of range: {seconds}")))
}

/// Run a command to completion within `timeout` and return its stdout.
///
/// Both pipes are drained on helper threads while the child runs; a frame
/// larger than the pipe buffer would otherwise block the child forever.
fn run_bounded(
    mut command: Command,
    program: &Path,
    timeout: Duration,
) -> Result<Vec<u8>, BackendError> {
    let label = program.display().to_string();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| BackendError::Unavailable {
            program: label.clone(),
            source,
        })?;

    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let Some(status) = child.wait_timeout(timeout)? else {
        debug!("Killing {label} after {timeout:?}");
        terminate(&mut child);
        let _ = join(stdout_reader);
        let _ = join(stderr_reader);
        return Err(BackendError::TimedOut {
            program: label,
            timeout,
        });
    };

    let stdout = join(stdout_reader)?;
    let stderr = join(stderr_reader)?;

    if !status.success() {
        return Err(BackendError::Failed {
            program: label,
            status,
            stderr: excerpt(&stderr),
        });
    }
    Ok(stdout)
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<IoResult<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn join(reader: JoinHandle<IoResult<Vec<u8>>>) -> Result<Vec<u8>, BackendError> {
    reader
        .join()
        .map_err(|_| BackendError::InvalidOutput("pipe reader panicked".to_string()))?
        .map_err(BackendError::from)
}

fn terminate(child: &mut Child) {
    // The child may already have exited between the timeout and the kill.
    let _ = child.kill();
    let _ = child.wait();
}

fn excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    let mut start = trimmed.len().saturating_sub(STDERR_EXCERPT_LIMIT);
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}
