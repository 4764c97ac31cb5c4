//! Writing the selected frames.
//!
//! Each video gets its own directory, `<output root>/<name>_frames/`, holding
//! files named `frame_<index>_t<milliseconds>ms.jpg`. The index is 1-based and
//! zero-padded, so lexical order matches chronological order.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::error::FrameSiftError;
use crate::selection::Selection;

pub(crate) const MAX_NAME_CHARS: usize = 50;
const FALLBACK_NAME: &str = "video";

/// Make a video name safe for use as a directory name.
///
/// Characters that are invalid on common filesystems (`< > : " / \ | ? *`)
/// become `_`, the result is cut to 50 characters, and an empty name becomes
/// `video`.
///
/// ```
/// use framesift::sanitize_name;
///
/// assert_eq!(sanitize_name("a/b:c?"), "a_b_c_");
/// assert_eq!(sanitize_name(""), "video");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_NAME_CHARS)
        .collect();

    if sanitized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

/// Directory that receives the frames of the video called `name`.
pub fn frames_directory(output_root: &Path, name: &str) -> PathBuf {
    output_root.join(format!("{}_frames", sanitize_name(name)))
}

/// File name of the `index`-th (1-based) selected frame.
///
/// ```
/// use std::time::Duration;
///
/// use framesift::output_file_name;
///
/// assert_eq!(
///     output_file_name(3, Duration::from_millis(81_250)),
///     "frame_003_t81250ms.jpg"
/// );
/// ```
pub fn output_file_name(index: usize, timestamp: Duration) -> String {
    format!("frame_{index:03}_t{}ms.jpg", timestamp.as_millis())
}

fn is_output_file_name(name: &str) -> bool {
    name.strip_prefix("frame_")
        .and_then(|rest| rest.strip_suffix("ms.jpg"))
        .and_then(|rest| rest.split_once("_t"))
        .is_some_and(|(index, millis)| {
            !index.is_empty()
                && index.bytes().all(|b| b.is_ascii_digit())
                && !millis.is_empty()
                && millis.bytes().all(|b| b.is_ascii_digit())
        })
}

/// Persist a selection into `frames_dir`.
///
/// The directory is created if needed. Frame files left there by an earlier
/// run are removed first, so repeated runs leave identical contents. Other
/// files are left alone.
///
/// # Errors
///
/// Returns [`FrameSiftError::Write`] if the directory cannot be prepared or a
/// frame cannot be copied. Frames already written by this call are removed
/// before returning.
pub fn write_selection(
    selection: &Selection,
    frames_dir: &Path,
) -> Result<Vec<PathBuf>, FrameSiftError> {
    let write_error = |path: &Path, source| FrameSiftError::Write {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(frames_dir).map_err(|source| write_error(frames_dir, source))?;
    remove_stale_frames(frames_dir).map_err(|source| write_error(frames_dir, source))?;

    let mut written = Vec::with_capacity(selection.len());
    for (position, frame) in selection.frames().iter().enumerate() {
        let scored = &frame.scored.frame;
        let destination = frames_dir.join(output_file_name(position + 1, scored.timestamp));
        if let Err(source) = fs::copy(&scored.scratch_path, &destination) {
            for path in &written {
                let _ = fs::remove_file(path);
            }
            let _ = fs::remove_file(&destination);
            return Err(write_error(&destination, source));
        }
        written.push(destination);
    }

    debug!("Wrote {} frames to {}", written.len(), frames_dir.display());
    Ok(written)
}

fn remove_stale_frames(frames_dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(frames_dir)? {
        let entry = entry?;
        let stale = entry.file_name().to_str().is_some_and(is_output_file_name);
        if stale && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
