//! Candidate frame extraction.
//!
//! [`extract_frames`] decodes every candidate timestamp through the media
//! backend, stores the full-resolution frame in the run's scratch directory,
//! and keeps a reduced copy in memory for analysis. Candidates are
//! independent, so with the `rayon` feature they are decoded in parallel.
//!
//! A candidate that fails to decode or save is dropped. Only a video where
//! every candidate fails is an error.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{DynamicImage, codecs::jpeg::JpegEncoder, imageops::FilterType};
use log::debug;
#[cfg(feature = "rayon")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::backend::MediaBackend;
use crate::configuration::{RunOptions, SelectionConfig};
use crate::error::FrameSiftError;
use crate::probe::VideoHandle;
use crate::progress::{OperationType, ProgressTracker};
use crate::sampler::CandidateSet;

const SCRATCH_JPEG_QUALITY: u8 = 95;

/// A decoded candidate.
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    /// Offset of the frame from the start of the video.
    pub timestamp: Duration,
    /// The frame reduced to the analysis resolution.
    pub image: DynamicImage,
    /// Full-resolution copy in scratch storage.
    pub scratch_path: PathBuf,
}

/// Frames that survived extraction, plus failure accounting.
#[derive(Debug)]
pub struct Extraction {
    /// Successfully extracted frames in timestamp order.
    pub frames: Vec<ExtractedFrame>,
    /// Number of candidates that were attempted.
    pub attempted: usize,
    /// Number of candidates that were dropped.
    pub failed: usize,
}

enum CandidateResult {
    Extracted(ExtractedFrame),
    Dropped,
    Cancelled,
}

/// File name used for a candidate in scratch storage.
pub fn scratch_file_name(timestamp: Duration) -> String {
    format!("candidate_t{}ms.jpg", timestamp.as_millis())
}

/// Decode all candidates of a video into `scratch_dir`.
///
/// # Errors
///
/// - [`FrameSiftError::Cancelled`] if the run is cancelled.
/// - [`FrameSiftError::Extraction`] if no candidate could be decoded.
pub fn extract_frames<B>(
    backend: &B,
    video: &VideoHandle,
    candidates: &CandidateSet,
    scratch_dir: &Path,
    config: &SelectionConfig,
    options: &RunOptions,
) -> Result<Extraction, FrameSiftError>
where
    B: MediaBackend + ?Sized,
{
    options.check_cancelled()?;

    let tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::Extraction,
        Some(candidates.len() as u64),
        options.batch_size,
    );

    let extract_one = |timestamp: &Duration| {
        if options.is_cancelled() {
            return CandidateResult::Cancelled;
        }
        let result = extract_candidate(backend, video, *timestamp, scratch_dir, config);
        tracker.advance(Some(*timestamp));
        result
    };

    #[cfg(feature = "rayon")]
    let results: Vec<CandidateResult> = candidates.timestamps().par_iter().map(extract_one).collect();
    #[cfg(not(feature = "rayon"))]
    let results: Vec<CandidateResult> = candidates.timestamps().iter().map(extract_one).collect();

    tracker.finish();

    let attempted = candidates.len();
    let mut frames = Vec::with_capacity(attempted);
    for result in results {
        match result {
            CandidateResult::Extracted(frame) => frames.push(frame),
            CandidateResult::Dropped => {}
            CandidateResult::Cancelled => return Err(FrameSiftError::Cancelled),
        }
    }

    if frames.is_empty() {
        return Err(FrameSiftError::Extraction {
            path: video.path().to_path_buf(),
            attempted,
        });
    }

    let failed = attempted - frames.len();
    debug!(
        "Extracted {}/{} candidates from {}",
        frames.len(),
        attempted,
        video.path().display()
    );
    Ok(Extraction {
        frames,
        attempted,
        failed,
    })
}

fn extract_candidate<B>(
    backend: &B,
    video: &VideoHandle,
    timestamp: Duration,
    scratch_dir: &Path,
    config: &SelectionConfig,
) -> CandidateResult
where
    B: MediaBackend + ?Sized,
{
    let image = match backend.decode(video.path(), timestamp) {
        Ok(image) => image,
        Err(error) => {
            debug!("Dropping candidate at {timestamp:?}: {error}");
            return CandidateResult::Dropped;
        }
    };

    let scratch_path = scratch_dir.join(scratch_file_name(timestamp));
    if let Err(error) = save_scratch_image(&image, &scratch_path) {
        debug!(
            "Dropping candidate at {timestamp:?}: could not write {}: {error}",
            scratch_path.display()
        );
        return CandidateResult::Dropped;
    }

    CandidateResult::Extracted(ExtractedFrame {
        timestamp,
        image: reduce_for_analysis(image, config.analysis_max_dimension),
        scratch_path,
    })
}

fn save_scratch_image(image: &DynamicImage, path: &Path) -> Result<(), FrameSiftError> {
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = JpegEncoder::new_with_quality(writer, SCRATCH_JPEG_QUALITY);
    encoder.encode_image(&image.to_rgb8())?;
    Ok(())
}

/// Shrink an image so its longest edge is at most `max_dimension`.
///
/// Images that already fit are returned unchanged.
pub fn reduce_for_analysis(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width.max(height) <= max_dimension {
        return image;
    }
    let (new_width, new_height) = fit_dimensions(width, height, max_dimension);
    image.resize_exact(new_width, new_height, FilterType::Triangle)
}

/// Scale `(width, height)` so the longer edge equals `max_dimension`,
/// preserving the aspect ratio.
fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (max_dimension, max_dimension);
    }
    let scale = max_dimension as f64 / width.max(height) as f64;
    let new_width = ((width as f64) * scale).round() as u32;
    let new_height = ((height as f64) * scale).round() as u32;
    (new_width.max(1), new_height.max(1))
}
