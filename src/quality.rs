//! Frame quality scoring.
//!
//! Each extracted frame is measured on its luminance channel:
//!
//! - **Sharpness** is the variance of the 4-neighbour discrete Laplacian.
//!   Blurry frames have little second-derivative response and score low.
//! - **Brightness** is the mean luminance normalised to `0.0..=1.0`.
//!
//! A frame is accepted when it is sharp enough and its brightness falls in
//! the configured window, which rejects black fades and blown-out flashes.

use image::{DynamicImage, GrayImage};
use log::debug;
#[cfg(feature = "rayon")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::configuration::{RunOptions, SelectionConfig};
use crate::extraction::ExtractedFrame;
use crate::progress::{OperationType, ProgressTracker};

/// Sharpness and brightness of one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityMetrics {
    /// Laplacian variance, `>= 0`.
    pub sharpness: f64,
    /// Mean luminance, `0.0..=1.0`.
    pub brightness: f64,
}

impl QualityMetrics {
    /// Measure an image.
    ///
    /// # Example
    ///
    /// ```
    /// use image::{DynamicImage, GrayImage, Luma};
    /// use framesift::QualityMetrics;
    ///
    /// let flat = DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([128])));
    /// let metrics = QualityMetrics::measure(&flat);
    /// assert_eq!(metrics.sharpness, 0.0);
    /// assert!((metrics.brightness - 128.0 / 255.0).abs() < 1e-9);
    /// ```
    pub fn measure(image: &DynamicImage) -> Self {
        let luma = image.to_luma8();
        Self {
            sharpness: laplacian_variance(&luma),
            brightness: mean_brightness(&luma),
        }
    }

    /// Whether these metrics pass the thresholds in `config`.
    pub fn passes(&self, config: &SelectionConfig) -> bool {
        self.sharpness >= config.sharpness_min
            && self.brightness >= config.brightness_min
            && self.brightness <= config.brightness_max
    }
}

/// An extracted frame with its quality verdict.
#[derive(Debug, Clone)]
pub struct ScoredFrame {
    /// The frame that was scored.
    pub frame: ExtractedFrame,
    /// Its measurements.
    pub metrics: QualityMetrics,
    /// Whether the frame passed the quality thresholds.
    pub accepted: bool,
}

/// Score a single frame against `config`.
///
/// Deterministic: the same image always yields the same metrics.
pub fn score_frame(frame: ExtractedFrame, config: &SelectionConfig) -> ScoredFrame {
    let metrics = QualityMetrics::measure(&frame.image);
    let accepted = metrics.passes(config);
    if !accepted {
        debug!(
            "Rejected frame at {:?}: sharpness {:.1}, brightness {:.3}",
            frame.timestamp, metrics.sharpness, metrics.brightness
        );
    }
    ScoredFrame {
        frame,
        metrics,
        accepted,
    }
}

/// Score a batch of frames, in parallel with the `rayon` feature.
///
/// The output preserves the input order.
pub fn score_frames(
    frames: Vec<ExtractedFrame>,
    config: &SelectionConfig,
    options: &RunOptions,
) -> Vec<ScoredFrame> {
    let tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::Scoring,
        Some(frames.len() as u64),
        options.batch_size,
    );

    let score_one = |frame: ExtractedFrame| {
        let timestamp = frame.timestamp;
        let scored = score_frame(frame, config);
        tracker.advance(Some(timestamp));
        scored
    };

    #[cfg(feature = "rayon")]
    let scored: Vec<ScoredFrame> = frames.into_par_iter().map(score_one).collect();
    #[cfg(not(feature = "rayon"))]
    let scored: Vec<ScoredFrame> = frames.into_iter().map(score_one).collect();

    tracker.finish();
    scored
}

/// Population variance of the 4-neighbour Laplacian response.
///
/// Out-of-bounds neighbours replicate the nearest edge pixel.
pub fn laplacian_variance(luma: &GrayImage) -> f64 {
    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return 0.0;
    }

    let pixel = |x: u32, y: u32| luma.get_pixel(x, y).0[0] as f64;
    let count = (width as f64) * (height as f64);
    let mut sum = 0.0;
    let mut sum_of_squares = 0.0;

    for y in 0..height {
        let up = y.saturating_sub(1);
        let down = (y + 1).min(height - 1);
        for x in 0..width {
            let left = x.saturating_sub(1);
            let right = (x + 1).min(width - 1);
            let response = pixel(x, up) + pixel(x, down) + pixel(left, y) + pixel(right, y)
                - 4.0 * pixel(x, y);
            sum += response;
            sum_of_squares += response * response;
        }
    }

    let mean = sum / count;
    (sum_of_squares / count - mean * mean).max(0.0)
}

/// Mean luminance normalised to `0.0..=1.0`.
pub fn mean_brightness(luma: &GrayImage) -> f64 {
    let pixels = luma.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    let total: u64 = pixels.iter().map(|&p| p as u64).sum();
    total as f64 / pixels.len() as f64 / 255.0
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use image::Luma;

    use super::*;

    fn checkerboard(size: u32, cell: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                Luma([40])
            } else {
                Luma([210])
            }
        })
    }

    fn frame(image: GrayImage) -> ExtractedFrame {
        ExtractedFrame {
            timestamp: Duration::from_secs(1),
            image: DynamicImage::ImageLuma8(image),
            scratch_path: PathBuf::from("unused.jpg"),
        }
    }

    #[test]
    fn flat_image_has_no_sharpness() {
        let flat = GrayImage::from_pixel(16, 16, Luma([200]));
        assert_eq!(laplacian_variance(&flat), 0.0);
    }

    #[test]
    fn single_pixel_has_no_sharpness() {
        let tiny = GrayImage::from_pixel(1, 1, Luma([90]));
        assert_eq!(laplacian_variance(&tiny), 0.0);
    }

    #[test]
    fn fine_detail_is_sharper_than_coarse() {
        let fine = laplacian_variance(&checkerboard(64, 2));
        let coarse = laplacian_variance(&checkerboard(64, 16));
        assert!(fine > coarse);
        assert!(coarse > 0.0);
    }

    #[test]
    fn brightness_is_normalised() {
        assert_eq!(mean_brightness(&GrayImage::from_pixel(4, 4, Luma([0]))), 0.0);
        assert_eq!(mean_brightness(&GrayImage::from_pixel(4, 4, Luma([255]))), 1.0);
    }

    #[test]
    fn dark_frames_are_rejected() {
        let dark = GrayImage::from_fn(32, 32, |x, y| Luma([((x + y) % 2 * 10) as u8]));
        let scored = score_frame(frame(dark), &SelectionConfig::default());
        assert!(!scored.accepted);
        assert!(scored.metrics.brightness < 0.08);
    }

    #[test]
    fn detailed_frames_are_accepted() {
        let scored = score_frame(frame(checkerboard(64, 4)), &SelectionConfig::default());
        assert!(scored.accepted, "{:?}", scored.metrics);
    }

    #[test]
    fn scoring_is_deterministic_and_ordered() {
        let frames = vec![frame(checkerboard(64, 2)), frame(checkerboard(64, 8))];
        let config = SelectionConfig::default();
        let first = score_frames(frames.clone(), &config, &RunOptions::new());
        let second = score_frames(frames, &config, &RunOptions::new());
        let metrics = |scored: &[ScoredFrame]| scored.iter().map(|s| s.metrics).collect::<Vec<_>>();
        assert_eq!(metrics(&first), metrics(&second));
        assert!(first[0].metrics.sharpness > first[1].metrics.sharpness);
    }
}
