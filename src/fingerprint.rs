//! Perceptual fingerprints.
//!
//! A [`Fingerprint`] is a 64-bit gradient hash of a frame's luminance. Frames
//! that look alike produce fingerprints with a small Hamming distance, which
//! is what the diversity selector maximises.

use std::fmt::{Display, Formatter, Result as FmtResult};

use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
#[cfg(feature = "rayon")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::quality::ScoredFrame;

const HASH_WIDTH: u32 = 8;
const HASH_HEIGHT: u32 = 8;

/// 64-bit perceptual fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Fingerprint an image.
    pub fn of(image: &DynamicImage) -> Self {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Gradient)
            .hash_size(HASH_WIDTH, HASH_HEIGHT)
            .to_hasher();
        let hash = hasher.hash_image(&image.to_luma8());
        let bits = hash
            .as_bytes()
            .iter()
            .take(8)
            .fold(0u64, |bits, &byte| (bits << 8) | byte as u64);
        Self(bits)
    }

    /// Number of differing bits.
    ///
    /// ```
    /// use framesift::Fingerprint;
    ///
    /// assert_eq!(Fingerprint(0b1011).distance(&Fingerprint(0b0001)), 2);
    /// ```
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:016x}", self.0)
    }
}

/// An accepted frame paired with its fingerprint.
#[derive(Debug, Clone)]
pub struct FingerprintedFrame {
    /// The scored, accepted frame.
    pub scored: ScoredFrame,
    /// Its fingerprint.
    pub fingerprint: Fingerprint,
}

impl FingerprintedFrame {
    /// Fingerprint a scored frame.
    pub fn new(scored: ScoredFrame) -> Self {
        let fingerprint = Fingerprint::of(&scored.frame.image);
        Self {
            scored,
            fingerprint,
        }
    }
}

/// Fingerprint every accepted frame, dropping rejected ones.
///
/// Runs in parallel with the `rayon` feature; input order is preserved.
pub fn fingerprint_accepted(frames: Vec<ScoredFrame>) -> Vec<FingerprintedFrame> {
    let accepted = frames.into_iter().filter(|scored| scored.accepted);

    #[cfg(feature = "rayon")]
    let fingerprinted = accepted
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(FingerprintedFrame::new)
        .collect();
    #[cfg(not(feature = "rayon"))]
    let fingerprinted = accepted.map(FingerprintedFrame::new).collect();

    fingerprinted
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    fn gradient(horizontal: bool) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, y| {
            let value = if horizontal { x } else { y };
            Luma([(value * 4) as u8])
        }))
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = Fingerprint(0xdead_beef_0000_ffff);
        let b = Fingerprint(0x0123_4567_89ab_cdef);
        assert_eq!(a.distance(&a), 0);
        assert_eq!(a.distance(&b), b.distance(&a));
        assert_eq!(Fingerprint(0).distance(&Fingerprint(u64::MAX)), 64);
    }

    #[test]
    fn identical_images_share_a_fingerprint() {
        assert_eq!(Fingerprint::of(&gradient(true)), Fingerprint::of(&gradient(true)));
    }

    #[test]
    fn different_structure_is_far_apart() {
        let horizontal = Fingerprint::of(&gradient(true));
        let flipped = Fingerprint::of(&gradient(true).fliph());
        assert!(horizontal.distance(&flipped) >= 32);
    }

    #[test]
    fn display_is_fixed_width_hex() {
        assert_eq!(Fingerprint(0xff).to_string(), "00000000000000ff");
    }
}
