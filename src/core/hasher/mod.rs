//! # Hasher Module
//!
//! Computes the fingerprints used to compare images.
//!
//! ## Fingerprints
//! - **aHash (Average Hash)** - 64 bits, 8x8 cells against their mean
//! - **dHash (Difference Hash)** - 56 bits, horizontal gradients on an 8x8 grid
//! - **pHash (Perceptual Hash)** - 64 bits, low DCT frequencies of a 32x32 grid
//! - **Channel histograms** - 256 buckets per colour channel; the blue channel
//!   of the full image is the cascade's confirmation signal
//!
//! ## Conventions
//! Every fingerprint must be bit-stable because the similarity cascade
//! thresholds were tuned against them:
//! - colour is resized first, then converted to grayscale
//! - resizing is `fast_image_resize` bilinear convolution on u8 channels
//! - grayscale is BT.601 in 14-bit fixed point (see [`pixels::luma`])
//! - the DCT is orthonormal DCT-II in f64
//!
//! ## Example
//! ```rust,ignore
//! use similar_images::core::hasher::HashEngine;
//!
//! let engine = HashEngine::new();
//! let fingerprints = engine.fingerprints(&pixels)?;
//! println!("{}", fingerprints.difference.to_bit_string());
//! ```

mod algorithms;
pub mod dct;
pub mod fast_decode;
pub mod fast_resize;
pub mod histogram;
pub mod pixels;
mod traits;

pub use algorithms::{
    AverageHasher, DifferenceHasher, PerceptualHasher, AVERAGE_GRID, DCT_SIZE, DIFFERENCE_GRID,
    LOW_FREQUENCY_BLOCK,
};
pub use fast_decode::{FastDecoder, ImageDecoder};
pub use histogram::{ChannelHistogram, Histogram, BLUE, BUCKETS};
pub use pixels::PixelBuffer;
pub use traits::{BitHash, HashAlgorithm, HashAlgorithmKind};

use crate::error::HashError;

/// Side of the canvas both images are resized to before comparing colour histograms
pub const HISTOGRAM_CANVAS: u32 = 256;

/// All fingerprints of one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprints {
    pub average: BitHash,
    pub difference: BitHash,
    pub perceptual: BitHash,
    /// Per-channel histogram of the full-resolution image
    pub histogram: ChannelHistogram,
}

/// Computes every fingerprint the comparator needs from a [`PixelBuffer`].
///
/// Stateless apart from the precomputed DCT table, so one engine is shared
/// by all workers.
#[derive(Debug, Clone, Default)]
pub struct HashEngine {
    average: AverageHasher,
    difference: DifferenceHasher,
    perceptual: PerceptualHasher,
}

impl HashEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hasher for one bit-hash algorithm
    pub fn hasher(&self, kind: HashAlgorithmKind) -> &dyn HashAlgorithm {
        match kind {
            HashAlgorithmKind::Average => &self.average,
            HashAlgorithmKind::Difference => &self.difference,
            HashAlgorithmKind::Perceptual => &self.perceptual,
        }
    }

    pub fn average_hash(&self, pixels: &PixelBuffer) -> Result<BitHash, HashError> {
        self.average.hash_pixels(pixels)
    }

    pub fn difference_hash(&self, pixels: &PixelBuffer) -> Result<BitHash, HashError> {
        self.difference.hash_pixels(pixels)
    }

    pub fn perceptual_hash(&self, pixels: &PixelBuffer) -> Result<BitHash, HashError> {
        self.perceptual.hash_pixels(pixels)
    }

    /// Per-channel histogram over the full, non-resized image
    pub fn channel_histogram(&self, pixels: &PixelBuffer) -> ChannelHistogram {
        ChannelHistogram::from_pixels(pixels)
    }

    /// Per-channel histogram of the image resized to the comparison canvas
    pub fn canvas_histogram(&self, pixels: &PixelBuffer) -> Result<ChannelHistogram, HashError> {
        let canvas = fast_resize::resize(pixels, HISTOGRAM_CANVAS, HISTOGRAM_CANVAS)?;
        Ok(ChannelHistogram::from_pixels(&canvas))
    }

    /// Compute all four fingerprints
    pub fn fingerprints(&self, pixels: &PixelBuffer) -> Result<Fingerprints, HashError> {
        Ok(Fingerprints {
            average: self.average_hash(pixels)?,
            difference: self.difference_hash(pixels)?,
            perceptual: self.perceptual_hash(pixels)?,
            histogram: self.channel_histogram(pixels),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_buffer() -> PixelBuffer {
        let mut data = Vec::with_capacity(40 * 30 * 3);
        for y in 0..30u32 {
            for x in 0..40u32 {
                data.extend_from_slice(&[(x * 6) as u8, (y * 8) as u8, 99]);
            }
        }
        PixelBuffer::new(40, 30, PixelBuffer::RGB, data).unwrap()
    }

    #[test]
    fn fingerprints_have_expected_lengths() {
        let engine = HashEngine::new();
        let fingerprints = engine.fingerprints(&create_test_buffer()).unwrap();

        assert_eq!(fingerprints.average.bit_len(), 64);
        assert_eq!(fingerprints.difference.bit_len(), 56);
        assert_eq!(fingerprints.perceptual.bit_len(), 64);
        assert_eq!(fingerprints.histogram.channel(0).total(), 40 * 30);
    }

    #[test]
    fn fingerprints_are_deterministic() {
        let engine = HashEngine::new();
        let pixels = create_test_buffer();

        assert_eq!(
            engine.fingerprints(&pixels).unwrap(),
            engine.fingerprints(&pixels).unwrap()
        );
    }

    #[test]
    fn hasher_lookup_matches_kind() {
        let engine = HashEngine::new();
        for kind in [
            HashAlgorithmKind::Average,
            HashAlgorithmKind::Difference,
            HashAlgorithmKind::Perceptual,
        ] {
            assert_eq!(engine.hasher(kind).kind(), kind);
        }
    }

    #[test]
    fn canvas_histogram_counts_canvas_pixels() {
        let engine = HashEngine::new();
        let histogram = engine.canvas_histogram(&create_test_buffer()).unwrap();

        let canvas_pixels = (HISTOGRAM_CANVAS * HISTOGRAM_CANVAS) as u64;
        for channel in histogram.channels() {
            assert_eq!(channel.total(), canvas_pixels);
        }
    }
}
