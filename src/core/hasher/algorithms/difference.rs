//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Resizing the image to 8x8
//! 2. Converting to grayscale
//! 3. Comparing each cell to the one on its right, 7 comparisons per row
//! 4. If the left cell is strictly brighter, set bit to 1, else 0
//!
//! The result is 8 rows x 7 bits = 56 bits. The cascade thresholds are
//! tuned against this length, so it is not padded out to 64.

use super::super::fast_resize::resize_to_grayscale;
use super::super::pixels::PixelBuffer;
use super::super::traits::{BitHash, HashAlgorithm, HashAlgorithmKind};
use crate::error::HashError;

/// Side of the dHash grid
pub const DIFFERENCE_GRID: u32 = 8;

/// Difference Hash (dHash) implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct DifferenceHasher;

impl DifferenceHasher {
    /// Create a new dHash hasher
    pub fn new() -> Self {
        Self
    }
}

impl HashAlgorithm for DifferenceHasher {
    fn hash_pixels(&self, pixels: &PixelBuffer) -> Result<BitHash, HashError> {
        let gray = resize_to_grayscale(pixels, DIFFERENCE_GRID, DIFFERENCE_GRID)?;
        let side = DIFFERENCE_GRID as usize;

        let bits = gray
            .data()
            .chunks_exact(side)
            .flat_map(|row| row.windows(2).map(|pair| pair[0] > pair[1]));

        Ok(BitHash::from_bits(bits, HashAlgorithmKind::Difference))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Difference
    }

    fn bit_len(&self) -> u32 {
        DIFFERENCE_GRID * (DIFFERENCE_GRID - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_solid_buffer(value: u8) -> PixelBuffer {
        PixelBuffer::new(100, 100, PixelBuffer::RGB, vec![value; 100 * 100 * 3]).unwrap()
    }

    fn create_gradient(left_bright: bool) -> PixelBuffer {
        let mut data = Vec::with_capacity(100 * 100 * 3);
        for _ in 0..100u32 {
            for x in 0..100u32 {
                let brightness = if left_bright {
                    ((99 - x) * 255 / 99) as u8
                } else {
                    (x * 255 / 99) as u8
                };
                data.extend_from_slice(&[brightness, brightness, brightness]);
            }
        }
        PixelBuffer::new(100, 100, PixelBuffer::RGB, data).unwrap()
    }

    #[test]
    fn hash_has_56_bits() {
        let hasher = DifferenceHasher::new();
        let hash = hasher.hash_pixels(&create_solid_buffer(128)).unwrap();

        assert_eq!(hash.bit_len(), 56);
        assert_eq!(hasher.bit_len(), 56);
        assert_eq!(hash.as_bytes().len(), 7);
    }

    #[test]
    fn solid_image_has_no_gradients() {
        let hash = DifferenceHasher::new().hash_pixels(&create_solid_buffer(77)).unwrap();
        assert!(hash.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn left_bright_gradient_sets_every_bit() {
        let hash = DifferenceHasher::new().hash_pixels(&create_gradient(true)).unwrap();
        assert_eq!(hash.to_bit_string(), "1".repeat(56));
    }

    #[test]
    fn opposite_gradients_are_maximally_different() {
        let hasher = DifferenceHasher::new();

        let hash1 = hasher.hash_pixels(&create_gradient(true)).unwrap();
        let hash2 = hasher.hash_pixels(&create_gradient(false)).unwrap();

        assert_eq!(hash1.distance(&hash2).unwrap(), 56);
    }

    #[test]
    fn kind_returns_difference() {
        assert_eq!(DifferenceHasher::new().kind(), HashAlgorithmKind::Difference);
    }
}
