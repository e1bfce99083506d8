//! Average Hash (aHash) implementation.
//!
//! aHash works by:
//! 1. Resizing the image to 8x8
//! 2. Converting to grayscale
//! 3. Computing the mean intensity of the 64 cells
//! 4. For each cell in row-major order: 1 if strictly brighter than the mean, else 0

use super::super::fast_resize::resize_to_grayscale;
use super::super::pixels::PixelBuffer;
use super::super::traits::{BitHash, HashAlgorithm, HashAlgorithmKind};
use crate::error::HashError;

/// Side of the aHash grid
pub const AVERAGE_GRID: u32 = 8;

/// Average Hash (aHash) implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct AverageHasher;

impl AverageHasher {
    /// Create a new aHash hasher
    pub fn new() -> Self {
        Self
    }
}

impl HashAlgorithm for AverageHasher {
    fn hash_pixels(&self, pixels: &PixelBuffer) -> Result<BitHash, HashError> {
        let gray = resize_to_grayscale(pixels, AVERAGE_GRID, AVERAGE_GRID)?;

        let total: u64 = gray.data().iter().map(|&p| p as u64).sum();
        let average = total as f64 / gray.data().len() as f64;

        let bits = gray.data().iter().map(|&p| p as f64 > average);
        Ok(BitHash::from_bits(bits, HashAlgorithmKind::Average))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Average
    }

    fn bit_len(&self) -> u32 {
        AVERAGE_GRID * AVERAGE_GRID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_solid_buffer(value: u8) -> PixelBuffer {
        PixelBuffer::new(100, 100, PixelBuffer::RGB, vec![value; 100 * 100 * 3]).unwrap()
    }

    fn create_top_bright_buffer() -> PixelBuffer {
        let mut data = Vec::with_capacity(64 * 64 * 3);
        for y in 0..64 {
            let value = if y < 32 { 230 } else { 20 };
            for _ in 0..64 {
                data.extend_from_slice(&[value, value, value]);
            }
        }
        PixelBuffer::new(64, 64, PixelBuffer::RGB, data).unwrap()
    }

    #[test]
    fn hash_has_64_bits() {
        let hash = AverageHasher::new().hash_pixels(&create_solid_buffer(90)).unwrap();
        assert_eq!(hash.bit_len(), 64);
        assert_eq!(hash.algorithm(), HashAlgorithmKind::Average);
    }

    #[test]
    fn solid_image_has_no_bits_above_mean() {
        let hash = AverageHasher::new().hash_pixels(&create_solid_buffer(128)).unwrap();
        assert!(hash.as_bytes().iter().all(|&b| b == 0x00));
    }

    #[test]
    fn bright_top_half_sets_first_32_bits() {
        let hash = AverageHasher::new().hash_pixels(&create_top_bright_buffer()).unwrap();

        assert_eq!(hash.to_hex(), "ffffffff00000000");
    }

    #[test]
    fn identical_images_produce_identical_hash() {
        let hasher = AverageHasher::new();
        let image = create_top_bright_buffer();

        let hash1 = hasher.hash_pixels(&image).unwrap();
        let hash2 = hasher.hash_pixels(&image).unwrap();

        assert_eq!(hash1.distance(&hash2).unwrap(), 0);
    }
}
