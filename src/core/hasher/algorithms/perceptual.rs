//! Perceptual Hash (pHash) implementation.
//!
//! pHash uses the Discrete Cosine Transform (DCT) to extract
//! frequency information from the image:
//! 1. Resize to 32x32 and convert to grayscale
//! 2. Apply a 2D DCT over the whole 32x32 matrix
//! 3. Keep the top-left 8x8 low-frequency block (DC term included)
//! 4. 1 for each coefficient strictly above the block mean, row-major

use super::super::dct::Dct2d;
use super::super::fast_resize::resize_to_grayscale;
use super::super::pixels::PixelBuffer;
use super::super::traits::{BitHash, HashAlgorithm, HashAlgorithmKind};
use crate::error::HashError;

/// Side of the matrix fed to the DCT
pub const DCT_SIZE: u32 = 32;
/// Side of the low-frequency block that becomes the hash
pub const LOW_FREQUENCY_BLOCK: u32 = 8;

/// Perceptual Hash (pHash) implementation using DCT
#[derive(Debug, Clone)]
pub struct PerceptualHasher {
    dct: Dct2d,
}

impl PerceptualHasher {
    /// Create a new pHash hasher
    pub fn new() -> Self {
        Self {
            dct: Dct2d::new(DCT_SIZE as usize),
        }
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl HashAlgorithm for PerceptualHasher {
    fn hash_pixels(&self, pixels: &PixelBuffer) -> Result<BitHash, HashError> {
        let gray = resize_to_grayscale(pixels, DCT_SIZE, DCT_SIZE)?;
        let matrix: Vec<f64> = gray.data().iter().map(|&p| p as f64).collect();
        let coefficients = self.dct.forward(&matrix);

        let size = DCT_SIZE as usize;
        let block = LOW_FREQUENCY_BLOCK as usize;
        let low: Vec<f64> = (0..block)
            .flat_map(|v| coefficients[v * size..v * size + block].iter().copied())
            .collect();

        let mean = low.iter().sum::<f64>() / low.len() as f64;
        let bits = low.iter().map(|&c| c > mean);

        Ok(BitHash::from_bits(bits, HashAlgorithmKind::Perceptual))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Perceptual
    }

    fn bit_len(&self) -> u32 {
        LOW_FREQUENCY_BLOCK * LOW_FREQUENCY_BLOCK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_solid_buffer(value: u8) -> PixelBuffer {
        PixelBuffer::new(100, 100, PixelBuffer::RGB, vec![value; 100 * 100 * 3]).unwrap()
    }

    fn create_checker(cell: u32, offset: u8) -> PixelBuffer {
        let mut data = Vec::with_capacity(96 * 96 * 3);
        for y in 0..96u32 {
            for x in 0..96u32 {
                let on = ((x / cell) + (y / cell)) % 2 == 0;
                let value = if on { 200u8 } else { 40u8 }.saturating_add(offset);
                data.extend_from_slice(&[value, value, value]);
            }
        }
        PixelBuffer::new(96, 96, PixelBuffer::RGB, data).unwrap()
    }

    #[test]
    fn hash_has_64_bits() {
        let hash = PerceptualHasher::new()
            .hash_pixels(&create_solid_buffer(10))
            .unwrap();
        assert_eq!(hash.bit_len(), 64);
    }

    #[test]
    fn solid_image_sets_only_the_dc_bit() {
        let hash = PerceptualHasher::new()
            .hash_pixels(&create_solid_buffer(128))
            .unwrap();

        // All energy is in the DC coefficient, which is the only one above the mean
        assert_eq!(hash.to_hex(), "8000000000000000");
    }

    #[test]
    fn brightness_shift_keeps_hash_close() {
        let hasher = PerceptualHasher::new();

        let hash1 = hasher.hash_pixels(&create_checker(24, 0)).unwrap();
        let hash2 = hasher.hash_pixels(&create_checker(24, 5)).unwrap();

        assert!(hash1.distance(&hash2).unwrap() < 10);
    }

    #[test]
    fn kind_returns_perceptual() {
        assert_eq!(PerceptualHasher::new().kind(), HashAlgorithmKind::Perceptual);
    }
}
