//! Trait and value types for bit-sequence fingerprints.

use super::fast_decode::{FastDecoder, ImageDecoder};
use super::pixels::PixelBuffer;
use crate::error::{CompareError, HashError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Available bit-hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithmKind {
    /// Average Hash (aHash) - 8x8 cells against their mean
    Average,
    /// Difference Hash (dHash) - horizontal gradients, 56 bits
    Difference,
    /// Perceptual Hash (pHash) - low DCT frequencies against their mean
    Perceptual,
}

impl HashAlgorithmKind {
    /// Get a human-readable description of the algorithm
    pub fn description(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Average => {
                "Average Hash (aHash) - Fast comparison based on average brightness"
            }
            HashAlgorithmKind::Difference => {
                "Difference Hash (dHash) - Compares brightness gradients between pixels"
            }
            HashAlgorithmKind::Perceptual => {
                "Perceptual Hash (pHash) - DCT-based, robust to edits and transformations"
            }
        }
    }
}

impl std::fmt::Display for HashAlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithmKind::Average => write!(f, "aHash"),
            HashAlgorithmKind::Difference => write!(f, "dHash"),
            HashAlgorithmKind::Perceptual => write!(f, "pHash"),
        }
    }
}

/// Trait for hash algorithm implementations
pub trait HashAlgorithm: Send + Sync {
    /// Compute a hash from already-decoded pixels
    fn hash_pixels(&self, pixels: &PixelBuffer) -> Result<BitHash, HashError>;

    /// Decode a file and hash it
    fn hash_file(&self, path: &Path) -> Result<BitHash, HashError> {
        let pixels = FastDecoder.decode(path)?;
        self.hash_pixels(&pixels)
    }

    /// Get the algorithm kind
    fn kind(&self) -> HashAlgorithmKind;

    /// Length of the produced bit sequence
    fn bit_len(&self) -> u32;
}

/// A fixed-length bit sequence produced by one algorithm.
///
/// Bits are packed most-significant first; unused trailing bits of the
/// last byte are always zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitHash {
    bytes: Vec<u8>,
    bit_len: u32,
    algorithm: HashAlgorithmKind,
}

impl BitHash {
    /// Pack a sequence of bits
    pub fn from_bits(bits: impl IntoIterator<Item = bool>, algorithm: HashAlgorithmKind) -> Self {
        let mut bytes = Vec::new();
        let mut current_byte: u8 = 0;
        let mut bit_len: u32 = 0;

        for bit in bits {
            let bit_position = bit_len % 8;
            if bit {
                current_byte |= 1 << (7 - bit_position);
            }
            bit_len += 1;

            if bit_len % 8 == 0 {
                bytes.push(current_byte);
                current_byte = 0;
            }
        }

        if bit_len % 8 != 0 {
            bytes.push(current_byte);
        }

        Self {
            bytes,
            bit_len,
            algorithm,
        }
    }

    /// Restore from packed bytes, ignoring anything past `bit_len`
    pub fn from_bytes(bytes: &[u8], bit_len: u32, algorithm: HashAlgorithmKind) -> Self {
        let needed = bit_len.div_ceil(8) as usize;
        let mut bytes: Vec<u8> = bytes.iter().copied().take(needed).collect();
        bytes.resize(needed, 0);

        let spare = (needed * 8) as u32 - bit_len;
        if spare > 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= 0xFFu8 << spare;
            }
        }

        Self {
            bytes,
            bit_len,
            algorithm,
        }
    }

    /// Number of meaningful bits
    pub fn bit_len(&self) -> u32 {
        self.bit_len
    }

    /// Get the algorithm that produced this hash
    pub fn algorithm(&self) -> HashAlgorithmKind {
        self.algorithm
    }

    /// Get the raw hash bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bit at `index`, counting from the first cell
    pub fn bit(&self, index: u32) -> bool {
        let byte = self.bytes[(index / 8) as usize];
        byte & (1 << (7 - index % 8)) != 0
    }

    /// Hamming distance to another hash of the same algorithm and length.
    pub fn distance(&self, other: &Self) -> Result<u32, CompareError> {
        if self.bit_len != other.bit_len {
            return Err(CompareError::DimensionMismatch {
                left: self.bit_len,
                right: other.bit_len,
            });
        }

        if self.algorithm != other.algorithm {
            return Err(CompareError::AlgorithmMismatch {
                left: self.algorithm,
                right: other.algorithm,
            });
        }

        Ok(self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }

    /// Get the hash as a hexadecimal string
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// `'0'`/`'1'` string, one character per bit
    pub fn to_bit_string(&self) -> String {
        (0..self.bit_len)
            .map(|i| if self.bit(i) { '1' } else { '0' })
            .collect()
    }
}
