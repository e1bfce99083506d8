//! Decoded pixel storage.
//!
//! Every fingerprint is computed from a [`PixelBuffer`]: row-major,
//! interleaved, 8 bits per channel. Colour images are always RGB.

use crate::error::HashError;
use image::DynamicImage;

/// ITU-R BT.601 luma weights in 14-bit fixed point (they sum to 1 << 14).
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Convert one RGB pixel to its grayscale intensity.
///
/// Integer arithmetic keeps the result bit-identical across runs and
/// platforms; the thresholds in the similarity cascade depend on it.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = LUMA_R * r as u32 + LUMA_G * g as u32 + LUMA_B * b as u32;
    ((weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}

/// A decoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Single intensity channel
    pub const GRAY: u8 = 1;
    /// Red, green, blue
    pub const RGB: u8 = 3;

    /// Wrap raw pixel data, checking that it matches the declared shape
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, HashError> {
        if width == 0 || height == 0 {
            return Err(HashError::InvalidBuffer(format!(
                "zero-sized image {}x{}",
                width, height
            )));
        }

        if channels != Self::GRAY && channels != Self::RGB {
            return Err(HashError::InvalidBuffer(format!(
                "unsupported channel count {}",
                channels
            )));
        }

        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(HashError::InvalidBuffer(format!(
                "expected {} bytes for {}x{}x{}, got {}",
                expected,
                width,
                height,
                channels,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Convert an `image` crate image to an RGB buffer
    pub fn from_image(image: &DynamicImage) -> Result<Self, HashError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::new(width, height, Self::RGB, rgb.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Raw interleaved bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of pixels (not bytes)
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The channel values of the pixel at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let stride = self.channels as usize;
        let offset = (y as usize * self.width as usize + x as usize) * stride;
        &self.data[offset..offset + stride]
    }

    /// Values of one channel in row-major order
    pub fn channel_values(&self, channel: usize) -> impl Iterator<Item = u8> + '_ {
        let stride = self.channels as usize;
        self.data.iter().skip(channel).step_by(stride).copied()
    }

    /// Grayscale copy of this buffer. A gray buffer is returned unchanged.
    pub fn to_grayscale(&self) -> PixelBuffer {
        if self.channels == Self::GRAY {
            return self.clone();
        }

        let data = self
            .data
            .chunks_exact(Self::RGB as usize)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect();

        PixelBuffer {
            width: self.width,
            height: self.height,
            channels: Self::GRAY,
            data,
        }
    }

    /// Approximate heap footprint, used for cache statistics
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }
}
