//! Fast SIMD-accelerated image resizing.
//!
//! All fingerprints resize through here so they share one interpolation
//! convention: `fast_image_resize` convolution with the bilinear filter on
//! 8-bit channels. Colour images are resized first and converted to
//! grayscale afterwards.

use super::pixels::PixelBuffer;
use crate::error::HashError;
use fast_image_resize::{images::Image, images::ImageRef, PixelType, ResizeOptions, Resizer};

/// Fast image resizer using SIMD acceleration
pub struct FastResizer {
    resizer: Resizer,
}

impl FastResizer {
    /// Create a new fast resizer
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Resize a buffer to exactly `width` x `height`, keeping its channel count.
    pub fn resize(
        &mut self,
        source: &PixelBuffer,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, HashError> {
        if width == 0 || height == 0 {
            return Err(HashError::ResizeFailed(format!(
                "invalid destination dimensions {}x{}",
                width, height
            )));
        }

        if source.width() == width && source.height() == height {
            return Ok(source.clone());
        }

        let pixel_type = match source.channels() {
            PixelBuffer::GRAY => PixelType::U8,
            _ => PixelType::U8x3,
        };

        let src_image = ImageRef::new(source.width(), source.height(), source.data(), pixel_type)
            .map_err(|e| HashError::ResizeFailed(format!("bad source image: {}", e)))?;

        let mut dst_image = Image::new(width, height, pixel_type);

        let options = ResizeOptions::new().resize_alg(fast_image_resize::ResizeAlg::Convolution(
            fast_image_resize::FilterType::Bilinear,
        ));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| HashError::ResizeFailed(e.to_string()))?;

        PixelBuffer::new(width, height, source.channels(), dst_image.into_vec())
    }

    /// Resize, then convert to a single grayscale channel.
    pub fn resize_to_grayscale(
        &mut self,
        source: &PixelBuffer,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, HashError> {
        Ok(self.resize(source, width, height)?.to_grayscale())
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function for one-off resizing
pub fn resize(source: &PixelBuffer, width: u32, height: u32) -> Result<PixelBuffer, HashError> {
    FastResizer::new().resize(source, width, height)
}

/// Convenience function for one-off resize + grayscale
pub fn resize_to_grayscale(
    source: &PixelBuffer,
    width: u32,
    height: u32,
) -> Result<PixelBuffer, HashError> {
    FastResizer::new().resize_to_grayscale(source, width, height)
}
