//! Intensity histograms.

use super::pixels::PixelBuffer;

/// Number of intensity buckets per channel
pub const BUCKETS: usize = 256;

/// Index of the blue channel in a [`ChannelHistogram`]
pub const BLUE: usize = 2;

/// Intensities are binned over `[0, 255)`, so full intensity is never counted
/// and bucket 255 stays empty. The similarity thresholds were tuned with this
/// range.
const EXCLUDED_INTENSITY: u8 = u8::MAX;

/// A 256-bucket frequency histogram of one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    buckets: [u32; BUCKETS],
}

impl Histogram {
    /// Count the given intensities
    pub fn from_values(values: impl IntoIterator<Item = u8>) -> Self {
        let mut buckets = [0u32; BUCKETS];
        for value in values {
            if value != EXCLUDED_INTENSITY {
                buckets[value as usize] += 1;
            }
        }
        Self { buckets }
    }

    /// Build from precomputed counts
    pub fn from_counts(buckets: [u32; BUCKETS]) -> Self {
        Self { buckets }
    }

    pub fn buckets(&self) -> &[u32; BUCKETS] {
        &self.buckets
    }

    /// Count in one bucket
    pub fn count(&self, bucket: u8) -> u32 {
        self.buckets[bucket as usize]
    }

    /// Number of samples counted, excluding full intensity
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|&c| c as u64).sum()
    }
}

/// One histogram per colour channel (R, G, B)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHistogram {
    channels: [Histogram; 3],
}

impl ChannelHistogram {
    /// Histogram every channel of `pixels`.
    ///
    /// A gray buffer yields three identical channels.
    pub fn from_pixels(pixels: &PixelBuffer) -> Self {
        if pixels.channels() == PixelBuffer::GRAY {
            let gray = Histogram::from_values(pixels.data().iter().copied());
            return Self {
                channels: [gray.clone(), gray.clone(), gray],
            };
        }

        let mut channels = [[0u32; BUCKETS]; 3];
        for px in pixels.data().chunks_exact(3) {
            for (counts, &value) in channels.iter_mut().zip(px) {
                if value != EXCLUDED_INTENSITY {
                    counts[value as usize] += 1;
                }
            }
        }

        Self {
            channels: channels.map(Histogram::from_counts),
        }
    }

    /// Histogram of channel 0 (red), 1 (green) or 2 (blue)
    pub fn channel(&self, index: usize) -> &Histogram {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Histogram; 3] {
        &self.channels
    }
}
