//! # Comparator Module
//!
//! Scores image pairs and decides whether they are similar.
//!
//! ## How It Works
//! 1. Hamming distance between the two dHash fingerprints
//! 2. The cascade policy settles clear cases from the distance alone
//! 3. Borderline pairs are confirmed with histogram similarity of the
//!    full-resolution blue channel (the `grayscale` score)
//!
//! ## Cascade Thresholds
//! | dHash distance | Grayscale needed | Verdict      |
//! |----------------|------------------|--------------|
//! | 0              | -                | Identical    |
//! | 1-10           | > 0.5            | Near match   |
//! | 11-20          | > 0.825          | Far match    |
//! | 21+            | -                | Too distant  |

mod traits;

pub use traits::{
    CascadePolicy, CascadeThresholds, SimilarityPolicy, Verdict, FAR_GRAYSCALE,
    IDENTICAL_DISTANCE, MAX_DISTANCE, NEAR_DISTANCE, NEAR_GRAYSCALE,
};

use crate::core::cache::CachedImage;
use crate::core::hasher::{BitHash, ChannelHistogram, HashEngine, Histogram, BUCKETS};
use crate::error::{CompareError, SimilarImagesError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hamming distance between two fingerprints of the same algorithm and length
pub fn hamming_distance(a: &BitHash, b: &BitHash) -> Result<u32, CompareError> {
    a.distance(b)
}

/// Round to the two decimals the cascade thresholds are expressed in
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn bucket_overlap(a: &Histogram, b: &Histogram) -> f64 {
    let total: f64 = a
        .buckets()
        .iter()
        .zip(b.buckets())
        .map(|(&c1, &c2)| {
            if c1 == c2 {
                1.0
            } else {
                1.0 - c1.abs_diff(c2) as f64 / c1.max(c2) as f64
            }
        })
        .sum();
    total / BUCKETS as f64
}

/// Histogram overlap in `[0, 1]`, 1 meaning identical histograms.
///
/// Every bucket scores 1 when both counts are equal (including both empty),
/// otherwise `1 - |c1 - c2| / max(c1, c2)`; the result is the mean over all
/// buckets rounded to two decimals.
pub fn grayscale_similarity(a: &Histogram, b: &Histogram) -> f64 {
    round2(bucket_overlap(a, b))
}

/// Mean [`grayscale_similarity`] over the three colour channels, rounded to two decimals
pub fn histogram_similarity(a: &ChannelHistogram, b: &ChannelHistogram) -> f64 {
    let sum: f64 = a
        .channels()
        .iter()
        .zip(b.channels())
        .map(|(ca, cb)| grayscale_similarity(ca, cb))
        .sum();
    round2(sum / 3.0)
}

/// Every signal computed for one pair, as written to the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRecord {
    /// File name of the first image (earlier in listing order)
    pub img1: String,
    /// File name of the second image
    pub img2: String,
    #[serde(rename = "aHash")]
    pub ahash: u32,
    #[serde(rename = "dHash")]
    pub dhash: u32,
    #[serde(rename = "pHash")]
    pub phash: u32,
    pub grayscale: f64,
    pub histogram: f64,
    /// Cascade verdict for the pair
    pub similar: bool,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Compares two cached images with a [`HashEngine`] and a [`SimilarityPolicy`].
pub struct Comparator {
    engine: HashEngine,
    policy: Box<dyn SimilarityPolicy>,
}

impl Comparator {
    pub fn new(engine: HashEngine, policy: Box<dyn SimilarityPolicy>) -> Self {
        Self { engine, policy }
    }

    /// Comparator with the default cascade thresholds
    pub fn with_thresholds(thresholds: CascadeThresholds) -> Self {
        Self::new(HashEngine::new(), Box::new(CascadePolicy::new(thresholds)))
    }

    pub fn engine(&self) -> &HashEngine {
        &self.engine
    }

    pub fn policy(&self) -> &dyn SimilarityPolicy {
        self.policy.as_ref()
    }

    fn dhash_distance(&self, a: &CachedImage, b: &CachedImage) -> Result<u32, SimilarImagesError> {
        let left = a.difference_hash(&self.engine)?;
        let right = b.difference_hash(&self.engine)?;
        Ok(hamming_distance(left, right)?)
    }

    fn grayscale(&self, a: &CachedImage, b: &CachedImage) -> f64 {
        grayscale_similarity(
            a.cascade_histogram(&self.engine),
            b.cascade_histogram(&self.engine),
        )
    }

    /// Run the cascade for a pair, computing only what the cascade needs
    pub fn verdict(&self, a: &CachedImage, b: &CachedImage) -> Result<Verdict, SimilarImagesError> {
        let distance = self.dhash_distance(a, b)?;
        Ok(self.policy.decide(distance, &|| self.grayscale(a, b)))
    }

    /// Compute every signal for a pair.
    ///
    /// A dHash distance of 0 short-circuits to a perfect record without
    /// hashing or histogramming anything else.
    pub fn record(&self, a: &CachedImage, b: &CachedImage) -> Result<SimilarityRecord, SimilarImagesError> {
        let img1 = file_name(a.path());
        let img2 = file_name(b.path());
        let dhash = self.dhash_distance(a, b)?;

        if dhash == 0 {
            return Ok(SimilarityRecord {
                img1,
                img2,
                ahash: 0,
                dhash: 0,
                phash: 0,
                grayscale: 1.0,
                histogram: 1.0,
                similar: self.policy.decide(0, &|| 1.0).is_similar(),
            });
        }

        let ahash = hamming_distance(a.average_hash(&self.engine)?, b.average_hash(&self.engine)?)?;
        let phash = hamming_distance(
            a.perceptual_hash(&self.engine)?,
            b.perceptual_hash(&self.engine)?,
        )?;
        let grayscale = self.grayscale(a, b);
        let histogram = histogram_similarity(
            a.canvas_histogram(&self.engine)?,
            b.canvas_histogram(&self.engine)?,
        );
        let similar = self.policy.decide(dhash, &|| grayscale).is_similar();

        Ok(SimilarityRecord {
            img1,
            img2,
            ahash,
            dhash,
            phash,
            grayscale,
            histogram,
            similar,
        })
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::with_thresholds(CascadeThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::{HashAlgorithmKind, PixelBuffer};
    use std::path::PathBuf;

    fn histogram(counts: &[(u8, u32)]) -> Histogram {
        let mut buckets = [0u32; BUCKETS];
        for &(bucket, count) in counts {
            buckets[bucket as usize] = count;
        }
        Histogram::from_counts(buckets)
    }

    fn image(name: &str, pixels: PixelBuffer) -> CachedImage {
        CachedImage::new(PathBuf::from("/photos").join(name), pixels)
    }

    fn gradient(width: u32, height: u32, reverse: bool) -> PixelBuffer {
        let mut data = Vec::with_capacity((width * height) as usize);
        for _ in 0..height {
            for x in 0..width {
                let v = (x * 255 / (width - 1)) as u8;
                data.push(if reverse { 255 - v } else { v });
            }
        }
        PixelBuffer::new(width, height, PixelBuffer::GRAY, data).unwrap()
    }

    /// Blue ramp across the width; red and green are the ramp divided by `rg_divisor`
    fn blue_ramp(rg_divisor: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity(256 * 16 * 3);
        for _ in 0..16 {
            for x in 0..256u32 {
                let rg = (x / rg_divisor) as u8;
                data.extend_from_slice(&[rg, rg, x as u8]);
            }
        }
        PixelBuffer::new(256, 16, PixelBuffer::RGB, data).unwrap()
    }

    #[test]
    fn cascade_confirms_with_blue_channel() {
        let comparator = Comparator::default();
        let a = image("a.png", blue_ramp(1));
        let b = image("b.png", blue_ramp(2));

        // Luma histograms of the two images barely overlap
        let luma = |pixels: &PixelBuffer| {
            Histogram::from_values(
                pixels
                    .data()
                    .chunks_exact(3)
                    .map(|px| crate::core::hasher::pixels::luma(px[0], px[1], px[2])),
            )
        };
        assert!(grayscale_similarity(&luma(a.pixels()), &luma(b.pixels())) < 0.5);

        assert_eq!(comparator.grayscale(&a, &b), 1.0);
        assert!(matches!(
            comparator.policy().decide(5, &|| comparator.grayscale(&a, &b)),
            Verdict::NearMatch { .. }
        ));
    }

    #[test]
    fn hamming_distance_is_symmetric_with_zero_identity() {
        let a = BitHash::from_bytes(&[0b1010_1010], 8, HashAlgorithmKind::Difference);
        let b = BitHash::from_bytes(&[0b0110_1001], 8, HashAlgorithmKind::Difference);

        assert_eq!(hamming_distance(&a, &a).unwrap(), 0);
        assert_eq!(hamming_distance(&a, &b).unwrap(), hamming_distance(&b, &a).unwrap());
        assert_eq!(hamming_distance(&a, &b).unwrap(), 4);
    }

    #[test]
    fn hamming_distance_stays_within_length() {
        let a = BitHash::from_bits([true; 56], HashAlgorithmKind::Difference);
        let b = BitHash::from_bits([false; 56], HashAlgorithmKind::Difference);
        assert_eq!(hamming_distance(&a, &b).unwrap(), 56);
    }

    #[test]
    fn grayscale_similarity_of_identical_histograms_is_one() {
        let h = histogram(&[(0, 10), (128, 5), (255, 1)]);
        assert_eq!(grayscale_similarity(&h, &h), 1.0);
    }

    #[test]
    fn grayscale_similarity_scores_partial_buckets() {
        let a = histogram(&[(0, 100)]);
        let b = histogram(&[(0, 50)]);
        // 255 empty buckets match, bucket 0 scores 0.5
        let expected = (255.0 + 0.5) / 256.0;
        assert_eq!(grayscale_similarity(&a, &b), round2(expected));
    }

    #[test]
    fn grayscale_similarity_is_rounded() {
        let a = histogram(&[(0, 3), (1, 3), (2, 3)]);
        let b = histogram(&[(0, 1), (1, 1), (2, 1)]);
        let value = grayscale_similarity(&a, &b);
        assert_eq!(value, (value * 100.0).round() / 100.0);
    }

    #[test]
    fn histogram_similarity_averages_channels() {
        let pixels = PixelBuffer::new(2, 1, PixelBuffer::RGB, vec![0, 0, 0, 255, 255, 255]).unwrap();
        let h = ChannelHistogram::from_pixels(&pixels);
        assert_eq!(histogram_similarity(&h, &h), 1.0);
    }

    #[test]
    fn identical_images_short_circuit() {
        let comparator = Comparator::default();
        let a = image("a.png", gradient(32, 32, false));
        let b = image("b.png", gradient(32, 32, false));

        let verdict = comparator.verdict(&a, &b).unwrap();
        assert_eq!(verdict, Verdict::Identical { distance: 0 });

        let record = comparator.record(&a, &b).unwrap();
        assert_eq!(record.img1, "a.png");
        assert_eq!(record.img2, "b.png");
        assert_eq!((record.ahash, record.dhash, record.phash), (0, 0, 0));
        assert_eq!((record.grayscale, record.histogram), (1.0, 1.0));
        assert!(record.similar);
    }

    #[test]
    fn opposite_gradients_are_too_distant() {
        let comparator = Comparator::default();
        let a = image("a.png", gradient(32, 32, false));
        let b = image("b.png", gradient(32, 32, true));

        assert_eq!(
            comparator.verdict(&a, &b).unwrap(),
            Verdict::TooDistant { distance: 56 }
        );

        let record = comparator.record(&a, &b).unwrap();
        assert_eq!(record.dhash, 56);
        assert!(!record.similar);
        assert!((0.0..=1.0).contains(&record.grayscale));
        assert!((0.0..=1.0).contains(&record.histogram));
    }

    #[test]
    fn record_serializes_with_column_names() {
        let record = SimilarityRecord {
            img1: "1.jpg".to_string(),
            img2: "10.jpg".to_string(),
            ahash: 3,
            dhash: 4,
            phash: 5,
            grayscale: 0.9,
            histogram: 0.8,
            similar: true,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"aHash\":3"));
        assert!(json.contains("\"dHash\":4"));
        assert!(json.contains("\"pHash\":5"));
    }
}
