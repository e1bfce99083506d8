//! # Partition Module
//!
//! Splits the all-pairs workload into disjoint shards, one per worker.
//!
//! ## Ordering
//! Images are sorted by (file-name length, file name, full path). Pairs
//! `(i, j)` with `i < j` are numbered lexicographically, and the pair at
//! position `p` belongs to shard `p mod k`. The result is fully determined
//! by the listing and `k`, so reruns see the same shards.
//!
//! Shards never materialize their pairs; each one walks the pair space
//! with a stride of `k`.

use crate::error::SimilarImagesError;
use std::path::{Path, PathBuf};

/// Sort key for one image path
fn listing_key(path: &Path) -> (usize, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (name.chars().count(), name)
}

/// The images of one run in canonical order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageListing {
    images: Vec<PathBuf>,
}

impl ImageListing {
    /// Sort `images` into canonical order, dropping duplicate paths
    pub fn new(mut images: Vec<PathBuf>) -> Self {
        images.sort_by_cached_key(|path| {
            let (length, name) = listing_key(path);
            (length, name, path.clone())
        });
        images.dedup();
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.images.get(index).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.images.iter().map(PathBuf::as_path)
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.images
    }

    /// Number of unordered pairs, n·(n−1)/2
    pub fn total_pairs(&self) -> usize {
        let n = self.images.len();
        n * n.saturating_sub(1) / 2
    }

    /// Paths of a pair produced by a shard of this listing
    pub fn pair_key(&self, pair: IndexPair) -> Option<PairKey<'_>> {
        Some(PairKey {
            first: self.get(pair.first)?,
            second: self.get(pair.second)?,
        })
    }
}

/// Positions of a pair in the listing, `first < second`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexPair {
    pub first: usize,
    pub second: usize,
}

/// A pair of image paths, the earlier one in listing order first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey<'a> {
    pub first: &'a Path,
    pub second: &'a Path,
}

/// Splits the pairs of a listing into `k` shards
#[derive(Debug, Clone, Copy)]
pub struct PairPartitioner {
    shard_count: usize,
}

impl PairPartitioner {
    pub fn new(shard_count: usize) -> Result<Self, SimilarImagesError> {
        if shard_count == 0 {
            return Err(SimilarImagesError::Config(
                "shard count must be at least 1".to_string(),
            ));
        }
        Ok(Self { shard_count })
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// One shard per worker; shards past the pair count are empty
    pub fn partition(&self, listing: &ImageListing) -> Vec<Shard> {
        (0..self.shard_count)
            .map(|index| Shard {
                index,
                shard_count: self.shard_count,
                image_count: listing.len(),
            })
            .collect()
    }
}

/// Every `k`-th pair of the listing, starting at position `index`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    index: usize,
    shard_count: usize,
    image_count: usize,
}

impl Shard {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of pairs this shard yields
    pub fn pair_count(&self) -> usize {
        let n = self.image_count;
        let total = n * n.saturating_sub(1) / 2;
        total.saturating_sub(self.index).div_ceil(self.shard_count)
    }

    /// Lazily enumerate this shard's pairs in position order
    pub fn pairs(&self) -> ShardPairs {
        let n = self.image_count;
        let next = if n < 2 {
            None
        } else {
            advance(n, (0, 1), self.index)
        };
        ShardPairs {
            next,
            image_count: n,
            stride: self.shard_count,
        }
    }
}

/// Move `steps` positions forward in lexicographic pair order
fn advance(n: usize, (mut i, j): (usize, usize), steps: usize) -> Option<(usize, usize)> {
    let mut j = j + steps;
    while j >= n {
        let overflow = j - n;
        i += 1;
        if i + 1 >= n {
            return None;
        }
        j = i + 1 + overflow;
    }
    Some((i, j))
}

/// Iterator over the pairs of one [`Shard`]
#[derive(Debug, Clone)]
pub struct ShardPairs {
    next: Option<(usize, usize)>,
    image_count: usize,
    stride: usize,
}

impl Iterator for ShardPairs {
    type Item = IndexPair;

    fn next(&mut self) -> Option<Self::Item> {
        let (first, second) = self.next?;
        self.next = advance(self.image_count, (first, second), self.stride);
        Some(IndexPair { first, second })
    }
}
