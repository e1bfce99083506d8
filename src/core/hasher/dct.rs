//! Two-dimensional discrete cosine transform for pHash.
//!
//! Orthonormal DCT-II, applied to rows and then to columns with a
//! precomputed cosine table. Plain f64 arithmetic in a fixed order, so the
//! coefficients are reproducible run to run.

use std::f64::consts::PI;

/// Square DCT-II of a fixed size
#[derive(Debug, Clone)]
pub struct Dct2d {
    size: usize,
    /// `table[u * size + x] = c(u) * cos((2x + 1) * u * PI / 2N)`
    table: Vec<f64>,
}

impl Dct2d {
    /// Build the transform for `size` x `size` inputs
    pub fn new(size: usize) -> Self {
        let n = size as f64;
        let mut table = Vec::with_capacity(size * size);

        for u in 0..size {
            let scale = if u == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };
            for x in 0..size {
                let angle = (2 * x + 1) as f64 * u as f64 * PI / (2.0 * n);
                table.push(scale * angle.cos());
            }
        }

        Self { size, table }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Transform a row-major `size * size` matrix.
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        let size = self.size;
        debug_assert_eq!(input.len(), size * size);

        // Rows
        let mut rows = vec![0.0; size * size];
        for y in 0..size {
            let row = &input[y * size..(y + 1) * size];
            for u in 0..size {
                let basis = &self.table[u * size..(u + 1) * size];
                rows[y * size + u] = row.iter().zip(basis).map(|(p, c)| p * c).sum();
            }
        }

        // Columns
        let mut output = vec![0.0; size * size];
        for x in 0..size {
            for v in 0..size {
                let basis = &self.table[v * size..(v + 1) * size];
                output[v * size + x] = (0..size).map(|y| rows[y * size + x] * basis[y]).sum();
            }
        }

        output
    }
}
