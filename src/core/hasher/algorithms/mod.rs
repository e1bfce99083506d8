//! Hash algorithm implementations.

mod average;
mod difference;
mod perceptual;

pub use average::{AverageHasher, AVERAGE_GRID};
pub use difference::{DifferenceHasher, DIFFERENCE_GRID};
pub use perceptual::{PerceptualHasher, DCT_SIZE, LOW_FREQUENCY_BLOCK};
