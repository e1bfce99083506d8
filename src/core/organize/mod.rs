//! Duplicate relocation.
//!
//! Moves every image of a duplicate set into one target folder so the user
//! can decide which copies to keep.

mod mover;

pub use mover::{DuplicateMover, MoveReport};
