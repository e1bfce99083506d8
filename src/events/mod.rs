//! # Events Module
//!
//! Progress reporting for the comparison pipeline.
//!
//! ## Design
//! The pipeline emits events through a channel so the CLI can draw a
//! progress bar without the core knowing anything about terminals.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Compare(CompareEvent::Progress(p)) = event {
//!             println!("{}/{} pairs", p.pairs_completed, p.total_pairs);
//!         }
//!     }
//! });
//!
//! pipeline.find_duplicates_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
