//! # camwatch core
//!
//! Foundational types shared by every camwatch crate: the top-level error
//! taxonomy and the cancellable repeating task that drives per-frame work.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod scheduler;

// Re-export main types
pub use error::CamWatchError;
pub use scheduler::{RepeatingTask, TickControl};
