//! # camwatch diagnostics
//!
//! Logging setup and detection loop profiling for camwatch.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod debug_logger;
pub mod loop_profiler;

// Re-export main types
pub use debug_logger::{init_logging, DebugLogger};
pub use loop_profiler::{LoopProfiler, LoopStats, TickOutcome};
