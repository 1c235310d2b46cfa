//! Detection loop profiling
//!
//! Counts what every tick of the detection loop did and how long it took
//! against the tick period. A tick that runs longer than its period delays the
//! next one, so those are counted as deadline misses.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a single detection tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// First frame after start; no previous raster to compare against
    Primed,
    /// No frame available or the frame could not be sampled
    Skipped,
    /// Scored below the sensitivity threshold
    Scored {
        /// Motion score
        score: f64,
    },
    /// Scored above the threshold and the cooldown permitted a trigger
    Triggered {
        /// Motion score
        score: f64,
    },
    /// Scored above the threshold but the cooldown denied the trigger
    Suppressed {
        /// Motion score
        score: f64,
    },
}

impl TickOutcome {
    /// Motion score, if one was computed
    pub fn score(&self) -> Option<f64> {
        match self {
            TickOutcome::Scored { score }
            | TickOutcome::Triggered { score }
            | TickOutcome::Suppressed { score } => Some(*score),
            TickOutcome::Primed | TickOutcome::Skipped => None,
        }
    }
}

/// Snapshot of detection loop statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopStats {
    /// Ticks recorded
    pub ticks: u64,
    /// Ticks that only primed the differ
    pub primed_ticks: u64,
    /// Ticks without a usable frame
    pub skipped_ticks: u64,
    /// Ticks that produced a score
    pub scored_ticks: u64,
    /// Triggers handed to analysis
    pub triggers: u64,
    /// Above-threshold scores denied by the cooldown
    pub suppressed_triggers: u64,
    /// Triggering frames that could not be encoded
    pub encode_failures: u64,
    /// Ticks that took longer than the tick period
    pub deadline_misses: u64,
    /// Longest tick
    pub worst_tick: Duration,
    /// Most recent motion score
    pub last_score: Option<f64>,
    /// Highest motion score seen
    pub peak_score: f64,
}

impl LoopStats {
    /// Serialize the snapshot as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Accumulates [`LoopStats`] for a detection loop
#[derive(Debug, Clone)]
pub struct LoopProfiler {
    budget: Duration,
    stats: LoopStats,
}

impl LoopProfiler {
    /// Create a profiler for a loop ticking every `budget`
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            stats: LoopStats::default(),
        }
    }

    /// Tick period ticks are measured against
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Record one tick
    pub fn record_tick(&mut self, elapsed: Duration, outcome: TickOutcome) {
        let stats = &mut self.stats;
        stats.ticks += 1;

        if elapsed > self.budget {
            stats.deadline_misses += 1;
            tracing::trace!(elapsed_us = elapsed.as_micros() as u64, "Tick overran its period");
        }
        if elapsed > stats.worst_tick {
            stats.worst_tick = elapsed;
        }

        match outcome {
            TickOutcome::Primed => stats.primed_ticks += 1,
            TickOutcome::Skipped => stats.skipped_ticks += 1,
            TickOutcome::Scored { .. } => stats.scored_ticks += 1,
            TickOutcome::Triggered { .. } => {
                stats.scored_ticks += 1;
                stats.triggers += 1;
            }
            TickOutcome::Suppressed { .. } => {
                stats.scored_ticks += 1;
                stats.suppressed_triggers += 1;
            }
        }

        if let Some(score) = outcome.score() {
            stats.last_score = Some(score);
            if score > stats.peak_score {
                stats.peak_score = score;
            }
        }
    }

    /// Record a triggering frame that failed to encode
    pub fn record_encode_failure(&mut self) {
        self.stats.encode_failures += 1;
    }

    /// Current statistics
    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Clear all statistics
    pub fn reset(&mut self) {
        self.stats = LoopStats::default();
    }
}

impl Default for LoopProfiler {
    fn default() -> Self {
        Self::new(Duration::from_millis(16))
    }
}
