//! Detection loop
//!
//! One [`DetectionLoop::tick`] per refresh: sample the current frame, score it
//! against the previous sample, and hand triggering frames to the analysis
//! pipeline when the cooldown allows. A tick never waits on anything.

use crate::analysis::AnalysisPipeline;
use crate::config::MonitorConfig;
use crate::cooldown::CooldownGate;
use crate::event::{EventId, MonitorEvent};
use crate::status::StatusBoard;
use crate::CamWatchError;
use camwatch_diagnostics::{LoopProfiler, LoopStats, TickOutcome};
use camwatch_media::{FrameDiffer, MediaError, StillEncoder, VideoFrame};
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickResult {
    /// No usable frame
    Skipped,
    /// First frame since start or reset; nothing to compare against
    Primed,
    /// Score at or below the sensitivity threshold
    Quiet {
        /// Motion score
        score: f64,
    },
    /// Above the threshold but inside the cooldown window
    Suppressed {
        /// Motion score
        score: f64,
    },
    /// Accepted trigger; `event_id` is `None` if the frame could not be encoded
    Triggered {
        /// Motion score
        score: f64,
        /// Detection event created for the frame
        event_id: Option<EventId>,
    },
}

impl TickResult {
    /// Whether the tick accepted a trigger
    pub fn is_trigger(&self) -> bool {
        matches!(self, TickResult::Triggered { .. })
    }
}

/// Frame differencing, cooldown gating and snapshot submission
#[derive(Debug)]
pub struct DetectionLoop {
    differ: FrameDiffer,
    gate: CooldownGate,
    sensitivity: f64,
    encoder: StillEncoder,
    pipeline: AnalysisPipeline,
    profiler: LoopProfiler,
    events: broadcast::Sender<MonitorEvent>,
    status: Option<StatusBoard>,
}

impl DetectionLoop {
    /// Create a loop feeding `pipeline`
    pub fn new(
        config: &MonitorConfig,
        pipeline: AnalysisPipeline,
        events: broadcast::Sender<MonitorEvent>,
    ) -> Result<Self, CamWatchError> {
        config.validate()?;
        let encoder = StillEncoder::new(config.jpeg_quality)?;
        Ok(Self {
            differ: FrameDiffer::new(config.raster_width, config.raster_height),
            gate: CooldownGate::new(config.cooldown),
            sensitivity: config.sensitivity,
            encoder,
            pipeline,
            profiler: LoopProfiler::new(config.tick_period),
            events,
            status: None,
        })
    }

    /// Annotate `status` on triggers
    pub fn with_status(mut self, status: StatusBoard) -> Self {
        self.status = Some(status);
        self
    }

    /// Forget the previous frame, the last trigger and the statistics
    pub fn reset(&mut self) {
        self.differ.reset();
        self.gate.reset();
        self.profiler.reset();
    }

    /// Process one frame observed at `now`
    pub fn tick(&mut self, frame: Option<&VideoFrame>, now: Instant) -> TickResult {
        let started = Instant::now();
        let result = self.evaluate(frame, now);
        self.profiler.record_tick(started.elapsed(), outcome(&result));
        result
    }

    fn evaluate(&mut self, frame: Option<&VideoFrame>, now: Instant) -> TickResult {
        let Some(frame) = frame else {
            return TickResult::Skipped;
        };

        let score = match self.differ.observe(frame) {
            Ok(Some(score)) => score,
            Ok(None) => return TickResult::Primed,
            Err(e) => {
                warn!(error = %e, "Frame could not be sampled");
                return TickResult::Skipped;
            }
        };

        if score <= self.sensitivity {
            return TickResult::Quiet { score };
        }
        if !self.gate.try_trigger(now) {
            return TickResult::Suppressed { score };
        }

        debug!(score, threshold = self.sensitivity, "Motion detected");
        let _ = self.events.send(MonitorEvent::MotionDetected { score });
        if let Some(status) = &self.status {
            status.motion_detected();
        }

        let event_id = match self.encoder.encode(frame) {
            Ok(image) => {
                let id = self.pipeline.submit(image);
                if let Some(status) = &self.status {
                    status.analyzing();
                }
                Some(id)
            }
            Err(e) => {
                self.snapshot_failed(e);
                None
            }
        };

        TickResult::Triggered { score, event_id }
    }

    // No event exists to settle the motion annotation
    fn snapshot_failed(&mut self, error: MediaError) {
        warn!(error = %error, "Snapshot encoding failed");
        self.profiler.record_encode_failure();
        let _ = self.events.send(MonitorEvent::Error {
            error: error.to_string(),
            recoverable: true,
        });
        if let Some(status) = &self.status {
            match self.pipeline.outstanding() {
                0 => status.analyses_settled(0),
                _ => status.analyzing(),
            }
        }
    }

    /// Loop statistics since the last reset
    pub fn stats(&self) -> &LoopStats {
        self.profiler.stats()
    }

    /// Sensitivity threshold
    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    /// Pipeline receiving snapshots
    pub fn pipeline(&self) -> &AnalysisPipeline {
        &self.pipeline
    }
}

fn outcome(result: &TickResult) -> TickOutcome {
    match *result {
        TickResult::Skipped => TickOutcome::Skipped,
        TickResult::Primed => TickOutcome::Primed,
        TickResult::Quiet { score } => TickOutcome::Scored { score },
        TickResult::Suppressed { score } => TickOutcome::Suppressed { score },
        TickResult::Triggered { score, .. } => TickOutcome::Triggered { score },
    }
}
