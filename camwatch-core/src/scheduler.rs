//! Cancellable repeating task
//!
//! Drives per-frame work at a fixed period on the tokio runtime. Each tick runs
//! to completion before the next one is scheduled, and cancellation takes effect
//! before the next tick even if the runtime has not yet observed the abort.

use crate::error::CamWatchError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Returned by a tick closure to keep or end the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// Schedule the next tick
    Continue,
    /// End the task after this tick
    Stop,
}

/// A periodic task with synchronous cancellation
#[derive(Debug)]
pub struct RepeatingTask {
    name: String,
    period: Duration,
    cancelled: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl RepeatingTask {
    /// Spawn `tick` every `period` on the current tokio runtime.
    ///
    /// The closure receives the scheduled instant of the tick. Missed ticks are
    /// skipped rather than bursted.
    pub fn spawn<F>(name: &str, period: Duration, mut tick: F) -> Result<Self, CamWatchError>
    where
        F: FnMut(Instant) -> TickControl + Send + 'static,
    {
        if period.is_zero() {
            return Err(CamWatchError::InvalidConfiguration {
                field: "period".to_string(),
                reason: "tick period must be non-zero".to_string(),
            });
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            CamWatchError::Initialization {
                reason: format!("no async runtime for task {}: {}", name, e),
            }
        })?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));
        let flag = cancelled.clone();
        let counter = ticks.clone();
        let task_name = name.to_string();

        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                let scheduled = interval.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }

                counter.fetch_add(1, Ordering::Relaxed);
                if tick(scheduled.into_std()) == TickControl::Stop {
                    debug!(task = %task_name, "Repeating task stopped itself");
                    flag.store(true, Ordering::Release);
                    break;
                }
            }
        });

        info!(task = name, ?period, "Repeating task started");

        Ok(Self {
            name: name.to_string(),
            period,
            cancelled,
            ticks,
            handle: Some(handle),
        })
    }

    /// Cancel the next scheduled tick and abort the task
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!(task = %self.name, ticks = self.tick_count(), "Repeating task cancelled");
        }
    }

    /// Whether further ticks may still run
    pub fn is_running(&self) -> bool {
        !self.cancelled.load(Ordering::Acquire)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Number of ticks executed so far
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Task name used in logs
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
