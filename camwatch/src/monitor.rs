//! Monitor lifecycle and builder
//!
//! A [`Monitor`] owns the camera stream while monitoring, drives the
//! [`DetectionLoop`] from a [`RepeatingTask`] and hands the stream to the
//! stream session, if one is attached, so remote viewers see the same camera.

use crate::analysis::{AnalysisPipeline, ImageAnalyzer};
use crate::config::{GeminiConfig, MonitorConfig};
use crate::detection::DetectionLoop;
use crate::event::{DetectionEvent, EventStream, MonitorEvent};
use crate::gemini::GeminiAnalyzer;
use crate::status::{MonitorState, MonitorStatus, StatusBoard};
use crate::CamWatchError;
use camwatch_core::{RepeatingTask, TickControl};
use camwatch_diagnostics::LoopStats;
use camwatch_media::{default_video_source, MediaStream, VideoConstraints, VideoSource};
use camwatch_signaling::StreamSessionManager;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Fluent builder for a [`Monitor`]
pub struct MonitorBuilder {
    config: MonitorConfig,
    source: Option<Arc<dyn VideoSource>>,
    analyzer: Option<Arc<dyn ImageAnalyzer>>,
    gemini: Option<GeminiConfig>,
}

impl MonitorBuilder {
    /// Builder with default configuration
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    /// Start from explicit configuration
    pub fn with_config(config: MonitorConfig) -> Self {
        Self {
            config,
            source: None,
            analyzer: None,
            gemini: None,
        }
    }

    /// Motion score threshold
    pub fn sensitivity(mut self, sensitivity: f64) -> Self {
        self.config.sensitivity = sensitivity;
        self
    }

    /// Minimum time between accepted triggers
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    /// Sampling raster size
    pub fn raster_size(mut self, width: u32, height: u32) -> Self {
        self.config.raster_width = width;
        self.config.raster_height = height;
        self
    }

    /// Detection tick period
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.config.tick_period = period;
        self
    }

    /// Snapshot JPEG quality
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    /// Bound each analysis call
    pub fn analysis_timeout(mut self, timeout: Duration) -> Self {
        self.config.analysis_timeout = Some(timeout);
        self
    }

    /// Capture constraints
    pub fn video_constraints(mut self, constraints: VideoConstraints) -> Self {
        self.config.video = constraints;
        self
    }

    /// Camera backend; defaults to [`default_video_source`]
    pub fn video_source(mut self, source: Arc<dyn VideoSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Image analyzer
    pub fn analyzer(mut self, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Analyze snapshots with Gemini
    pub fn gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = Some(config);
        self
    }

    /// Validate and build the monitor
    pub fn build(self) -> Result<Monitor, CamWatchError> {
        self.config.validate()?;

        let analyzer: Arc<dyn ImageAnalyzer> = match (self.analyzer, self.gemini) {
            (Some(analyzer), _) => analyzer,
            (None, Some(config)) => Arc::new(GeminiAnalyzer::new(config)?),
            (None, None) => {
                return Err(CamWatchError::MissingConfiguration {
                    field: "analyzer".to_string(),
                })
            }
        };
        let source = self.source.unwrap_or_else(default_video_source);

        Monitor::new(self.config, source, analyzer)
    }
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct ActiveRun {
    stream: MediaStream,
    task: RepeatingTask,
}

struct MonitorInner {
    config: MonitorConfig,
    source: Arc<dyn VideoSource>,
    pipeline: AnalysisPipeline,
    detection: Arc<Mutex<DetectionLoop>>,
    status: StatusBoard,
    events: broadcast::Sender<MonitorEvent>,
    session: RwLock<Option<Arc<StreamSessionManager>>>,
    run: Mutex<Option<ActiveRun>>,
}

impl MonitorInner {
    fn stop_run(&self) -> bool {
        let run = self.run.lock().take();
        let stopped = run.is_some();
        if let Some(mut run) = run {
            run.task.cancel();
            self.source.release(&run.stream);
        }
        if let Some(session) = self.session.read().as_ref() {
            session.clear_source();
        }
        stopped
    }
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        self.stop_run();
    }
}

/// Motion monitor: camera, detection loop and analysis
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

impl Monitor {
    /// Create a stopped monitor
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn VideoSource>,
        analyzer: Arc<dyn ImageAnalyzer>,
    ) -> Result<Self, CamWatchError> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let status = StatusBoard::new(events.clone());
        let pipeline = AnalysisPipeline::new(analyzer, events.clone())
            .with_timeout(config.analysis_timeout)
            .with_status(status.clone());
        let detection = DetectionLoop::new(&config, pipeline.clone(), events.clone())?
            .with_status(status.clone());

        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                source,
                pipeline,
                detection: Arc::new(Mutex::new(detection)),
                status,
                events,
                session: RwLock::new(None),
                run: Mutex::new(None),
            }),
        })
    }

    /// Acquire the camera and start the detection loop
    ///
    /// On a permission or device error the monitor returns to `Stopped` and
    /// the error is both broadcast and returned.
    pub async fn start(&self) -> Result<(), CamWatchError> {
        let inner = &self.inner;
        if !inner
            .status
            .transition(MonitorState::Stopped, MonitorState::Starting)
        {
            return Err(CamWatchError::InvalidState {
                expected: MonitorState::Stopped.to_string(),
                actual: inner.status.state().to_string(),
            });
        }
        info!(source = inner.source.name(), "Starting camera");

        let stream = match inner.source.acquire(&inner.config.video).await {
            Ok(stream) => stream,
            Err(e) => {
                let err = CamWatchError::from(e);
                error!(error = %err, "Camera unavailable");
                inner.status.set_state(MonitorState::Stopped);
                let _ = inner.events.send(MonitorEvent::Error {
                    error: err.to_string(),
                    recoverable: false,
                });
                return Err(err);
            }
        };

        if inner.status.state() != MonitorState::Starting {
            info!("Monitoring cancelled while the camera was starting");
            inner.source.release(&stream);
            return Ok(());
        }

        inner.detection.lock().reset();
        let task = match self.spawn_ticks(stream.clone()) {
            Ok(task) => task,
            Err(e) => {
                inner.source.release(&stream);
                inner.status.set_state(MonitorState::Stopped);
                return Err(e);
            }
        };

        {
            // Lock order: session, then run
            let session = inner.session.read();
            *inner.run.lock() = Some(ActiveRun {
                stream: stream.clone(),
                task,
            });
            if let Some(session) = session.as_ref() {
                session.set_source(stream);
            }
        }
        inner.status.set_state(MonitorState::Monitoring);
        Ok(())
    }

    fn spawn_ticks(&self, stream: MediaStream) -> Result<RepeatingTask, CamWatchError> {
        let detection = self.inner.detection.clone();
        let monitor = Arc::downgrade(&self.inner);
        RepeatingTask::spawn("detection", self.inner.config.tick_period, move |now| {
            if !stream.is_active() {
                warn!("Camera stream ended");
                if let Some(inner) = monitor.upgrade() {
                    inner.stop_run();
                    inner.status.set_state(MonitorState::Stopped);
                    let _ = inner.events.send(MonitorEvent::Error {
                        error: "Camera stream ended".to_string(),
                        recoverable: false,
                    });
                }
                return TickControl::Stop;
            }
            let frame = stream.current_frame();
            detection.lock().tick(frame.as_deref(), now);
            TickControl::Continue
        })
    }

    /// Stop the detection loop and release the camera
    ///
    /// Outstanding analyses keep running and still update their events.
    pub fn stop(&self) {
        let stopped = self.inner.stop_run();
        let previous = self.inner.status.set_state(MonitorState::Stopped);
        if stopped || previous != MonitorState::Stopped {
            info!("Monitoring stopped");
        }
    }

    /// Start when stopped, stop otherwise; returns the resulting state
    pub async fn toggle(&self) -> Result<MonitorState, CamWatchError> {
        match self.state() {
            MonitorState::Stopped => self.start().await?,
            _ => self.stop(),
        }
        Ok(self.state())
    }

    /// Share the camera with remote viewers through `session`
    pub fn attach_session(&self, session: Arc<StreamSessionManager>) {
        let mut attached = self.inner.session.write();
        if let Some(run) = self.inner.run.lock().as_ref() {
            session.set_source(run.stream.clone());
        }
        *attached = Some(session);
    }

    /// Stream session, if attached
    pub fn session(&self) -> Option<Arc<StreamSessionManager>> {
        self.inner.session.read().clone()
    }

    /// Lifecycle state
    pub fn state(&self) -> MonitorState {
        self.inner.status.state()
    }

    /// User-facing status
    pub fn status(&self) -> MonitorStatus {
        self.inner.status.status()
    }

    /// Subscribe to status changes
    pub fn watch_status(&self) -> watch::Receiver<MonitorStatus> {
        self.inner.status.subscribe()
    }

    /// Subscribe to monitor notifications
    pub fn events(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    /// Detection events, newest first
    pub fn detection_events(&self) -> Vec<DetectionEvent> {
        self.inner.pipeline.events()
    }

    /// Analysis pipeline
    pub fn pipeline(&self) -> &AnalysisPipeline {
        &self.inner.pipeline
    }

    /// Camera stream while monitoring
    pub fn stream(&self) -> Option<MediaStream> {
        self.inner.run.lock().as_ref().map(|run| run.stream.clone())
    }

    /// Detection loop statistics for the current run
    pub fn stats(&self) -> LoopStats {
        self.inner.detection.lock().stats().clone()
    }

    /// Configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub(crate) fn notify(&self, event: MonitorEvent) {
        let _ = self.inner.events.send(event);
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("source", &self.inner.source.name())
            .field("state", &self.state())
            .field("status", &self.status())
            .finish()
    }
}
