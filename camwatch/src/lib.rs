//! # camwatch - Security Camera Client
//!
//! camwatch watches a camera for motion, asks an image-description service
//! what triggered it and lets a remote viewer watch the live stream
//! peer-to-peer.
//!
//! ## Key Features
//!
//! - **Frame differencing**: mean per-pixel colour delta on a fixed-size raster
//! - **Cooldown gating**: at most one analysis per cooldown window
//! - **Non-blocking analysis**: events are logged at once and resolved later
//! - **Remote viewing**: viewers who call before the camera is ready are
//!   answered as soon as it is
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use camwatch::{CamWatch, GeminiConfig, LoopbackHub};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), camwatch::CamWatchError> {
//!     let camwatch = CamWatch::init()?;
//!
//!     let monitor = camwatch
//!         .monitor()
//!         .sensitivity(50.0)
//!         .gemini(GeminiConfig::from_env()?)
//!         .build()?;
//!
//!     let hub = LoopbackHub::new();
//!     let host = camwatch.host(monitor, Arc::new(hub.transport())).await;
//!     host.monitor().start().await?;
//!
//!     let mut events = host.monitor().events();
//!     while let Some(event) = events.next().await {
//!         println!("{}: {:?}", event.event_type(), event);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use camwatch_core::{CamWatchError, RepeatingTask, TickControl};

pub use camwatch_media::{
    EncodedImage, FrameDiffer, MediaError, MediaStream, PushVideoSource, RasterBuffer,
    SyntheticVideoSource, VideoConstraints, VideoFrame, VideoPixelFormat, VideoResolution,
    VideoSource,
};

pub use camwatch_signaling::{
    LoopbackHub, LoopbackTransport, PeerId, SignalingError, SignalingTransport,
    StreamSessionManager, Viewer, ViewerError, ViewerState,
};

pub use camwatch_diagnostics::{init_logging, LoopStats};

// Public API modules
pub mod analysis;
pub mod config;
pub mod cooldown;
pub mod detection;
pub mod event;
pub mod gemini;
pub mod host;
pub mod monitor;
pub mod router;
pub mod status;

// Re-export main API types
pub use analysis::{AnalysisError, AnalysisPipeline, ImageAnalyzer};
pub use config::{GeminiConfig, GlobalConfig, MonitorConfig};
pub use cooldown::CooldownGate;
pub use detection::{DetectionLoop, TickResult};
pub use event::{DetectionEvent, EventId, EventLog, EventStream, MonitorEvent};
pub use gemini::GeminiAnalyzer;
pub use host::HostSession;
pub use monitor::{Monitor, MonitorBuilder};
pub use router::{AppMode, ViewRouter};
pub use status::{MonitorState, MonitorStatus};

use std::sync::Arc;
use tracing::warn;

/// What [`CamWatch::launch`] started
#[derive(Debug)]
pub enum Launched {
    /// Camera host
    Host(HostSession),
    /// Remote viewer
    Viewer(Viewer),
}

/// Main entry point for camwatch
#[derive(Debug, Clone)]
pub struct CamWatch {
    inner: Arc<CamWatchInner>,
}

#[derive(Debug)]
struct CamWatchInner {
    config: GlobalConfig,
}

impl CamWatch {
    /// Initialize camwatch with default settings
    ///
    /// # Example
    /// ```rust,no_run
    /// use camwatch::CamWatch;
    ///
    /// let camwatch = CamWatch::init()?;
    /// # Ok::<(), camwatch::CamWatchError>(())
    /// ```
    pub fn init() -> Result<Self, CamWatchError> {
        Self::init_with(GlobalConfig::default())
    }

    /// Initialize with custom global configuration
    pub fn init_with(config: GlobalConfig) -> Result<Self, CamWatchError> {
        config.validate()?;

        if config.install_logger {
            if let Err(e) = init_logging(config.debug_logging) {
                warn!(error = %e, "Keeping the existing log subscriber");
            }
        }

        Ok(Self {
            inner: Arc::new(CamWatchInner { config }),
        })
    }

    /// Global configuration
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }

    /// Create a monitor builder
    ///
    /// # Example
    /// ```rust,no_run
    /// use camwatch::{CamWatch, GeminiConfig};
    /// use std::time::Duration;
    ///
    /// # fn example() -> Result<(), camwatch::CamWatchError> {
    /// let monitor = CamWatch::init()?
    ///     .monitor()
    ///     .cooldown(Duration::from_secs(10))
    ///     .gemini(GeminiConfig::from_env()?)
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn monitor(&self) -> MonitorBuilder {
        MonitorBuilder::new()
    }

    /// Decide from the page URL whether to host or view
    pub fn route(&self, url: &str) -> Result<AppMode, CamWatchError> {
        ViewRouter::route(url)
    }

    /// Run `monitor` as a camera host reachable through `transport`
    ///
    /// Signaling failures are recorded on the returned session rather than
    /// returned; monitoring works regardless.
    pub async fn host(
        &self,
        monitor: Monitor,
        transport: Arc<dyn SignalingTransport>,
    ) -> HostSession {
        HostSession::open(
            monitor,
            transport,
            self.inner.config.share_base_url.as_deref(),
        )
        .await
    }

    /// Watch the camera `remote_id`
    pub async fn view(
        &self,
        transport: Arc<dyn SignalingTransport>,
        remote_id: Option<&str>,
    ) -> Viewer {
        Viewer::connect(transport, remote_id).await
    }

    /// Route `url` and start either a host built from `monitor` or a viewer
    pub async fn launch(
        &self,
        url: &str,
        transport: Arc<dyn SignalingTransport>,
        monitor: MonitorBuilder,
    ) -> Result<Launched, CamWatchError> {
        match self.route(url)? {
            AppMode::Host => {
                let monitor = monitor.build()?;
                Ok(Launched::Host(self.host(monitor, transport).await))
            }
            AppMode::Viewer { remote_id } => Ok(Launched::Viewer(
                self.view(transport, remote_id.as_deref()).await,
            )),
        }
    }
}
