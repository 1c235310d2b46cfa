//! Configuration types and defaults

use crate::CamWatchError;
use camwatch_media::{
    VideoConstraints, DEFAULT_JPEG_QUALITY, DEFAULT_RASTER_HEIGHT, DEFAULT_RASTER_WIDTH,
};
use std::time::Duration;

/// Motion score above which a frame counts as motion
pub const DEFAULT_SENSITIVITY: f64 = 50.0;

/// Minimum time between two accepted motion triggers
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Detection tick period, roughly one display refresh
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(16);

/// Default Gemini model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default Generative Language API endpoint
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Global camwatch configuration
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Enable debug logging
    pub debug_logging: bool,
    /// Install the tracing subscriber on init
    pub install_logger: bool,
    /// Page URL share links are built from
    pub share_base_url: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            install_logger: false,
            share_base_url: None,
        }
    }
}

impl GlobalConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), CamWatchError> {
        if let Some(base) = &self.share_base_url {
            url::Url::parse(base).map_err(|e| CamWatchError::InvalidUrl {
                url: base.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Detection loop and analysis configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Motion score threshold; a tick triggers when the score is strictly above it
    pub sensitivity: f64,
    /// Cooldown between accepted triggers
    pub cooldown: Duration,
    /// Width of the sampling raster
    pub raster_width: u32,
    /// Height of the sampling raster
    pub raster_height: u32,
    /// Detection tick period
    pub tick_period: Duration,
    /// JPEG quality for snapshots sent to analysis
    pub jpeg_quality: u8,
    /// Per-call analysis timeout; unbounded when `None`
    pub analysis_timeout: Option<Duration>,
    /// Capture constraints passed to the video source
    pub video: VideoConstraints,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            cooldown: DEFAULT_COOLDOWN,
            raster_width: DEFAULT_RASTER_WIDTH,
            raster_height: DEFAULT_RASTER_HEIGHT,
            tick_period: DEFAULT_TICK_PERIOD,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            analysis_timeout: None,
            video: VideoConstraints::default(),
        }
    }
}

impl MonitorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), CamWatchError> {
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(invalid("sensitivity", "must be a non-negative number"));
        }
        if self.raster_width == 0 || self.raster_height == 0 {
            return Err(invalid("raster_size", "width and height must be non-zero"));
        }
        if self.tick_period.is_zero() {
            return Err(invalid("tick_period", "must be non-zero"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(invalid("jpeg_quality", "must be in 1..=100"));
        }
        if self.analysis_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(invalid("analysis_timeout", "must be non-zero when set"));
        }
        self.video
            .validate()
            .map_err(|e| invalid("video", &e.to_string()))?;
        Ok(())
    }
}

/// Gemini image analysis configuration
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,
    /// Model name
    pub model: String,
    /// API base URL, without a trailing path
    pub base_url: String,
}

impl GeminiConfig {
    /// Configuration with the default model and endpoint
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    /// Read `GEMINI_API_KEY`, and optionally `GEMINI_MODEL` and `GEMINI_BASE_URL`
    pub fn from_env() -> Result<Self, CamWatchError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CamWatchError::MissingConfiguration {
                field: "GEMINI_API_KEY".to_string(),
            })?;

        let mut config = Self::new(&api_key);
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.model = model;
        }
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), CamWatchError> {
        if self.api_key.trim().is_empty() {
            return Err(CamWatchError::MissingConfiguration {
                field: "api_key".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(invalid("model", "must not be empty"));
        }
        url::Url::parse(&self.base_url).map_err(|e| CamWatchError::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn invalid(field: &str, reason: &str) -> CamWatchError {
    CamWatchError::InvalidConfiguration {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
