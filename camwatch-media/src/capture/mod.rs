//! Video source capability
//!
//! A [`VideoSource`] hands out a live [`MediaStream`] once camera access is
//! granted and takes it back on release. Backends:
//!
//! - [`SyntheticVideoSource`]: generated test pattern, no hardware needed
//! - [`PushVideoSource`]: frames pushed by the caller (external decoders, tests)
//! - `NativeVideoSource`: platform camera through nokhwa (`native-camera` feature)

#[cfg(feature = "native-camera")]
pub mod native;
pub mod push;
pub mod synthetic;

#[cfg(feature = "native-camera")]
pub use native::NativeVideoSource;
pub use push::PushVideoSource;
pub use synthetic::SyntheticVideoSource;

use crate::error::{MediaError, MediaResult};
use crate::tracks::{MediaStream, VideoResolution};
use async_trait::async_trait;
use std::sync::Arc;

/// Requested capture parameters
#[derive(Debug, Clone, PartialEq)]
pub struct VideoConstraints {
    /// Preferred device, or the platform default
    pub device_id: Option<String>,
    /// Ideal capture resolution
    pub resolution: VideoResolution,
    /// Ideal frame rate
    pub framerate: f64,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            device_id: None,
            resolution: VideoResolution::VGA,
            framerate: 30.0,
        }
    }
}

impl VideoConstraints {
    /// Validate configuration
    pub fn validate(&self) -> MediaResult<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Invalid resolution".to_string(),
            });
        }

        if self.framerate <= 0.0 || self.framerate > 120.0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Invalid framerate".to_string(),
            });
        }

        Ok(())
    }
}

/// Camera access capability
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Acquire a live stream; fails with `PermissionDenied` or a device error
    async fn acquire(&self, constraints: &VideoConstraints) -> MediaResult<MediaStream>;

    /// Release a stream previously acquired, stopping all of its tracks
    fn release(&self, stream: &MediaStream) {
        stream.stop();
    }

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// The platform camera when built with `native-camera`, a test pattern otherwise
pub fn default_video_source() -> Arc<dyn VideoSource> {
    #[cfg(feature = "native-camera")]
    {
        Arc::new(NativeVideoSource::new(0))
    }
    #[cfg(not(feature = "native-camera"))]
    {
        Arc::new(SyntheticVideoSource::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraints_validation() {
        assert!(VideoConstraints::default().validate().is_ok());

        let zero = VideoConstraints {
            resolution: VideoResolution::new(0, 480),
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let fast = VideoConstraints {
            framerate: 240.0,
            ..Default::default()
        };
        assert!(fast.validate().is_err());
    }
}
