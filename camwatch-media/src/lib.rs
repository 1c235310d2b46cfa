//! # camwatch media
//!
//! Video sources, frame sampling and motion scoring for camwatch.
//! This crate owns everything that touches pixels: acquiring a camera stream,
//! sampling frames into a fixed-size raster, scoring motion between rasters
//! and encoding triggering frames as still images.

#![warn(clippy::all)]

pub mod capture;
pub mod differ;
pub mod encode;
pub mod error;
pub mod raster;
pub mod tracks;

// Re-export main types
#[cfg(feature = "native-camera")]
pub use capture::NativeVideoSource;
pub use capture::{
    default_video_source, PushVideoSource, SyntheticVideoSource, VideoConstraints, VideoSource,
};
pub use differ::{motion_score, rgba_motion_score, FrameDiffer};
pub use encode::{EncodedImage, StillEncoder, DEFAULT_JPEG_QUALITY};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use raster::{RasterBuffer, DEFAULT_RASTER_HEIGHT, DEFAULT_RASTER_WIDTH};
pub use tracks::{
    MediaStream, MediaTrack, TrackKind, VideoFrame, VideoPixelFormat, VideoResolution,
};
