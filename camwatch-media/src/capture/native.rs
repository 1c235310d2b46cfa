//! Platform camera capture through nokhwa
//!
//! The camera handle is not `Send` on every platform, so it lives on a
//! dedicated capture thread that feeds decoded RGB frames into the stream until
//! the stream is stopped.

use super::{VideoConstraints, VideoSource};
use crate::error::{MediaError, MediaResult};
use crate::tracks::{MediaStream, VideoFrame, VideoPixelFormat};
use async_trait::async_trait;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Camera at a platform device index
#[derive(Debug, Clone)]
pub struct NativeVideoSource {
    index: u32,
}

impl NativeVideoSource {
    /// Camera at `index`; overridden by a numeric `device_id` constraint
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

#[async_trait]
impl VideoSource for NativeVideoSource {
    async fn acquire(&self, constraints: &VideoConstraints) -> MediaResult<MediaStream> {
        constraints.validate()?;

        let index = match constraints.device_id.as_deref() {
            Some(id) => id.parse().map_err(|_| MediaError::DeviceNotFound {
                device_id: id.to_string(),
            })?,
            None => self.index,
        };

        let stream = MediaStream::video(&format!("Camera {}", index));
        let producer = stream.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name(format!("camwatch-capture-{}", index))
            .spawn(move || capture_thread(index, producer, ready_tx))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                info!(index, stream_id = %stream.id(), "Native camera started");
                Ok(stream)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MediaError::Device {
                reason: "capture thread exited before opening the camera".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "native"
    }
}

fn capture_thread(index: u32, producer: MediaStream, ready: oneshot::Sender<MediaResult<()>>) {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

    let mut camera = match Camera::new(CameraIndex::Index(index), requested) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(map_nokhwa_error(e)));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = ready.send(Err(map_nokhwa_error(e)));
        return;
    }

    if ready.send(Ok(())).is_err() {
        let _ = camera.stop_stream();
        return;
    }

    let mut frames = 0u64;
    while producer.is_active() {
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!(index, error = %e, "Camera stopped delivering frames");
                break;
            }
        };

        let image = match buffer.decode_image::<RgbFormat>() {
            Ok(image) => image,
            Err(e) => {
                warn!(index, error = %e, "Dropping undecodable camera frame");
                continue;
            }
        };

        let frame = VideoFrame {
            width: image.width(),
            height: image.height(),
            format: VideoPixelFormat::Rgb24,
            data: image.into_raw(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        };

        if producer.push_frame(frame).is_err() {
            break;
        }
        frames += 1;
    }

    if let Err(e) = camera.stop_stream() {
        warn!(index, error = %e, "Failed to stop camera stream");
    }
    producer.stop();
    debug!(index, frames, "Native capture thread finished");
}

fn map_nokhwa_error(error: NokhwaError) -> MediaError {
    let reason = error.to_string();
    if reason.to_lowercase().contains("permission") {
        MediaError::PermissionDenied {
            operation: format!("camera access: {}", reason),
        }
    } else {
        MediaError::Device { reason }
    }
}
