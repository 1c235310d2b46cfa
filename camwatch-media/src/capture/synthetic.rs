//! Generated test-pattern camera

use super::{VideoConstraints, VideoSource};
use crate::error::{MediaError, MediaResult};
use crate::tracks::{MediaStream, VideoFrame, VideoPixelFormat};
use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Virtual camera producing a gradient background with an optional moving block
#[derive(Debug, Clone)]
pub struct SyntheticVideoSource {
    permission_granted: bool,
    moving_object: bool,
}

impl SyntheticVideoSource {
    /// A camera that grants access and shows a still scene
    pub fn new() -> Self {
        Self {
            permission_granted: true,
            moving_object: false,
        }
    }

    /// A camera whose permission prompt is always refused
    pub fn denied() -> Self {
        Self {
            permission_granted: false,
            moving_object: false,
        }
    }

    /// Draw a block that moves across the scene every frame
    pub fn with_moving_object(mut self, enabled: bool) -> Self {
        self.moving_object = enabled;
        self
    }

    fn render(&self, width: u32, height: u32, sequence: u64) -> VideoFrame {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        let block = (width / 8).max(1);
        let block_x = (sequence * 4 % width as u64) as u32;
        let block_y = height / 3;

        for y in 0..height {
            for x in 0..width {
                let inside = self.moving_object
                    && x >= block_x
                    && x < block_x + block
                    && y >= block_y
                    && y < block_y + block;
                if inside {
                    data.extend_from_slice(&[250, 250, 250]);
                } else {
                    let shade = (x * 255 / width.max(1)) as u8;
                    data.extend_from_slice(&[shade / 2, shade / 2, 96]);
                }
            }
        }

        VideoFrame {
            width,
            height,
            format: VideoPixelFormat::Rgb24,
            data,
            timestamp: now_millis(),
        }
    }
}

impl Default for SyntheticVideoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoSource for SyntheticVideoSource {
    async fn acquire(&self, constraints: &VideoConstraints) -> MediaResult<MediaStream> {
        constraints.validate()?;

        if !self.permission_granted {
            warn!("Synthetic camera refused access");
            return Err(MediaError::PermissionDenied {
                operation: "camera access".to_string(),
            });
        }

        let stream = MediaStream::video("Synthetic camera");
        let producer = stream.clone();
        let source = self.clone();
        let resolution = constraints.resolution;
        let period = Duration::from_secs_f64(1.0 / constraints.framerate);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut sequence = 0u64;

            loop {
                interval.tick().await;
                let frame = source.render(resolution.width, resolution.height, sequence);
                if producer.push_frame(frame).is_err() {
                    debug!(
                        stream_id = %producer.id(),
                        frames = sequence,
                        "Synthetic capture ended"
                    );
                    break;
                }
                sequence += 1;
            }
        });

        info!(
            stream_id = %stream.id(),
            width = resolution.width,
            height = resolution.height,
            "Synthetic camera started"
        );
        Ok(stream)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracks::VideoResolution;

    fn small() -> VideoConstraints {
        VideoConstraints {
            resolution: VideoResolution::new(32, 24),
            framerate: 50.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_denied_permission() {
        let source = SyntheticVideoSource::denied();
        let result = source.acquire(&small()).await;
        assert!(matches!(result, Err(MediaError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_invalid_constraints_rejected() {
        let source = SyntheticVideoSource::new();
        let constraints = VideoConstraints {
            framerate: 0.0,
            ..small()
        };
        assert!(matches!(
            source.acquire(&constraints).await,
            Err(MediaError::InvalidConfiguration { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_produces_frames_until_released() {
        let source = SyntheticVideoSource::new().with_moving_object(true);
        let stream = source.acquire(&small()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let frame = stream.current_frame().expect("frames should be flowing");
        assert_eq!((frame.width, frame.height), (32, 24));
        assert_eq!(frame.data.len(), 32 * 24 * 3);

        source.release(&stream);
        assert!(!stream.is_active());
    }

    #[test]
    fn test_moving_object_changes_frames() {
        let source = SyntheticVideoSource::new().with_moving_object(true);
        let a = source.render(64, 48, 0);
        let b = source.render(64, 48, 3);
        assert_ne!(a.data, b.data);

        let still = SyntheticVideoSource::new();
        assert_eq!(still.render(64, 48, 0).data, still.render(64, 48, 3).data);
    }
}
