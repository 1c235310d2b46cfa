//! Frames, tracks and live media streams

use crate::error::{MediaError, MediaResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

/// Raw pixel layouts a frame can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoPixelFormat {
    /// 8-bit R, G, B
    Rgb24,
    /// 8-bit B, G, R
    Bgr24,
    /// 8-bit R, G, B, A
    Rgba32,
}

impl VideoPixelFormat {
    /// Bytes used by one pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            VideoPixelFormat::Rgb24 | VideoPixelFormat::Bgr24 => 3,
            VideoPixelFormat::Rgba32 => 4,
        }
    }

    /// Read one pixel as `[r, g, b]`
    #[inline]
    pub fn rgb_at(&self, data: &[u8], offset: usize) -> [u8; 3] {
        match self {
            VideoPixelFormat::Rgb24 | VideoPixelFormat::Rgba32 => {
                [data[offset], data[offset + 1], data[offset + 2]]
            }
            VideoPixelFormat::Bgr24 => [data[offset + 2], data[offset + 1], data[offset]],
        }
    }
}

/// Video resolution information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoResolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl VideoResolution {
    /// Create a resolution
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 320x240, the motion sampling size
    pub const QVGA: Self = Self::new(320, 240);
    /// 640x480
    pub const VGA: Self = Self::new(640, 480);
    /// 1280x720
    pub const HD: Self = Self::new(1280, 720);

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A single uncompressed video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel layout of `data`
    pub format: VideoPixelFormat,
    /// Tightly packed pixel rows
    pub data: Vec<u8>,
    /// Capture timestamp in milliseconds
    pub timestamp: u64,
}

impl VideoFrame {
    /// Create a frame, checking that `data` covers every pixel
    pub fn new(
        width: u32,
        height: u32,
        format: VideoPixelFormat,
        data: Vec<u8>,
        timestamp: u64,
    ) -> MediaResult<Self> {
        let frame = Self {
            width,
            height,
            format,
            data,
            timestamp,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// A frame filled with a single RGB color
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], timestamp: u64) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            format: VideoPixelFormat::Rgb24,
            data,
            timestamp,
        }
    }

    /// Byte length a well-formed frame of this size and format has
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Check dimensions and buffer length
    pub fn validate(&self) -> MediaResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MediaError::UnsupportedFormat {
                format: format!("{}x{} frame", self.width, self.height),
            });
        }
        if self.data.len() < self.expected_len() {
            return Err(MediaError::InvalidFrameData {
                expected: self.expected_len(),
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Frame resolution
    pub fn resolution(&self) -> VideoResolution {
        VideoResolution::new(self.width, self.height)
    }
}

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    /// Video track
    Video,
    /// Audio track
    Audio,
}

/// A track inside a media stream
#[derive(Debug, Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    label: String,
    live: Arc<AtomicBool>,
}

impl MediaTrack {
    /// Create a live track
    pub fn new(kind: TrackKind, label: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.to_string(),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Track ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Track kind
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    /// Device label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the track is still producing media
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Stop the track permanently
    pub fn stop(&self) {
        self.live.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
struct StreamInner {
    id: String,
    tracks: Mutex<Vec<MediaTrack>>,
    frames: watch::Sender<Option<Arc<VideoFrame>>>,
    live: watch::Sender<bool>,
}

/// A live media stream shared between the detection loop and peers
///
/// Cloning is cheap and every clone observes the same frames. The latest frame
/// is kept, older ones are overwritten the way a video element only ever shows
/// its current frame.
#[derive(Debug, Clone)]
pub struct MediaStream {
    inner: Arc<StreamInner>,
}

impl MediaStream {
    /// Create a stream with the given tracks
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        let (frames, _) = watch::channel(None);
        let (live, _) = watch::channel(!tracks.is_empty());
        Self {
            inner: Arc::new(StreamInner {
                id: Uuid::new_v4().to_string(),
                tracks: Mutex::new(tracks),
                frames,
                live,
            }),
        }
    }

    /// A stream with a single live video track
    pub fn video(label: &str) -> Self {
        Self::new(vec![MediaTrack::new(TrackKind::Video, label)])
    }

    /// A stream with no tracks, used where a stream is required but no media is sent
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Stream ID
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Snapshot of the stream's tracks
    pub fn tracks(&self) -> Vec<MediaTrack> {
        self.inner.tracks.lock().clone()
    }

    /// Whether the stream carries no tracks at all
    pub fn is_placeholder(&self) -> bool {
        self.inner.tracks.lock().is_empty()
    }

    /// Whether any track is still live
    pub fn is_active(&self) -> bool {
        *self.inner.live.borrow()
    }

    /// Publish a new frame; ignored once the stream has stopped
    pub fn push_frame(&self, frame: VideoFrame) -> MediaResult<()> {
        if !self.is_active() {
            return Err(MediaError::CaptureNotActive);
        }
        self.inner.frames.send_replace(Some(Arc::new(frame)));
        Ok(())
    }

    /// The most recent frame, if any has arrived
    pub fn current_frame(&self) -> Option<Arc<VideoFrame>> {
        self.inner.frames.borrow().clone()
    }

    /// Subscribe to frame updates
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<VideoFrame>>> {
        self.inner.frames.subscribe()
    }

    /// Stop every track in the stream
    pub fn stop(&self) {
        for track in self.inner.tracks.lock().iter() {
            track.stop();
        }
        if self.inner.live.send_replace(false) {
            debug!(stream_id = %self.inner.id, "Media stream stopped");
        }
    }

    /// Resolve once the stream has stopped
    pub async fn ended(&self) {
        let mut live = self.inner.live.subscribe();
        while *live.borrow_and_update() {
            if live.changed().await.is_err() {
                return;
            }
        }
    }

    /// Whether two handles refer to the same stream
    pub fn same_stream(&self, other: &MediaStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_frame_validation() {
        let frame = VideoFrame::new(2, 2, VideoPixelFormat::Rgb24, vec![0; 12], 0);
        assert!(frame.is_ok());

        let short = VideoFrame::new(2, 2, VideoPixelFormat::Rgba32, vec![0; 12], 0);
        assert!(matches!(
            short,
            Err(MediaError::InvalidFrameData {
                expected: 16,
                actual: 12
            })
        ));

        let empty = VideoFrame::new(0, 2, VideoPixelFormat::Rgb24, vec![], 0);
        assert!(matches!(empty, Err(MediaError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_bgr_channel_order() {
        let data = [10u8, 20, 30];
        assert_eq!(VideoPixelFormat::Bgr24.rgb_at(&data, 0), [30, 20, 10]);
        assert_eq!(VideoPixelFormat::Rgb24.rgb_at(&data, 0), [10, 20, 30]);
    }

    #[test]
    fn test_stream_keeps_latest_frame() {
        let stream = MediaStream::video("test camera");
        assert!(stream.current_frame().is_none());

        stream.push_frame(VideoFrame::solid(4, 4, [1, 1, 1], 1)).unwrap();
        stream.push_frame(VideoFrame::solid(4, 4, [2, 2, 2], 2)).unwrap();

        let frame = stream.current_frame().unwrap();
        assert_eq!(frame.timestamp, 2);
        assert_eq!(frame.data[0], 2);
    }

    #[test]
    fn test_stop_stops_all_tracks() {
        let stream = MediaStream::new(vec![
            MediaTrack::new(TrackKind::Video, "cam"),
            MediaTrack::new(TrackKind::Audio, "mic"),
        ]);
        let clone = stream.clone();
        assert!(stream.is_active());

        clone.stop();
        assert!(!stream.is_active());
        assert!(stream.tracks().iter().all(|t| !t.is_live()));
        assert!(matches!(
            stream.push_frame(VideoFrame::solid(1, 1, [0, 0, 0], 0)),
            Err(MediaError::CaptureNotActive)
        ));
    }

    #[test]
    fn test_placeholder_stream() {
        let stream = MediaStream::empty();
        assert!(stream.is_placeholder());
        assert!(!stream.is_active());
        assert!(!stream.same_stream(&MediaStream::empty()));
        assert!(stream.same_stream(&stream.clone()));
    }

    #[tokio::test]
    async fn test_ended_resolves_after_stop() {
        let stream = MediaStream::video("cam");
        let waiter = stream.clone();
        let handle = tokio::spawn(async move { waiter.ended().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        stream.stop();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("ended() should resolve")
            .unwrap();
    }
}
