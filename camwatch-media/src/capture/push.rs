//! Caller-fed video source

use super::{VideoConstraints, VideoSource};
use crate::error::{MediaError, MediaResult};
use crate::tracks::{MediaStream, VideoFrame};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// A video source whose frames are supplied through [`PushVideoSource::push`]
///
/// Each successful `acquire` opens a fresh stream; frames pushed while no
/// stream is open are rejected with `CaptureNotActive`.
#[derive(Debug, Clone, Default)]
pub struct PushVideoSource {
    current: Arc<Mutex<Option<MediaStream>>>,
    denied: Arc<Mutex<Option<MediaError>>>,
}

impl PushVideoSource {
    /// Create a source that grants access
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `acquire` fail with `error`
    pub fn fail_next_acquire(&self, error: MediaError) {
        *self.denied.lock() = Some(error);
    }

    /// Publish a frame to the open stream
    pub fn push(&self, frame: VideoFrame) -> MediaResult<()> {
        match self.current.lock().as_ref() {
            Some(stream) => stream.push_frame(frame),
            None => Err(MediaError::CaptureNotActive),
        }
    }

    /// The open stream, if any
    pub fn stream(&self) -> Option<MediaStream> {
        self.current
            .lock()
            .as_ref()
            .filter(|s| s.is_active())
            .cloned()
    }
}

#[async_trait]
impl VideoSource for PushVideoSource {
    async fn acquire(&self, constraints: &VideoConstraints) -> MediaResult<MediaStream> {
        constraints.validate()?;
        if let Some(error) = self.denied.lock().take() {
            return Err(error);
        }

        let stream = MediaStream::video("Pushed frames");
        *self.current.lock() = Some(stream.clone());
        debug!(stream_id = %stream.id(), "Push source opened");
        Ok(stream)
    }

    fn release(&self, stream: &MediaStream) {
        stream.stop();
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|s| s.same_stream(stream)) {
            *current = None;
        }
    }

    fn name(&self) -> &str {
        "push"
    }
}
