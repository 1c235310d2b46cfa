//! Remote viewer
//!
//! Viewer side of remote viewing: calls a camera host by its session ID with
//! an empty placeholder stream and attaches whatever stream the host answers
//! with.

use crate::error::ViewerError;
use crate::protocol::PeerId;
use crate::transport::{CallEvent, SignalingTransport};
use camwatch_media::MediaStream;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Connection state of a [`Viewer`]
#[derive(Debug, Clone)]
pub enum ViewerState {
    /// Not connected
    Idle,
    /// Waiting for the camera to answer
    Connecting {
        /// Camera being called
        remote_id: PeerId,
    },
    /// Showing the camera's stream
    Watching {
        /// Camera being watched
        remote_id: PeerId,
        /// Stream received from the camera
        stream: MediaStream,
    },
    /// Connection failed or ended
    Failed(ViewerError),
}

impl ViewerState {
    /// Whether the state will not change without a new connection
    pub fn is_settled(&self) -> bool {
        !matches!(self, ViewerState::Connecting { .. })
    }

    /// Attached stream, if watching
    pub fn stream(&self) -> Option<&MediaStream> {
        match self {
            ViewerState::Watching { stream, .. } => Some(stream),
            _ => None,
        }
    }

    /// Failure, if any
    pub fn error(&self) -> Option<&ViewerError> {
        match self {
            ViewerState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Passive viewer of a remote camera
pub struct Viewer {
    transport: Arc<dyn SignalingTransport>,
    state: watch::Sender<ViewerState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Viewer {
    /// Call the camera `remote_id` and start tracking the connection
    ///
    /// Failures are reported through [`Viewer::state`], never as a panic or
    /// an `Err`.
    pub async fn connect(transport: Arc<dyn SignalingTransport>, remote_id: Option<&str>) -> Self {
        let (state, _) = watch::channel(ViewerState::Idle);
        let viewer = Self {
            transport,
            state,
            task: Mutex::new(None),
        };

        let remote_id = match remote_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => PeerId::from(id),
            None => {
                warn!("Viewer started without a camera ID");
                viewer.fail(ViewerError::NoRemoteId);
                return viewer;
            }
        };

        viewer.state.send_replace(ViewerState::Connecting {
            remote_id: remote_id.clone(),
        });
        info!(remote_id = %remote_id, "Connecting to camera");

        if let Err(e) = viewer.transport.open().await {
            viewer.fail(ViewerError::CallFailed {
                reason: e.to_string(),
            });
            return viewer;
        }

        let mut call = match viewer.transport.call(&remote_id, MediaStream::empty()).await {
            Ok(call) => call,
            Err(e) => {
                viewer.fail(ViewerError::CallFailed {
                    reason: e.to_string(),
                });
                return viewer;
            }
        };

        let state = viewer.state.clone();
        let task = tokio::spawn(async move {
            loop {
                match call.next_event().await {
                    CallEvent::Stream(stream) => {
                        info!(
                            remote_id = %remote_id,
                            stream_id = %stream.id(),
                            "Receiving camera stream"
                        );
                        state.send_replace(ViewerState::Watching {
                            remote_id: remote_id.clone(),
                            stream,
                        });
                    }
                    CallEvent::Error(reason) => {
                        warn!(remote_id = %remote_id, reason = %reason, "Connection error");
                        state.send_replace(ViewerState::Failed(ViewerError::CallFailed { reason }));
                        return;
                    }
                    CallEvent::Closed => {
                        let error = if state.borrow().stream().is_some() {
                            ViewerError::RemoteClosed
                        } else {
                            ViewerError::CallFailed {
                                reason: "Call closed before the camera answered".to_string(),
                            }
                        };
                        info!(remote_id = %remote_id, "Camera call closed");
                        state.send_replace(ViewerState::Failed(error));
                        return;
                    }
                }
            }
        });
        *viewer.task.lock() = Some(task);
        viewer
    }

    fn fail(&self, error: ViewerError) {
        self.state.send_replace(ViewerState::Failed(error));
    }

    /// Current state
    pub fn state(&self) -> ViewerState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ViewerState> {
        self.state.subscribe()
    }

    /// Attached remote stream, if watching
    pub fn stream(&self) -> Option<MediaStream> {
        self.state.borrow().stream().cloned()
    }

    /// Wait until the camera answered or the connection failed
    pub async fn wait_until_settled(&self) -> ViewerState {
        let mut rx = self.state.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if current.is_settled() {
                return current;
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Hang up and leave the signaling service
    pub async fn disconnect(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.transport.destroy().await;
        self.state.send_replace(ViewerState::Idle);
        info!("Viewer disconnected");
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("state", &*self.state.borrow())
            .finish()
    }
}
