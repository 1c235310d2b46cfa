//! Camera host session
//!
//! Ties a [`Monitor`] to a stream session so remote viewers can watch the
//! same camera. Signaling failures never stop local monitoring; they are kept
//! as a persistent notice and only disable remote viewing.

use crate::event::MonitorEvent;
use crate::monitor::Monitor;
use crate::router::ViewRouter;
use camwatch_signaling::{PeerId, SignalingTransport, StreamSessionManager};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A running camera host
#[derive(Debug)]
pub struct HostSession {
    monitor: Monitor,
    session: Option<Arc<StreamSessionManager>>,
    signaling_error: Option<String>,
    share_link: Option<String>,
}

impl HostSession {
    pub(crate) async fn open(
        monitor: Monitor,
        transport: Arc<dyn SignalingTransport>,
        share_base_url: Option<&str>,
    ) -> Self {
        match StreamSessionManager::start(transport).await {
            Ok(session) => {
                let session = Arc::new(session);
                monitor.attach_session(session.clone());

                let share_link = share_base_url.and_then(|base| {
                    ViewRouter::share_link(base, session.local_id().as_str())
                        .map_err(|e| warn!(error = %e, "Could not build share link"))
                        .ok()
                });
                info!(local_id = %session.local_id(), "Remote viewing available");

                Self {
                    monitor,
                    session: Some(session),
                    signaling_error: None,
                    share_link,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                error!(error = %reason, "Remote viewing unavailable");
                monitor.notify(MonitorEvent::SignalingUnavailable {
                    reason: reason.clone(),
                });
                Self {
                    monitor,
                    session: None,
                    signaling_error: Some(reason),
                    share_link: None,
                }
            }
        }
    }

    /// The local monitor
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Stream session, when signaling is available
    pub fn session(&self) -> Option<&Arc<StreamSessionManager>> {
        self.session.as_ref()
    }

    /// Session ID viewers call
    pub fn local_id(&self) -> Option<&PeerId> {
        self.session.as_ref().map(|session| session.local_id())
    }

    /// Link that opens a viewer of this camera
    pub fn share_link(&self) -> Option<&str> {
        self.share_link.as_deref()
    }

    /// Persistent signaling failure notice
    pub fn signaling_error(&self) -> Option<&str> {
        self.signaling_error.as_deref()
    }

    /// Whether remote viewers can connect
    pub fn remote_viewing_available(&self) -> bool {
        self.session.is_some()
    }

    /// Stop monitoring and leave the signaling service
    pub async fn shutdown(&self) {
        self.monitor.stop();
        if let Some(session) = &self.session {
            session.shutdown().await;
        }
        info!("Host session closed");
    }
}
