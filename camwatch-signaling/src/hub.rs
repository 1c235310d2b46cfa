//! In-process signaling hub
//!
//! Routes calls between peers living in the same process. Every peer gets a
//! random ID on `open`; calls to unknown IDs fail the way a remote signaling
//! service reports an unavailable peer. The hub keeps a bounded log of the
//! handshake messages it routed.

use crate::error::{SignalingError, SignalingResult};
use crate::protocol::{CallId, PeerId, SignalingMessage};
use crate::transport::{CallEvent, CallReply, IncomingCall, OutgoingCall, SignalingTransport};
use async_trait::async_trait;
use camwatch_media::MediaStream;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Messages kept in the routing log
const MESSAGE_LOG_CAPACITY: usize = 256;

/// A routed message with its timestamp
#[derive(Debug, Clone)]
pub struct LoggedMessage {
    /// When the hub handled the message
    pub at: DateTime<Utc>,
    /// The message
    pub message: SignalingMessage,
}

#[derive(Debug)]
struct HubInner {
    peers: DashMap<PeerId, mpsc::UnboundedSender<IncomingCall>>,
    log: Mutex<VecDeque<LoggedMessage>>,
}

/// Signaling hub for peers in one process
#[derive(Debug, Clone)]
pub struct LoopbackHub {
    inner: Arc<HubInner>,
}

impl LoopbackHub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                peers: DashMap::new(),
                log: Mutex::new(VecDeque::with_capacity(MESSAGE_LOG_CAPACITY)),
            }),
        }
    }

    /// A new, unopened transport attached to this hub
    pub fn transport(&self) -> LoopbackTransport {
        LoopbackTransport {
            hub: self.clone(),
            state: Mutex::new(TransportState::default()),
        }
    }

    /// Number of registered peers
    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    /// Whether `peer_id` is registered
    pub fn is_registered(&self, peer_id: &PeerId) -> bool {
        self.inner.peers.contains_key(peer_id)
    }

    /// Routed messages, oldest first
    pub fn message_log(&self) -> Vec<LoggedMessage> {
        self.inner.log.lock().iter().cloned().collect()
    }

    fn record(&self, message: SignalingMessage) {
        let mut log = self.inner.log.lock();
        if log.len() == MESSAGE_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(LoggedMessage {
            at: Utc::now(),
            message,
        });
    }

    fn register(&self) -> (PeerId, mpsc::UnboundedReceiver<IncomingCall>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer_id = PeerId::generate();
        self.inner.peers.insert(peer_id.clone(), tx);
        self.record(SignalingMessage::Register {
            peer_id: peer_id.clone(),
        });
        info!(peer_id = %peer_id, "Peer registered");
        (peer_id, rx)
    }

    fn unregister(&self, peer_id: &PeerId) {
        if self.inner.peers.remove(peer_id).is_some() {
            self.record(SignalingMessage::Unregister {
                peer_id: peer_id.clone(),
            });
            info!(peer_id = %peer_id, "Peer unregistered");
        }
    }

    fn fail(
        &self,
        call_id: &CallId,
        events: &mpsc::UnboundedSender<CallEvent>,
        error: SignalingError,
    ) {
        warn!(call_id = %call_id, error = %error, "Call failed");
        self.record(SignalingMessage::Error {
            call_id: Some(call_id.clone()),
            error: error.to_string(),
            error_code: error.error_code().to_string(),
        });
        let _ = events.send(CallEvent::Error(error.to_string()));
    }

    fn route_call(&self, from: &PeerId, to: &PeerId, local_stream: MediaStream) -> OutgoingCall {
        let call_id = CallId::generate();
        let (outgoing, events) = OutgoingCall::new(call_id.clone(), to.clone());

        self.record(SignalingMessage::Call {
            call_id: call_id.clone(),
            from: from.clone(),
            to: to.clone(),
            with_media: !local_stream.is_placeholder(),
        });

        // Clone the sender so no map guard is held while sending
        let sender = self.inner.peers.get(to).map(|entry| entry.value().clone());
        let Some(sender) = sender else {
            self.fail(&call_id, &events, SignalingError::PeerUnavailable { peer_id: to.clone() });
            return outgoing;
        };

        let (incoming, reply) = IncomingCall::new(call_id.clone(), from.clone(), local_stream);
        if sender.send(incoming).is_err() {
            self.fail(&call_id, &events, SignalingError::PeerUnavailable { peer_id: to.clone() });
            return outgoing;
        }
        debug!(call_id = %call_id, from = %from, to = %to, "Call routed");

        let hub = self.clone();
        tokio::spawn(async move {
            match reply.await {
                Ok(CallReply::Answered(stream)) => {
                    hub.record(SignalingMessage::Answer {
                        call_id: call_id.clone(),
                        stream_id: stream.id().to_string(),
                    });
                    if events.send(CallEvent::Stream(stream.clone())).is_err() {
                        return;
                    }
                    tokio::select! {
                        _ = stream.ended() => {}
                        _ = events.closed() => return,
                    }
                    hub.record(SignalingMessage::HangUp { call_id });
                    let _ = events.send(CallEvent::Closed);
                }
                Ok(CallReply::Rejected(reason)) => {
                    hub.fail(&call_id, &events, SignalingError::Transport { reason });
                }
                Err(_) => {
                    debug!(call_id = %call_id, "Call dropped unanswered");
                    hub.record(SignalingMessage::HangUp { call_id });
                    let _ = events.send(CallEvent::Closed);
                }
            }
        });

        outgoing
    }
}

impl Default for LoopbackHub {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct TransportState {
    peer_id: Option<PeerId>,
    incoming: Option<mpsc::UnboundedReceiver<IncomingCall>>,
    destroyed: bool,
}

/// A peer's connection to a [`LoopbackHub`]
#[derive(Debug)]
pub struct LoopbackTransport {
    hub: LoopbackHub,
    state: Mutex<TransportState>,
}

impl LoopbackTransport {
    /// The hub this transport is attached to
    pub fn hub(&self) -> &LoopbackHub {
        &self.hub
    }

    fn local_id(&self) -> SignalingResult<PeerId> {
        let state = self.state.lock();
        if state.destroyed {
            return Err(SignalingError::Destroyed);
        }
        state.peer_id.clone().ok_or(SignalingError::NotOpen)
    }
}

#[async_trait]
impl SignalingTransport for LoopbackTransport {
    async fn open(&self) -> SignalingResult<PeerId> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SignalingError::Destroyed);
        }
        if let Some(peer_id) = &state.peer_id {
            return Ok(peer_id.clone());
        }

        let (peer_id, incoming) = self.hub.register();
        state.peer_id = Some(peer_id.clone());
        state.incoming = Some(incoming);
        Ok(peer_id)
    }

    fn incoming_calls(&self) -> SignalingResult<mpsc::UnboundedReceiver<IncomingCall>> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(SignalingError::Destroyed);
        }
        if state.peer_id.is_none() {
            return Err(SignalingError::NotOpen);
        }
        state
            .incoming
            .take()
            .ok_or(SignalingError::HandlerAlreadyRegistered)
    }

    async fn call(
        &self,
        remote: &PeerId,
        local_stream: MediaStream,
    ) -> SignalingResult<OutgoingCall> {
        let local = self.local_id()?;
        Ok(self.hub.route_call(&local, remote, local_stream))
    }

    async fn destroy(&self) {
        let peer_id = {
            let mut state = self.state.lock();
            state.destroyed = true;
            state.incoming = None;
            state.peer_id.take()
        };
        if let Some(peer_id) = peer_id {
            self.hub.unregister(&peer_id);
        }
    }
}
