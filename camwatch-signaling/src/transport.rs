//! Signaling transport capability
//!
//! A transport registers this peer with a signaling service, delivers inbound
//! calls and places outbound ones. Media travels as [`MediaStream`] handles;
//! how those map onto a wire is the transport's business.

use crate::error::{SignalingError, SignalingResult};
use crate::protocol::{CallId, PeerId};
use async_trait::async_trait;
use camwatch_media::MediaStream;
use tokio::sync::{mpsc, oneshot};

/// Signaling and peer transport capability
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Register with the signaling service and obtain the local session ID.
    ///
    /// Calling `open` again returns the same ID.
    async fn open(&self) -> SignalingResult<PeerId>;

    /// Take the inbound call receiver; only one handler may be registered
    fn incoming_calls(&self) -> SignalingResult<mpsc::UnboundedReceiver<IncomingCall>>;

    /// Call `remote`, sending `local_stream` (possibly a placeholder)
    ///
    /// Remote-side failures arrive as [`CallEvent::Error`] on the returned call.
    async fn call(&self, remote: &PeerId, local_stream: MediaStream)
        -> SignalingResult<OutgoingCall>;

    /// Leave the signaling service; further calls fail with `Destroyed`
    async fn destroy(&self);
}

/// Reply to an inbound call
#[derive(Debug)]
pub enum CallReply {
    /// Accepted with the answering peer's stream
    Answered(MediaStream),
    /// Refused
    Rejected(String),
}

/// An inbound call waiting for an answer
///
/// Dropping it unanswered hangs up on the caller.
#[derive(Debug)]
pub struct IncomingCall {
    call_id: CallId,
    caller: PeerId,
    caller_stream: MediaStream,
    reply: oneshot::Sender<CallReply>,
}

impl IncomingCall {
    /// Build an inbound call and the receiver its reply will be sent on
    pub fn new(
        call_id: CallId,
        caller: PeerId,
        caller_stream: MediaStream,
    ) -> (Self, oneshot::Receiver<CallReply>) {
        let (reply, reply_rx) = oneshot::channel();
        (
            Self {
                call_id,
                caller,
                caller_stream,
                reply,
            },
            reply_rx,
        )
    }

    /// Call ID
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// Calling peer
    pub fn caller(&self) -> &PeerId {
        &self.caller
    }

    /// Stream offered by the caller (a placeholder for viewers)
    pub fn caller_stream(&self) -> &MediaStream {
        &self.caller_stream
    }

    /// Answer with `stream`
    pub fn answer(self, stream: MediaStream) -> SignalingResult<()> {
        let call_id = self.call_id;
        self.reply
            .send(CallReply::Answered(stream))
            .map_err(|_| SignalingError::CallerGone { call_id })
    }

    /// Refuse the call
    pub fn reject(self, reason: &str) -> SignalingResult<()> {
        let call_id = self.call_id;
        self.reply
            .send(CallReply::Rejected(reason.to_string()))
            .map_err(|_| SignalingError::CallerGone { call_id })
    }
}

/// Progress of an outbound call
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// Remote answered with its stream
    Stream(MediaStream),
    /// Remote hung up or the call ended
    Closed,
    /// Call failed
    Error(String),
}

/// An outbound call
#[derive(Debug)]
pub struct OutgoingCall {
    call_id: CallId,
    remote: PeerId,
    events: mpsc::UnboundedReceiver<CallEvent>,
}

impl OutgoingCall {
    /// Build an outbound call and the sender its events are delivered on
    pub fn new(call_id: CallId, remote: PeerId) -> (Self, mpsc::UnboundedSender<CallEvent>) {
        let (events_tx, events) = mpsc::unbounded_channel();
        (
            Self {
                call_id,
                remote,
                events,
            },
            events_tx,
        )
    }

    /// Call ID
    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// Called peer
    pub fn remote(&self) -> &PeerId {
        &self.remote
    }

    /// Next call event; `Closed` once the transport stops reporting
    pub async fn next_event(&mut self) -> CallEvent {
        self.events.recv().await.unwrap_or(CallEvent::Closed)
    }
}
