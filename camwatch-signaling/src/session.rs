//! Stream session manager
//!
//! Host side of remote viewing. Owns the peer session and the media source
//! peers are answered with. Calls that arrive before the camera is ready are
//! parked in a FIFO queue and answered, in arrival order, as soon as a source
//! is set.

use crate::error::SignalingResult;
use crate::protocol::PeerId;
use crate::transport::{IncomingCall, SignalingTransport};
use camwatch_media::MediaStream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct SessionState {
    source: Option<MediaStream>,
    pending: VecDeque<IncomingCall>,
    answered: u64,
    shut_down: bool,
}

impl SessionState {
    fn answer(&mut self, call: IncomingCall, stream: MediaStream) {
        let call_id = call.call_id().clone();
        let caller = call.caller().clone();
        match call.answer(stream) {
            Ok(()) => {
                self.answered += 1;
                debug!(call_id = %call_id, caller = %caller, "Answered viewer call");
            }
            Err(e) => warn!(call_id = %call_id, error = %e, "Could not answer viewer call"),
        }
    }

    fn handle_incoming(&mut self, call: IncomingCall) {
        if self.shut_down {
            debug!(call_id = %call.call_id(), "Session shut down, dropping call");
            return;
        }
        match self.source.clone() {
            Some(stream) => self.answer(call, stream),
            None => {
                debug!(
                    call_id = %call.call_id(),
                    queued = self.pending.len() + 1,
                    "No source yet, queueing viewer call"
                );
                self.pending.push_back(call);
            }
        }
    }
}

/// Host-side peer session answering viewer calls with the camera stream
pub struct StreamSessionManager {
    transport: Arc<dyn SignalingTransport>,
    local_id: PeerId,
    state: Arc<Mutex<SessionState>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl StreamSessionManager {
    /// Open the transport and start listening for inbound calls
    pub async fn start(transport: Arc<dyn SignalingTransport>) -> SignalingResult<Self> {
        let local_id = transport.open().await?;
        let mut incoming = transport.incoming_calls()?;

        let state = Arc::new(Mutex::new(SessionState::default()));
        let listener_state = state.clone();
        let listener = tokio::spawn(async move {
            while let Some(call) = incoming.recv().await {
                listener_state.lock().handle_incoming(call);
            }
            debug!("Inbound call channel closed");
        });

        info!(local_id = %local_id, "Stream session started");
        Ok(Self {
            transport,
            local_id,
            state,
            listener: Mutex::new(Some(listener)),
        })
    }

    /// Session ID assigned by the signaling service
    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    /// Answer `call` now if a source is set, otherwise queue it
    pub fn handle_incoming(&self, call: IncomingCall) {
        self.state.lock().handle_incoming(call);
    }

    /// Make `stream` the source and answer every queued call with it
    ///
    /// Returns the number of queued calls that were answered.
    pub fn set_source(&self, stream: MediaStream) -> usize {
        let mut state = self.state.lock();
        if state.shut_down {
            return 0;
        }
        state.source = Some(stream.clone());

        let queued: Vec<IncomingCall> = state.pending.drain(..).collect();
        let count = queued.len();
        for call in queued {
            state.answer(call, stream.clone());
        }
        if count > 0 {
            info!(answered = count, "Answered queued viewer calls");
        }
        count
    }

    /// Forget the source; later calls are queued again
    pub fn clear_source(&self) {
        if self.state.lock().source.take().is_some() {
            debug!("Stream source cleared");
        }
    }

    /// Current source, if any
    pub fn source(&self) -> Option<MediaStream> {
        self.state.lock().source.clone()
    }

    /// Whether a source is set
    pub fn has_source(&self) -> bool {
        self.state.lock().source.is_some()
    }

    /// Number of calls waiting for a source
    pub fn pending_calls(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Number of calls answered so far
    pub fn answered_calls(&self) -> u64 {
        self.state.lock().answered
    }

    /// Whether `shutdown` has run
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    /// Tear the session down
    ///
    /// Queued callers observe a close, the source is stopped and the transport
    /// leaves the signaling service.
    pub async fn shutdown(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }

        let (source, dropped) = {
            let mut state = self.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            let dropped = state.pending.len();
            state.pending.clear();
            (state.source.take(), dropped)
        };

        if let Some(source) = source {
            source.stop();
        }
        self.transport.destroy().await;
        info!(local_id = %self.local_id, dropped_calls = dropped, "Stream session shut down");
    }
}

impl Drop for StreamSessionManager {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}

impl std::fmt::Debug for StreamSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSessionManager")
            .field("local_id", &self.local_id)
            .field("pending_calls", &self.pending_calls())
            .field("has_source", &self.has_source())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::LoopbackHub;
    use crate::protocol::CallId;
    use crate::transport::CallReply;

    async fn manager() -> StreamSessionManager {
        let hub = LoopbackHub::new();
        StreamSessionManager::start(Arc::new(hub.transport()))
            .await
            .unwrap()
    }

    fn inbound() -> (IncomingCall, tokio::sync::oneshot::Receiver<CallReply>) {
        IncomingCall::new(
            CallId::generate(),
            PeerId::from("viewer"),
            MediaStream::empty(),
        )
    }

    #[tokio::test]
    async fn test_call_without_source_is_queued() {
        let session = manager().await;
        let (call, mut reply) = inbound();

        session.handle_incoming(call);
        assert_eq!(session.pending_calls(), 1);
        assert!(reply.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_set_source_answers_queue_in_order() {
        let session = manager().await;
        let (first, first_reply) = inbound();
        let (second, second_reply) = inbound();
        session.handle_incoming(first);
        session.handle_incoming(second);

        let stream = MediaStream::video("cam");
        assert_eq!(session.set_source(stream.clone()), 2);
        assert_eq!(session.pending_calls(), 0);
        assert_eq!(session.answered_calls(), 2);

        for reply in [first_reply, second_reply] {
            match reply.await.unwrap() {
                CallReply::Answered(answered) => assert!(answered.same_stream(&stream)),
                other => panic!("unexpected reply {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_call_with_source_answered_immediately() {
        let session = manager().await;
        session.set_source(MediaStream::video("cam"));

        let (call, reply) = inbound();
        session.handle_incoming(call);
        assert_eq!(session.pending_calls(), 0);
        assert!(matches!(reply.await.unwrap(), CallReply::Answered(_)));
    }

    #[tokio::test]
    async fn test_clear_source_queues_again() {
        let session = manager().await;
        session.set_source(MediaStream::video("cam"));
        session.clear_source();
        assert!(!session.has_source());

        let (call, _reply) = inbound();
        session.handle_incoming(call);
        assert_eq!(session.pending_calls(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drops_queue_and_stops_source() {
        let session = manager().await;
        let (call, reply) = inbound();
        session.handle_incoming(call);

        session.shutdown().await;
        assert!(session.is_shut_down());
        assert_eq!(session.pending_calls(), 0);
        assert!(reply.await.is_err());

        let stream = MediaStream::video("cam");
        assert_eq!(session.set_source(stream.clone()), 0);
        assert!(!session.has_source());
    }
}
