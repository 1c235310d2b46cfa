//! Signaling error types

use crate::protocol::{CallId, PeerId};
use camwatch_core::CamWatchError;
use thiserror::Error;

/// Errors raised by signaling transports and the session manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// Transport used before `open`
    #[error("Signaling session not open")]
    NotOpen,

    /// Transport used after `destroy`
    #[error("Signaling session destroyed")]
    Destroyed,

    /// Inbound calls are already being consumed elsewhere
    #[error("Inbound call handler already registered")]
    HandlerAlreadyRegistered,

    /// No peer registered under the requested ID
    #[error("Could not connect to peer {peer_id}")]
    PeerUnavailable {
        /// Requested peer
        peer_id: PeerId,
    },

    /// Caller went away before the call was answered
    #[error("Caller hung up before call {call_id} was answered")]
    CallerGone {
        /// Abandoned call
        call_id: CallId,
    },

    /// Underlying transport failure
    #[error("Transport error: {reason}")]
    Transport {
        /// Failure reason
        reason: String,
    },
}

/// Reasons a remote view could not be shown
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    /// No camera ID was given to connect to
    #[error("No camera ID provided")]
    NoRemoteId,

    /// The call to the camera could not be established
    #[error("Connection failed: {reason}")]
    CallFailed {
        /// Failure reason reported by the transport
        reason: String,
    },

    /// The camera ended the stream
    #[error("Camera disconnected")]
    RemoteClosed,
}

impl ViewerError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ViewerError::NoRemoteId => "NO_REMOTE_ID",
            ViewerError::CallFailed { .. } => "CALL_FAILED",
            ViewerError::RemoteClosed => "REMOTE_CLOSED",
        }
    }
}

/// Result type alias for signaling operations
pub type SignalingResult<T> = Result<T, SignalingError>;

impl SignalingError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            SignalingError::NotOpen => "NOT_OPEN",
            SignalingError::Destroyed => "DESTROYED",
            SignalingError::HandlerAlreadyRegistered => "HANDLER_ALREADY_REGISTERED",
            SignalingError::PeerUnavailable { .. } => "PEER_UNAVAILABLE",
            SignalingError::CallerGone { .. } => "CALLER_GONE",
            SignalingError::Transport { .. } => "TRANSPORT_ERROR",
        }
    }
}

impl From<SignalingError> for CamWatchError {
    fn from(err: SignalingError) -> Self {
        CamWatchError::Signaling {
            reason: err.to_string(),
        }
    }
}
