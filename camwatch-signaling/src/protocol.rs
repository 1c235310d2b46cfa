//! Signaling protocol messages

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Session identifier assigned to a peer by the signaling service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// A fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifier of a single call between two peers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// A fresh random call identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Call handshake messages exchanged through the signaling service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalingMessage {
    /// Peer registered and was assigned an ID
    Register {
        /// Assigned peer ID
        peer_id: PeerId,
    },
    /// Peer left the signaling service
    Unregister {
        /// Departing peer ID
        peer_id: PeerId,
    },
    /// Outbound call request
    Call {
        /// Call ID
        call_id: CallId,
        /// Calling peer
        from: PeerId,
        /// Called peer
        to: PeerId,
        /// Whether the caller sends media of its own
        with_media: bool,
    },
    /// Call answered with a media stream
    Answer {
        /// Call ID
        call_id: CallId,
        /// Stream sent by the answering peer
        stream_id: String,
    },
    /// Call ended by either side
    HangUp {
        /// Call ID
        call_id: CallId,
    },
    /// Error response
    Error {
        /// Related call, if any
        call_id: Option<CallId>,
        /// Error message
        error: String,
        /// Error code for programmatic handling
        error_code: String,
    },
}

impl SignalingMessage {
    /// Message type name as it appears on the wire
    pub fn message_type(&self) -> &'static str {
        match self {
            SignalingMessage::Register { .. } => "register",
            SignalingMessage::Unregister { .. } => "unregister",
            SignalingMessage::Call { .. } => "call",
            SignalingMessage::Answer { .. } => "answer",
            SignalingMessage::HangUp { .. } => "hang_up",
            SignalingMessage::Error { .. } => "error",
        }
    }

    /// Call the message belongs to
    pub fn call_id(&self) -> Option<&CallId> {
        match self {
            SignalingMessage::Call { call_id, .. }
            | SignalingMessage::Answer { call_id, .. }
            | SignalingMessage::HangUp { call_id } => Some(call_id),
            SignalingMessage::Error { call_id, .. } => call_id.as_ref(),
            _ => None,
        }
    }
}
