//! # camwatch signaling
//!
//! Peer signaling for remote viewing. A camera host registers with a
//! signaling service and answers viewer calls with its live stream; a viewer
//! calls the host by session ID and attaches the stream it gets back.
//!
//! The transport is a capability ([`SignalingTransport`]). [`LoopbackHub`]
//! provides an in-process implementation.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod hub;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod viewer;

// Re-export main types
pub use error::{SignalingError, SignalingResult, ViewerError};
pub use hub::{LoggedMessage, LoopbackHub, LoopbackTransport};
pub use protocol::{CallId, PeerId, SignalingMessage};
pub use session::StreamSessionManager;
pub use transport::{CallEvent, CallReply, IncomingCall, OutgoingCall, SignalingTransport};
pub use viewer::{Viewer, ViewerState};
