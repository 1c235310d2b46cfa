//! Monitor state and the status shown to the user

use crate::event::MonitorEvent;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::info;

/// Lifecycle state of the detection loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorState {
    /// Not monitoring
    Stopped,
    /// Waiting for camera access
    Starting,
    /// Detection loop running
    Monitoring,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Stopped => "stopped",
            MonitorState::Starting => "starting",
            MonitorState::Monitoring => "monitoring",
        };
        f.write_str(name)
    }
}

/// User-facing status
///
/// `MotionDetected` and `Analyzing` annotate a running monitor; the loop keeps
/// running underneath them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorStatus {
    /// Not monitoring
    Stopped,
    /// Waiting for camera access
    Starting,
    /// Watching for motion
    Monitoring,
    /// A trigger was just accepted
    MotionDetected,
    /// At least one analysis is outstanding
    Analyzing,
}

impl MonitorStatus {
    /// Status text shown to the user
    pub fn label(&self) -> &'static str {
        match self {
            MonitorStatus::Stopped => "Stopped",
            MonitorStatus::Starting => "Starting camera...",
            MonitorStatus::Monitoring => "Monitoring",
            MonitorStatus::MotionDetected => "Motion detected!",
            MonitorStatus::Analyzing => "Analyzing...",
        }
    }

    /// Whether the camera is in use
    pub fn is_active(&self) -> bool {
        !matches!(self, MonitorStatus::Stopped)
    }
}

impl From<MonitorState> for MonitorStatus {
    fn from(state: MonitorState) -> Self {
        match state {
            MonitorState::Stopped => MonitorStatus::Stopped,
            MonitorState::Starting => MonitorStatus::Starting,
            MonitorState::Monitoring => MonitorStatus::Monitoring,
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
struct BoardInner {
    state: Mutex<MonitorState>,
    status: watch::Sender<MonitorStatus>,
    events: broadcast::Sender<MonitorEvent>,
}

/// Shared monitor state and status, published to subscribers on change
#[derive(Debug, Clone)]
pub struct StatusBoard {
    inner: Arc<BoardInner>,
}

impl StatusBoard {
    /// Create a board in the `Stopped` state
    pub fn new(events: broadcast::Sender<MonitorEvent>) -> Self {
        let (status, _) = watch::channel(MonitorStatus::Stopped);
        Self {
            inner: Arc::new(BoardInner {
                state: Mutex::new(MonitorState::Stopped),
                status,
                events,
            }),
        }
    }

    /// Current state
    pub fn state(&self) -> MonitorState {
        *self.inner.state.lock()
    }

    /// Current status
    pub fn status(&self) -> MonitorStatus {
        *self.inner.status.borrow()
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.inner.status.subscribe()
    }

    /// Move to `state`, returning the previous one
    pub fn set_state(&self, state: MonitorState) -> MonitorState {
        let mut current = self.inner.state.lock();
        let previous = std::mem::replace(&mut *current, state);
        if previous != state {
            info!(from = %previous, to = %state, "Monitor state changed");
        }
        self.publish(state.into());
        previous
    }

    /// Move from `from` to `to` only if currently in `from`
    pub fn transition(&self, from: MonitorState, to: MonitorState) -> bool {
        let mut current = self.inner.state.lock();
        if *current != from {
            return false;
        }
        *current = to;
        info!(from = %from, to = %to, "Monitor state changed");
        self.publish(to.into());
        true
    }

    /// Annotate a running monitor with a detected motion
    pub fn motion_detected(&self) {
        self.publish_while_monitoring(MonitorStatus::MotionDetected);
    }

    /// Annotate a running monitor with an outstanding analysis
    pub fn analyzing(&self) {
        self.publish_while_monitoring(MonitorStatus::Analyzing);
    }

    /// Drop the `Analyzing` annotation once nothing is outstanding
    pub fn analyses_settled(&self, outstanding: usize) {
        if outstanding == 0 {
            self.publish_while_monitoring(MonitorStatus::Monitoring);
        }
    }

    // Published under the state lock: status never outlives a state change
    fn publish_while_monitoring(&self, status: MonitorStatus) {
        let state = self.inner.state.lock();
        if *state == MonitorState::Monitoring {
            self.publish(status);
        }
    }

    fn publish(&self, status: MonitorStatus) {
        if self.inner.status.send_replace(status) != status {
            let _ = self.inner.events.send(MonitorEvent::StatusChanged { status });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> (StatusBoard, broadcast::Receiver<MonitorEvent>) {
        let (events, rx) = broadcast::channel(16);
        (StatusBoard::new(events), rx)
    }

    #[test]
    fn test_labels() {
        assert_eq!(MonitorStatus::Stopped.label(), "Stopped");
        assert_eq!(MonitorStatus::Starting.label(), "Starting camera...");
        assert_eq!(MonitorStatus::Monitoring.label(), "Monitoring");
        assert_eq!(MonitorStatus::MotionDetected.label(), "Motion detected!");
        assert_eq!(MonitorStatus::Analyzing.label(), "Analyzing...");
        assert_eq!(MonitorStatus::Analyzing.to_string(), "Analyzing...");
    }

    #[test]
    fn test_annotations_only_while_monitoring() {
        let (board, _rx) = board();
        board.analyzing();
        assert_eq!(board.status(), MonitorStatus::Stopped);

        board.set_state(MonitorState::Monitoring);
        board.motion_detected();
        assert_eq!(board.status(), MonitorStatus::MotionDetected);
        board.analyzing();
        assert_eq!(board.status(), MonitorStatus::Analyzing);

        board.analyses_settled(1);
        assert_eq!(board.status(), MonitorStatus::Analyzing);
        board.analyses_settled(0);
        assert_eq!(board.status(), MonitorStatus::Monitoring);
    }

    #[test]
    fn test_annotations_racing_stop_leave_stopped() {
        for _ in 0..200 {
            let (board, _rx) = board();
            board.set_state(MonitorState::Monitoring);

            let annotator = {
                let board = board.clone();
                std::thread::spawn(move || {
                    board.analyzing();
                    board.analyses_settled(0);
                    board.motion_detected();
                })
            };
            board.set_state(MonitorState::Stopped);
            annotator.join().unwrap();

            assert_eq!(board.state(), MonitorState::Stopped);
            assert_eq!(board.status(), MonitorStatus::Stopped);
        }
    }

    #[test]
    fn test_transition_guard() {
        let (board, _rx) = board();
        assert!(!board.transition(MonitorState::Starting, MonitorState::Monitoring));
        assert!(board.transition(MonitorState::Stopped, MonitorState::Starting));
        assert_eq!(board.state(), MonitorState::Starting);
    }

    #[test]
    fn test_status_changes_broadcast_once() {
        let (board, mut rx) = board();
        board.set_state(MonitorState::Starting);
        board.set_state(MonitorState::Starting);

        assert!(matches!(
            rx.try_recv(),
            Ok(MonitorEvent::StatusChanged {
                status: MonitorStatus::Starting
            })
        ));
        assert!(rx.try_recv().is_err());
    }
}
