//! Detection events and monitor notifications

use crate::status::MonitorStatus;
use camwatch_media::EncodedImage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Identifier of a detection event: capture time in Unix milliseconds,
/// bumped when needed so IDs strictly increase within a session
pub type EventId = u64;

/// A captured motion trigger and its analysis
#[derive(Debug, Clone, Serialize)]
pub struct DetectionEvent {
    /// Event ID
    pub id: EventId,
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Triggering frame
    pub image: EncodedImage,
    /// Description of the frame, or a failure placeholder; `None` until resolved
    pub analysis: Option<String>,
    /// True from creation until the analysis resolves
    pub is_analyzing: bool,
}

/// Newest-first list of detection events for the current session
///
/// Each event is resolved at most once; later resolutions for the same ID
/// are ignored.
#[derive(Debug, Default)]
pub struct EventLog {
    events: VecDeque<DetectionEvent>,
    last_id: Option<EventId>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self, at: DateTime<Utc>) -> EventId {
        let millis = u64::try_from(at.timestamp_millis()).unwrap_or(0);
        let id = match self.last_id {
            Some(last) if millis <= last => last + 1,
            _ => millis,
        };
        self.last_id = Some(id);
        id
    }

    /// Prepend a new, unresolved event captured at `at`
    pub fn create(&mut self, image: EncodedImage, at: DateTime<Utc>) -> DetectionEvent {
        let event = DetectionEvent {
            id: self.next_id(at),
            timestamp: at,
            image,
            analysis: None,
            is_analyzing: true,
        };
        self.events.push_front(event.clone());
        event
    }

    /// Record the analysis for `id`
    ///
    /// Returns `false` if the event is unknown or already resolved.
    pub fn resolve(&mut self, id: EventId, analysis: String) -> bool {
        let Some(event) = self.events.iter_mut().find(|event| event.id == id) else {
            warn!(event_id = id, "Analysis result for unknown event");
            return false;
        };
        if !event.is_analyzing {
            warn!(event_id = id, "Ignoring second analysis result");
            return false;
        }
        event.analysis = Some(analysis);
        event.is_analyzing = false;
        debug!(event_id = id, "Event resolved");
        true
    }

    /// Event with `id`
    pub fn get(&self, id: EventId) -> Option<&DetectionEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Events, newest first
    pub fn iter(&self) -> impl Iterator<Item = &DetectionEvent> {
        self.events.iter()
    }

    /// Snapshot of all events, newest first
    pub fn snapshot(&self) -> Vec<DetectionEvent> {
        self.events.iter().cloned().collect()
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events still waiting for analysis
    pub fn outstanding(&self) -> usize {
        self.events.iter().filter(|event| event.is_analyzing).count()
    }
}

/// Notifications published by a running monitor
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// The user-facing status changed
    StatusChanged {
        /// New status
        status: MonitorStatus,
    },
    /// A tick scored above the threshold and passed the cooldown
    MotionDetected {
        /// Motion score
        score: f64,
    },
    /// A detection event was added to the log
    EventCreated {
        /// The new event
        event: DetectionEvent,
    },
    /// A detection event received its analysis
    AnalysisCompleted {
        /// Event ID
        event_id: EventId,
        /// Description or failure placeholder
        analysis: String,
        /// Whether the analysis call succeeded
        succeeded: bool,
    },
    /// Remote viewing is unavailable; monitoring continues
    SignalingUnavailable {
        /// Reason reported by the transport
        reason: String,
    },
    /// An error occurred
    Error {
        /// Error that occurred
        error: String,
        /// Whether monitoring continues
        recoverable: bool,
    },
}

impl MonitorEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            MonitorEvent::StatusChanged { .. } => "status_changed",
            MonitorEvent::MotionDetected { .. } => "motion_detected",
            MonitorEvent::EventCreated { .. } => "event_created",
            MonitorEvent::AnalysisCompleted { .. } => "analysis_completed",
            MonitorEvent::SignalingUnavailable { .. } => "signaling_unavailable",
            MonitorEvent::Error { .. } => "error",
        }
    }

    /// Check if this is an error event
    pub fn is_error_event(&self) -> bool {
        matches!(
            self,
            MonitorEvent::Error { .. } | MonitorEvent::SignalingUnavailable { .. }
        )
    }

    /// Check if this event concerns the detection event log
    pub fn is_detection_event(&self) -> bool {
        matches!(
            self,
            MonitorEvent::EventCreated { .. } | MonitorEvent::AnalysisCompleted { .. }
        )
    }
}

/// Receiving end of a monitor's notifications
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<MonitorEvent>,
}

impl EventStream {
    /// Wrap a broadcast receiver
    pub fn new(receiver: broadcast::Receiver<MonitorEvent>) -> Self {
        Self { receiver }
    }

    /// Next notification; `None` once the monitor is gone
    ///
    /// Notifications dropped because the subscriber fell behind are skipped.
    pub async fn next(&mut self) -> Option<MonitorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next notification if one is ready
    pub fn try_next(&mut self) -> Option<MonitorEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn image() -> EncodedImage {
        EncodedImage::jpeg(vec![1, 2, 3], 2, 2)
    }

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_newest_first() {
        let mut log = EventLog::new();
        let first = log.create(image(), at(1_000));
        let second = log.create(image(), at(2_000));

        let ids: Vec<_> = log.iter().map(|event| event.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(first.id, 1_000);
        assert!(first.is_analyzing);
        assert!(first.analysis.is_none());
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut log = EventLog::new();
        let a = log.create(image(), at(5_000));
        let b = log.create(image(), at(5_000));
        let c = log.create(image(), at(4_000));
        assert_eq!(a.id, 5_000);
        assert_eq!(b.id, 5_001);
        assert_eq!(c.id, 5_002);
    }

    #[test]
    fn test_resolve_once() {
        let mut log = EventLog::new();
        let event = log.create(image(), at(1_000));
        assert_eq!(log.outstanding(), 1);

        assert!(log.resolve(event.id, "A cat".to_string()));
        assert!(!log.resolve(event.id, "A dog".to_string()));
        assert!(!log.resolve(42, "nobody".to_string()));

        let stored = log.get(event.id).unwrap();
        assert_eq!(stored.analysis.as_deref(), Some("A cat"));
        assert!(!stored.is_analyzing);
        assert_eq!(log.outstanding(), 0);
    }

    #[test]
    fn test_event_type_classification() {
        let created = MonitorEvent::EventCreated {
            event: EventLog::new().create(image(), at(1)),
        };
        assert_eq!(created.event_type(), "event_created");
        assert!(created.is_detection_event());
        assert!(!created.is_error_event());

        let unavailable = MonitorEvent::SignalingUnavailable {
            reason: "offline".to_string(),
        };
        assert!(unavailable.is_error_event());
    }

    #[tokio::test]
    async fn test_event_stream_basic() {
        let (tx, rx) = broadcast::channel(4);
        let mut stream = EventStream::new(rx);

        tx.send(MonitorEvent::MotionDetected { score: 70.0 }).unwrap();
        let event = stream.next().await.unwrap();
        assert_eq!(event.event_type(), "motion_detected");

        assert!(stream.try_next().is_none());
        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
