//! Analysis pipeline
//!
//! Turns triggering frames into detection events and resolves each one with a
//! description from an [`ImageAnalyzer`]. Submission never waits on the
//! analyzer: the event is logged immediately and the call runs in the
//! background. Results are applied whenever they arrive, including after
//! monitoring has stopped.

use crate::event::{DetectionEvent, EventId, EventLog, MonitorEvent};
use crate::status::StatusBoard;
use async_trait::async_trait;
use camwatch_core::CamWatchError;
use camwatch_media::EncodedImage;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Failures of a single analysis call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The service answered without any text
    #[error("empty response from analysis service")]
    EmptyResponse,

    /// The service reported an error or returned something unreadable
    #[error("service error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Service {
        /// HTTP status, when there was one
        status: Option<u16>,
        /// Error message
        message: String,
    },

    /// The service could not be reached
    #[error("network error: {reason}")]
    Network {
        /// Reason for the failure
        reason: String,
    },

    /// No answer within the configured timeout
    #[error("timed out after {after:?}")]
    Timeout {
        /// Configured timeout
        after: Duration,
    },
}

impl AnalysisError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AnalysisError::EmptyResponse => "EMPTY_RESPONSE",
            AnalysisError::Service { .. } => "SERVICE_ERROR",
            AnalysisError::Network { .. } => "NETWORK_ERROR",
            AnalysisError::Timeout { .. } => "TIMEOUT",
        }
    }

    /// Placeholder stored on an event whose analysis failed
    pub fn placeholder(&self) -> String {
        format!("Analysis failed: {}", self)
    }
}

impl From<AnalysisError> for CamWatchError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Timeout { after } => CamWatchError::Timeout {
                operation: "image analysis".to_string(),
                duration: after,
            },
            other => CamWatchError::Analysis {
                reason: other.to_string(),
            },
        }
    }
}

/// Remote image description capability
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Describe `image`
    async fn analyze(&self, image: &EncodedImage) -> Result<String, AnalysisError>;

    /// Analyzer name for logs
    fn name(&self) -> &str;
}

/// Owns the event log and dispatches analysis calls
#[derive(Clone)]
pub struct AnalysisPipeline {
    analyzer: Arc<dyn ImageAnalyzer>,
    log: Arc<RwLock<EventLog>>,
    events: broadcast::Sender<MonitorEvent>,
    status: Option<StatusBoard>,
    timeout: Option<Duration>,
}

impl AnalysisPipeline {
    /// Create a pipeline publishing to `events`
    pub fn new(analyzer: Arc<dyn ImageAnalyzer>, events: broadcast::Sender<MonitorEvent>) -> Self {
        Self {
            analyzer,
            log: Arc::new(RwLock::new(EventLog::new())),
            events,
            status: None,
            timeout: None,
        }
    }

    /// Bound each analysis call
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Keep `status` informed about outstanding analyses
    pub fn with_status(mut self, status: StatusBoard) -> Self {
        self.status = Some(status);
        self
    }

    /// Log a new event for `image` and start analysing it
    pub fn submit(&self, image: EncodedImage) -> EventId {
        self.submit_at(image, Utc::now())
    }

    /// Log a new event captured at `at` and start analysing it
    pub fn submit_at(&self, image: EncodedImage, at: DateTime<Utc>) -> EventId {
        let event = self.log.write().create(image.clone(), at);
        let id = event.id;
        info!(event_id = id, bytes = image.len(), "Detection event created");
        let _ = self.events.send(MonitorEvent::EventCreated { event });

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let pipeline = self.clone();
                runtime.spawn(async move {
                    let outcome = pipeline.run_analysis(&image).await;
                    pipeline.complete(id, outcome);
                });
            }
            Err(e) => {
                // Nothing can run the call; resolve so the event is not stuck
                self.complete(
                    id,
                    Err(AnalysisError::Network {
                        reason: format!("no async runtime: {}", e),
                    }),
                );
            }
        }
        id
    }

    async fn run_analysis(&self, image: &EncodedImage) -> Result<String, AnalysisError> {
        let call = self.analyzer.analyze(image);
        let result = match self.timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .unwrap_or(Err(AnalysisError::Timeout { after })),
            None => call.await,
        };
        match result {
            Ok(text) if text.trim().is_empty() => Err(AnalysisError::EmptyResponse),
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => Err(e),
        }
    }

    /// Apply the outcome of the analysis for `id`
    ///
    /// Returns `false` if the event was already resolved.
    pub fn complete(&self, id: EventId, outcome: Result<String, AnalysisError>) -> bool {
        let succeeded = outcome.is_ok();
        let analysis = match outcome {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    event_id = id,
                    analyzer = self.analyzer.name(),
                    error = %e,
                    "Analysis failed"
                );
                e.placeholder()
            }
        };

        let (applied, outstanding) = {
            let mut log = self.log.write();
            let applied = log.resolve(id, analysis.clone());
            (applied, log.outstanding())
        };
        if !applied {
            return false;
        }

        debug!(event_id = id, succeeded, outstanding, "Analysis applied");
        let _ = self.events.send(MonitorEvent::AnalysisCompleted {
            event_id: id,
            analysis,
            succeeded,
        });
        if let Some(status) = &self.status {
            status.analyses_settled(outstanding);
        }
        true
    }

    /// Snapshot of all events, newest first
    pub fn events(&self) -> Vec<DetectionEvent> {
        self.log.read().snapshot()
    }

    /// Event with `id`
    pub fn event(&self, id: EventId) -> Option<DetectionEvent> {
        self.log.read().get(id).cloned()
    }

    /// Events still waiting for analysis
    pub fn outstanding(&self) -> usize {
        self.log.read().outstanding()
    }

    /// Analyzer in use
    pub fn analyzer(&self) -> &Arc<dyn ImageAnalyzer> {
        &self.analyzer
    }
}

impl std::fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("analyzer", &self.analyzer.name())
            .field("timeout", &self.timeout)
            .field("events", &self.log.read().len())
            .finish()
    }
}
