//! End-to-end monitor tests: frames in, detection events and analyses out

use async_trait::async_trait;
use camwatch::{
    AnalysisError, CamWatch, CamWatchError, EncodedImage, HostSession, ImageAnalyzer, LoopbackHub,
    Monitor, MonitorBuilder, MonitorEvent, MonitorState, MonitorStatus, PushVideoSource,
    SignalingError, SignalingTransport, VideoFrame, ViewerState,
};
use camwatch_signaling::IncomingCall;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;

type Reply = oneshot::Sender<Result<String, AnalysisError>>;

/// Analyzer whose calls stay pending until the test answers them
#[derive(Default)]
struct ScriptedAnalyzer {
    pending: Mutex<VecDeque<Reply>>,
}

impl ScriptedAnalyzer {
    fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    fn take_all(&self) -> Vec<Reply> {
        self.pending.lock().drain(..).collect()
    }

    fn answer_next(&self, outcome: Result<String, AnalysisError>) {
        if let Some(reply) = self.pending.lock().pop_front() {
            let _ = reply.send(outcome);
        }
    }
}

#[async_trait]
impl ImageAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, image: &EncodedImage) -> Result<String, AnalysisError> {
        assert!(!image.is_empty());
        let (tx, rx) = oneshot::channel();
        self.pending.lock().push_back(tx);
        rx.await.unwrap_or_else(|_| {
            Err(AnalysisError::Network {
                reason: "test dropped the call".to_string(),
            })
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct Rig {
    monitor: Monitor,
    source: Arc<PushVideoSource>,
    analyzer: Arc<ScriptedAnalyzer>,
}

fn rig() -> Rig {
    let source = Arc::new(PushVideoSource::new());
    let analyzer = Arc::new(ScriptedAnalyzer::default());
    let monitor = MonitorBuilder::new()
        .cooldown(Duration::ZERO)
        .raster_size(64, 48)
        .tick_period(Duration::from_millis(5))
        .video_source(source.clone())
        .analyzer(analyzer.clone())
        .build()
        .unwrap();
    Rig {
        monitor,
        source,
        analyzer,
    }
}

fn frame(level: u8) -> VideoFrame {
    VideoFrame::solid(64, 48, [level, level, level], 0)
}

async fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {}", what);
}

impl Rig {
    /// Start monitoring and let the loop take its reference frame
    async fn start_primed(&self) {
        self.monitor.start().await.unwrap();
        self.source.push(frame(0)).unwrap();
        wait_for("reference frame", || self.monitor.stats().primed_ticks > 0).await;
    }

    /// Push a frame that differs from the previous one and wait for its event
    async fn trigger(&self, level: u8) {
        let before = self.monitor.detection_events().len();
        self.source.push(frame(level)).unwrap();
        wait_for("detection event", || {
            self.monitor.detection_events().len() > before
        })
        .await;
    }
}

// ============================================================================
// Detection and analysis
// ============================================================================

#[tokio::test]
async fn test_events_newest_first_and_resolved_once() {
    let rig = rig();
    rig.start_primed().await;

    for level in [200, 0, 200] {
        rig.trigger(level).await;
    }
    wait_for("three analysis calls", || rig.analyzer.pending() == 3).await;

    let events = rig.monitor.detection_events();
    assert_eq!(events.len(), 3);
    assert!(events.windows(2).all(|pair| pair[0].id > pair[1].id));
    assert!(events.iter().all(|event| event.is_analyzing));

    // Answer in reverse order of arrival
    for (index, reply) in rig.analyzer.take_all().into_iter().enumerate().rev() {
        let _ = reply.send(Ok(format!("answer {}", index)));
    }
    wait_for("all analyses", || rig.monitor.pipeline().outstanding() == 0).await;

    let events = rig.monitor.detection_events();
    let answers: HashSet<_> = events
        .iter()
        .map(|event| event.analysis.clone().unwrap())
        .collect();
    assert_eq!(answers.len(), 3);
    assert!(events.iter().all(|event| !event.is_analyzing));

    let first = events[0].id;
    assert!(!rig
        .monitor
        .pipeline()
        .complete(first, Ok("second answer".to_string())));
    assert_ne!(
        rig.monitor.pipeline().event(first).unwrap().analysis.as_deref(),
        Some("second answer")
    );

    rig.monitor.stop();
}

#[tokio::test]
async fn test_failed_analysis_does_not_stop_loop() {
    let rig = rig();
    rig.start_primed().await;

    rig.trigger(200).await;
    wait_for("first call", || rig.analyzer.pending() == 1).await;
    rig.analyzer.answer_next(Err(AnalysisError::Network {
        reason: "offline".to_string(),
    }));
    wait_for("failure applied", || rig.monitor.pipeline().outstanding() == 0).await;

    let failed = rig.monitor.detection_events().remove(0);
    assert_eq!(
        failed.analysis.as_deref(),
        Some("Analysis failed: network error: offline")
    );
    assert_eq!(rig.monitor.state(), MonitorState::Monitoring);

    rig.trigger(0).await;
    wait_for("second call", || rig.analyzer.pending() == 1).await;
    rig.analyzer.answer_next(Ok("A cat on the sofa".to_string()));
    wait_for("second analysis", || rig.monitor.pipeline().outstanding() == 0).await;

    let events = rig.monitor.detection_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].analysis.as_deref(), Some("A cat on the sofa"));

    rig.monitor.stop();
}

#[tokio::test]
async fn test_late_result_applied_after_stop() {
    let rig = rig();
    rig.start_primed().await;

    rig.trigger(200).await;
    wait_for("analysis call", || rig.analyzer.pending() == 1).await;
    rig.monitor.stop();
    assert_eq!(rig.monitor.status(), MonitorStatus::Stopped);

    rig.analyzer.answer_next(Ok("Delivery driver".to_string()));
    wait_for("late analysis", || rig.monitor.pipeline().outstanding() == 0).await;

    let event = rig.monitor.detection_events().remove(0);
    assert_eq!(event.analysis.as_deref(), Some("Delivery driver"));
    assert_eq!(rig.monitor.status(), MonitorStatus::Stopped);
}

#[tokio::test]
async fn test_quiet_scene_creates_no_events() {
    let rig = rig();
    rig.start_primed().await;

    // 15 per channel scores 45, under the default sensitivity of 50
    rig.source.push(frame(15)).unwrap();
    wait_for("changed frame scored", || rig.monitor.stats().peak_score >= 45.0).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(rig.monitor.detection_events().is_empty());
    assert_eq!(rig.monitor.stats().triggers, 0);
    rig.monitor.stop();
}

// ============================================================================
// Status and notifications
// ============================================================================

#[tokio::test]
async fn test_status_follows_analysis() {
    let rig = rig();
    let mut events = rig.monitor.events();
    rig.start_primed().await;
    assert_eq!(rig.monitor.status().label(), "Monitoring");

    rig.trigger(200).await;
    assert_eq!(rig.monitor.status(), MonitorStatus::Analyzing);
    assert_eq!(rig.monitor.status().label(), "Analyzing...");

    wait_for("analysis call", || rig.analyzer.pending() == 1).await;
    rig.analyzer.answer_next(Ok("Empty hallway".to_string()));
    let mut status = rig.monitor.watch_status();
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|status| *status == MonitorStatus::Monitoring),
    )
    .await
    .unwrap()
    .unwrap();

    let mut seen = Vec::new();
    while let Some(event) = events.try_next() {
        seen.push(event.event_type());
    }
    let position = |name: &str| seen.iter().position(|seen| *seen == name).unwrap();
    assert!(position("motion_detected") < position("event_created"));
    assert!(position("event_created") < position("analysis_completed"));

    rig.monitor.stop();
}

// ============================================================================
// Remote viewing
// ============================================================================

#[tokio::test]
async fn test_host_answers_viewer_while_monitoring() {
    let rig = rig();
    let hub = LoopbackHub::new();
    let camwatch = CamWatch::init().unwrap();

    let host = camwatch
        .host(rig.monitor.clone(), Arc::new(hub.transport()))
        .await;
    assert!(host.remote_viewing_available());
    let camera_id = host.local_id().unwrap().to_string();

    let viewer = camwatch
        .view(Arc::new(hub.transport()), Some(camera_id.as_str()))
        .await;
    // Not monitoring yet: the call waits
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(matches!(viewer.state(), ViewerState::Connecting { .. }));

    rig.start_primed().await;
    let state = tokio::time::timeout(Duration::from_secs(5), viewer.wait_until_settled())
        .await
        .unwrap();
    let ViewerState::Watching { stream, .. } = &state else {
        panic!("expected a live stream, got {:?}", state);
    };
    assert!(stream.same_stream(&rig.monitor.stream().unwrap()));

    host.shutdown().await;
    assert_eq!(rig.monitor.state(), MonitorState::Stopped);
}

struct OfflineTransport;

#[async_trait]
impl SignalingTransport for OfflineTransport {
    async fn open(&self) -> Result<camwatch::PeerId, SignalingError> {
        Err(SignalingError::Transport {
            reason: "service unreachable".to_string(),
        })
    }

    fn incoming_calls(&self) -> Result<UnboundedReceiver<IncomingCall>, SignalingError> {
        Err(SignalingError::NotOpen)
    }

    async fn call(
        &self,
        _remote: &camwatch::PeerId,
        _local_stream: camwatch::MediaStream,
    ) -> Result<camwatch_signaling::OutgoingCall, SignalingError> {
        Err(SignalingError::NotOpen)
    }

    async fn destroy(&self) {}
}

#[tokio::test]
async fn test_signaling_failure_keeps_local_monitoring() {
    let rig = rig();
    let mut events = rig.monitor.events();

    let host: HostSession = CamWatch::init()
        .unwrap()
        .host(rig.monitor.clone(), Arc::new(OfflineTransport))
        .await;
    assert!(!host.remote_viewing_available());
    assert!(host.local_id().is_none());
    assert!(host
        .signaling_error()
        .unwrap()
        .contains("service unreachable"));
    assert!(matches!(
        events.try_next(),
        Some(MonitorEvent::SignalingUnavailable { .. })
    ));

    rig.start_primed().await;
    rig.trigger(200).await;
    assert_eq!(rig.monitor.detection_events().len(), 1);
    host.shutdown().await;
}

#[tokio::test]
async fn test_permission_denied_reported() {
    let rig = rig();
    rig.source.fail_next_acquire(camwatch::MediaError::PermissionDenied {
        operation: "camera access".to_string(),
    });

    let err = rig.monitor.start().await.unwrap_err();
    assert!(matches!(err, CamWatchError::PermissionDenied { .. }));
    assert_eq!(rig.monitor.state(), MonitorState::Stopped);

    // A later start can still succeed
    rig.start_primed().await;
    assert_eq!(rig.monitor.state(), MonitorState::Monitoring);
    rig.monitor.stop();
}
