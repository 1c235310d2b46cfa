//! Page routing: host versus viewer, share links and viewer failures

use async_trait::async_trait;
use camwatch::{
    AnalysisError, CamWatch, CamWatchError, EncodedImage, GlobalConfig, ImageAnalyzer, Launched,
    LoopbackHub, MonitorBuilder, PushVideoSource, ViewerError, ViewerState,
};
use std::sync::Arc;
use std::time::Duration;

struct Describe;

#[async_trait]
impl ImageAnalyzer for Describe {
    async fn analyze(&self, _image: &EncodedImage) -> Result<String, AnalysisError> {
        Ok("Nothing unusual".to_string())
    }

    fn name(&self) -> &str {
        "describe"
    }
}

fn builder() -> MonitorBuilder {
    MonitorBuilder::new()
        .video_source(Arc::new(PushVideoSource::new()))
        .analyzer(Arc::new(Describe))
}

fn camwatch() -> CamWatch {
    CamWatch::init_with(GlobalConfig {
        share_base_url: Some("https://cam.example.com/watch#live".to_string()),
        ..Default::default()
    })
    .unwrap()
}

async fn settled(state: impl std::future::Future<Output = ViewerState>) -> ViewerState {
    tokio::time::timeout(Duration::from_secs(5), state)
        .await
        .expect("viewer should settle")
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_plain_url_launches_host_with_share_link() {
    let camwatch = camwatch();
    let hub = LoopbackHub::new();

    let launched = camwatch
        .launch(
            "https://cam.example.com/watch",
            Arc::new(hub.transport()),
            builder(),
        )
        .await
        .unwrap();
    let Launched::Host(host) = launched else {
        panic!("expected a host");
    };

    let id = host.local_id().unwrap().to_string();
    assert_eq!(
        host.share_link(),
        Some(format!("https://cam.example.com/watch?view={}", id).as_str())
    );
    assert!(hub.is_registered(host.local_id().unwrap()));
    host.shutdown().await;
}

#[tokio::test]
async fn test_share_link_opens_viewer_of_host() {
    let camwatch = camwatch();
    let hub = LoopbackHub::new();

    let Launched::Host(host) = camwatch
        .launch("https://cam.example.com/", Arc::new(hub.transport()), builder())
        .await
        .unwrap()
    else {
        panic!("expected a host");
    };
    host.monitor().start().await.unwrap();

    let link = host.share_link().unwrap().to_string();
    let Launched::Viewer(viewer) = camwatch
        .launch(&link, Arc::new(hub.transport()), builder())
        .await
        .unwrap()
    else {
        panic!("expected a viewer");
    };

    let state = settled(viewer.wait_until_settled()).await;
    assert!(matches!(state, ViewerState::Watching { .. }));

    host.shutdown().await;
    let mut states = viewer.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| matches!(state, ViewerState::Failed(ViewerError::RemoteClosed))),
    )
    .await
    .unwrap()
    .unwrap();
}

#[tokio::test]
async fn test_empty_view_param_reports_missing_id() {
    let camwatch = camwatch();
    let hub = LoopbackHub::new();

    let Launched::Viewer(viewer) = camwatch
        .launch(
            "https://cam.example.com/?view=",
            Arc::new(hub.transport()),
            builder(),
        )
        .await
        .unwrap()
    else {
        panic!("expected a viewer");
    };

    assert!(matches!(
        settled(viewer.wait_until_settled()).await,
        ViewerState::Failed(ViewerError::NoRemoteId)
    ));
    assert_eq!(hub.peer_count(), 0);
}

#[tokio::test]
async fn test_unknown_camera_fails_connection() {
    let camwatch = camwatch();
    let hub = LoopbackHub::new();

    let viewer = camwatch
        .view(Arc::new(hub.transport()), Some("no-such-camera"))
        .await;
    let state = settled(viewer.wait_until_settled()).await;
    let ViewerState::Failed(ViewerError::CallFailed { reason }) = &state else {
        panic!("expected a failed call, got {:?}", state);
    };
    assert!(reason.contains("no-such-camera"));
}

#[tokio::test]
async fn test_host_launch_validates_monitor() {
    let camwatch = camwatch();
    let hub = LoopbackHub::new();

    let result = camwatch
        .launch(
            "https://cam.example.com/",
            Arc::new(hub.transport()),
            MonitorBuilder::new(),
        )
        .await;
    assert!(matches!(
        result,
        Err(CamWatchError::MissingConfiguration { .. })
    ));
    assert_eq!(hub.peer_count(), 0);
}

#[test]
fn test_invalid_share_base_rejected() {
    let result = CamWatch::init_with(GlobalConfig {
        share_base_url: Some("not a url".to_string()),
        ..Default::default()
    });
    assert!(matches!(result, Err(CamWatchError::InvalidUrl { .. })));
}

#[tokio::test]
async fn test_unparseable_page_url() {
    let result = camwatch()
        .launch("::", Arc::new(LoopbackHub::new().transport()), builder())
        .await;
    assert!(matches!(result, Err(CamWatchError::InvalidUrl { .. })));
}
