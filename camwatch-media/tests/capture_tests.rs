//! Capture to snapshot: sources feeding the differ and the still encoder

use camwatch_media::*;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn small() -> VideoConstraints {
    VideoConstraints {
        device_id: None,
        resolution: VideoResolution::new(64, 48),
        framerate: 60.0,
    }
}

async fn next_frame(stream: &MediaStream) -> std::sync::Arc<VideoFrame> {
    let mut frames = stream.subscribe();
    tokio::time::timeout(Duration::from_secs(5), frames.changed())
        .await
        .expect("a frame should arrive")
        .expect("stream should stay open");
    let frame = frames.borrow().clone();
    frame.expect("changed implies a frame")
}

// ============================================================================
// Sources and motion scoring
// ============================================================================

#[tokio::test]
async fn test_still_scene_scores_zero() {
    let source = SyntheticVideoSource::new();
    let stream = assert_ok!(source.acquire(&small()).await);
    let mut differ = FrameDiffer::new(32, 24);

    let first = next_frame(&stream).await;
    assert_eq!(assert_ok!(differ.observe(&first)), None);
    let second = next_frame(&stream).await;
    assert_eq!(assert_ok!(differ.observe(&second)), Some(0.0));

    source.release(&stream);
    assert!(!stream.is_active());
}

#[tokio::test]
async fn test_moving_object_scores_motion() {
    let source = SyntheticVideoSource::new().with_moving_object(true);
    let stream = assert_ok!(source.acquire(&small()).await);
    let mut differ = FrameDiffer::new(64, 48);

    let first = next_frame(&stream).await;
    differ.observe(&first).unwrap();
    let second = next_frame(&stream).await;
    let score = assert_ok!(differ.observe(&second)).unwrap();
    assert!(score > 0.0, "moving block should register, got {}", score);

    source.release(&stream);
}

#[tokio::test]
async fn test_denied_camera() {
    let err = assert_err!(SyntheticVideoSource::denied().acquire(&small()).await);
    assert!(matches!(err, MediaError::PermissionDenied { .. }));
    assert_eq!(err.category(), ErrorCategory::Permission);
}

#[tokio::test]
async fn test_push_source_reopens_after_release() {
    let source = PushVideoSource::new();
    assert!(matches!(
        source.push(VideoFrame::solid(4, 4, [0, 0, 0], 0)),
        Err(MediaError::CaptureNotActive)
    ));

    let first = assert_ok!(source.acquire(&small()).await);
    assert_ok!(source.push(VideoFrame::solid(4, 4, [9, 9, 9], 1)));
    assert_eq!(first.current_frame().unwrap().timestamp, 1);
    source.release(&first);
    assert!(source.stream().is_none());

    let second = assert_ok!(source.acquire(&small()).await);
    assert!(!second.same_stream(&first));
    assert!(second.current_frame().is_none());
}

// ============================================================================
// Snapshots
// ============================================================================

#[tokio::test]
async fn test_snapshot_of_live_frame_decodes() {
    let source = SyntheticVideoSource::new().with_moving_object(true);
    let stream = assert_ok!(source.acquire(&small()).await);
    let frame = next_frame(&stream).await;
    source.release(&stream);

    let image = assert_ok!(StillEncoder::new(DEFAULT_JPEG_QUALITY).unwrap().encode(&frame));
    assert_eq!((image.width, image.height), (64, 48));
    assert!(image.to_data_url().starts_with("data:image/jpeg;base64,"));

    let decoded = image::load_from_memory(&image.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
}
