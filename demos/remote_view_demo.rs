//! Remote viewing demo
//!
//! Runs a camera host and a viewer against an in-process signaling hub. The
//! viewer calls before monitoring starts and is answered once the camera is
//! live.
//!
//! Run with: `cargo run --example remote_view_demo`

use async_trait::async_trait;
use camwatch::{
    init_logging, AnalysisError, CamWatch, EncodedImage, GlobalConfig, ImageAnalyzer, Launched,
    LoopbackHub, SyntheticVideoSource, ViewerState,
};
use std::sync::Arc;
use std::time::Duration;

struct Silent;

#[async_trait]
impl ImageAnalyzer for Silent {
    async fn analyze(&self, _image: &EncodedImage) -> Result<String, AnalysisError> {
        Ok("Nothing to report".to_string())
    }

    fn name(&self) -> &str {
        "silent"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(false)?;

    let camwatch = CamWatch::init_with(GlobalConfig {
        share_base_url: Some("http://localhost:8080/".to_string()),
        ..Default::default()
    })?;
    let hub = LoopbackHub::new();
    let builder = || {
        camwatch
            .monitor()
            .video_source(Arc::new(SyntheticVideoSource::new()))
            .analyzer(Arc::new(Silent))
    };

    let Launched::Host(host) = camwatch
        .launch("http://localhost:8080/", Arc::new(hub.transport()), builder())
        .await?
    else {
        anyhow::bail!("expected the plain URL to launch a host");
    };
    let link = host
        .share_link()
        .ok_or_else(|| anyhow::anyhow!("remote viewing unavailable"))?
        .to_string();
    println!("🔗 Share link: {}", link);

    let Launched::Viewer(viewer) = camwatch
        .launch(&link, Arc::new(hub.transport()), builder())
        .await?
    else {
        anyhow::bail!("expected the share link to launch a viewer");
    };
    println!("👀 Viewer: {:?}", viewer.state());

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("📹 Starting camera");
    host.monitor().start().await?;

    match viewer.wait_until_settled().await {
        ViewerState::Watching { remote_id, stream } => {
            println!("✅ Watching {} on stream {}", remote_id, stream.id());
            tokio::time::sleep(Duration::from_secs(1)).await;
            if let Some(frame) = stream.current_frame() {
                println!("   Latest frame {}x{}", frame.width, frame.height);
            }
        }
        other => println!("❌ {:?}", other),
    }

    host.shutdown().await;
    let mut states = viewer.subscribe();
    let _ = states.wait_for(|state| state.error().is_some()).await;
    println!("👋 Viewer: {:?}", viewer.state());

    for logged in hub.message_log() {
        println!("   {} {:?}", logged.at.format("%H:%M:%S%.3f"), logged.message);
    }
    Ok(())
}
