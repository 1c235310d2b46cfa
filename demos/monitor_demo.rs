//! Motion monitor demo
//!
//! Watches a synthetic camera with a moving block and prints detection
//! events as they are created and analysed. Uses Gemini when
//! `GEMINI_API_KEY` is set, otherwise a local stand-in analyzer.
//!
//! Run with: `cargo run --example monitor_demo`

use async_trait::async_trait;
use camwatch::{
    init_logging, AnalysisError, CamWatch, EncodedImage, GeminiAnalyzer, ImageAnalyzer,
    MonitorEvent, SyntheticVideoSource,
};
use std::sync::Arc;
use std::time::Duration;

/// Describes snapshots without leaving the machine
struct LocalAnalyzer;

#[async_trait]
impl ImageAnalyzer for LocalAnalyzer {
    async fn analyze(&self, image: &EncodedImage) -> Result<String, AnalysisError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(format!(
            "Something moved ({}x{} snapshot, {} bytes)",
            image.width,
            image.height,
            image.len()
        ))
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(false)?;

    let analyzer: Arc<dyn ImageAnalyzer> = match GeminiAnalyzer::from_env() {
        Ok(gemini) => {
            println!("🤖 Using Gemini model {}", gemini.model());
            Arc::new(gemini)
        }
        Err(_) => {
            println!("🤖 GEMINI_API_KEY not set, using the local analyzer");
            Arc::new(LocalAnalyzer)
        }
    };

    let monitor = CamWatch::init()?
        .monitor()
        .sensitivity(2.0)
        .cooldown(Duration::from_secs(2))
        .video_source(Arc::new(SyntheticVideoSource::new().with_moving_object(true)))
        .analyzer(analyzer)
        .build()?;

    let mut events = monitor.events();
    monitor.start().await?;
    println!("📹 {}", monitor.status().label());

    let run_for = tokio::time::sleep(Duration::from_secs(10));
    tokio::pin!(run_for);
    loop {
        tokio::select! {
            _ = &mut run_for => break,
            event = events.next() => match event {
                Some(MonitorEvent::StatusChanged { status }) => println!("📋 {}", status),
                Some(MonitorEvent::EventCreated { event }) => {
                    println!("🚨 Event {} at {}", event.id, event.timestamp.format("%H:%M:%S"))
                }
                Some(MonitorEvent::AnalysisCompleted { event_id, analysis, .. }) => {
                    println!("   📝 {}: {}", event_id, analysis)
                }
                Some(MonitorEvent::Error { error, .. }) => println!("❌ {}", error),
                Some(_) => {}
                None => break,
            },
        }
    }

    monitor.stop();
    let stats = monitor.stats();
    println!(
        "✅ {} ticks, {} triggers, {} suppressed, worst tick {:?}",
        stats.ticks, stats.triggers, stats.suppressed_triggers, stats.worst_tick
    );
    println!("{}", stats.to_json()?);
    Ok(())
}
