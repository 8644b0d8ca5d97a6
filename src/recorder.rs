use crate::config::AppConfig;
use crate::mock::{MockCamera, MockFloorSocket};
use crate::recording::{DeviceRef, Recording};
use crate::session::SessionController;
use crate::sources::{FloorSource, SourceRegistry, VideoSource};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Attaches the configured synthetic sources and records one session of
/// `duration`.
pub async fn record_session(cfg: &AppConfig, duration: Duration) -> Result<Recording> {
    let registry = SourceRegistry::new();

    for (i, label) in cfg.mock.cameras.iter().enumerate() {
        registry
            .add_video(VideoSource {
                device: DeviceRef::video_input(format!("mock-camera-{}", i), label.clone()),
                stream: Arc::new(MockCamera::new(cfg.mock.chunk_interval_ms)),
            })
            .await;
    }

    let mut generators = Vec::new();
    for url in &cfg.mock.floors {
        let socket = Arc::new(MockFloorSocket::new(url.clone()));
        generators.push(socket.spawn_generator(cfg.mock.frame_interval_ms, cfg.mock.rows, cfg.mock.cols));
        registry.add_floor(FloorSource::new(socket)).await;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = SessionController::new(registry, &cfg.capture, move |recording| {
        let _ = tx.send(recording);
    });

    let task = controller
        .start()
        .await?
        .ok_or_else(|| anyhow!("a recording session is already running"))?;
    tracing::info!("recording for {:?}", duration);
    tokio::time::sleep(duration).await;
    controller.stop();

    let outcome = task.await.context("recording task panicked");
    for generator in generators {
        generator.abort();
    }
    outcome??;

    drop(controller);
    rx.recv()
        .await
        .ok_or_else(|| anyhow!("recording session ended without a recording"))
}
