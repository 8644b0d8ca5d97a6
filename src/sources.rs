use crate::recording::DeviceRef;
use anyhow::Result;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

/// Notifications produced by a running stream encoder, in order.
#[derive(Debug, Clone)]
pub enum EncoderEvent {
    Chunk(Bytes),
    /// The stream became unusable. No further events follow.
    #[allow(dead_code)]
    Error(String),
    /// The encoder flushed its last chunk and finalized.
    Stopped,
}

/// A started encoder. Sending on (or dropping) `stop` asks it to flush and
/// finalize; it must then deliver any remaining chunk followed by
/// [`EncoderEvent::Stopped`].
pub struct EncoderHandle {
    pub events: mpsc::UnboundedReceiver<EncoderEvent>,
    pub stop: oneshot::Sender<()>,
}

/// A live camera stream able to feed an encoder.
pub trait MediaStream: Send + Sync {
    fn start_encoder(&self, mime_type: &str) -> Result<EncoderHandle>;
}

/// A socket delivering one wire-format frame per text message. The host owns
/// its lifecycle; subscribers only listen.
pub trait FrameSocket: Send + Sync {
    fn url(&self) -> &str;
    fn subscribe(&self) -> broadcast::Receiver<String>;
}

#[derive(Clone)]
pub struct VideoSource {
    pub device: DeviceRef,
    pub stream: Arc<dyn MediaStream>,
}

#[derive(Clone)]
pub struct FloorSource {
    pub url: String,
    pub socket: Arc<dyn FrameSocket>,
}

impl FloorSource {
    pub fn new(socket: Arc<dyn FrameSocket>) -> Self {
        FloorSource { url: socket.url().to_string(), socket }
    }
}

/// Sources attached at a point in time.
#[derive(Clone, Default)]
pub struct SourceSnapshot {
    pub videos: Vec<VideoSource>,
    pub floors: Vec<FloorSource>,
}

/// Currently attached sources. A capture session copies this set when it
/// starts; later changes only affect the next session.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    videos: Arc<RwLock<Vec<VideoSource>>>,
    floors: Arc<RwLock<Vec<FloorSource>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a source for the same device is already attached.
    pub async fn add_video(&self, source: VideoSource) -> bool {
        let mut videos = self.videos.write().await;
        if videos.iter().any(|v| v.device.device_id == source.device.device_id) {
            return false;
        }
        tracing::info!("attached video source {}", source.device.label);
        videos.push(source);
        true
    }

    #[allow(dead_code)]
    pub async fn remove_video(&self, device_id: &str) -> Option<VideoSource> {
        let mut videos = self.videos.write().await;
        let idx = videos.iter().position(|v| v.device.device_id == device_id)?;
        let removed = videos.remove(idx);
        tracing::info!("detached video source {}", removed.device.label);
        Some(removed)
    }

    /// Returns `false` if a source with the same url is already attached.
    pub async fn add_floor(&self, source: FloorSource) -> bool {
        let mut floors = self.floors.write().await;
        if floors.iter().any(|f| f.url == source.url) {
            return false;
        }
        tracing::info!("attached floor source {}", source.url);
        floors.push(source);
        true
    }

    #[allow(dead_code)]
    pub async fn remove_floor(&self, url: &str) -> Option<FloorSource> {
        let mut floors = self.floors.write().await;
        let idx = floors.iter().position(|f| f.url == url)?;
        let removed = floors.remove(idx);
        tracing::info!("detached floor source {}", removed.url);
        Some(removed)
    }

    pub async fn snapshot(&self) -> SourceSnapshot {
        SourceSnapshot {
            videos: self.videos.read().await.clone(),
            floors: self.floors.read().await.clone(),
        }
    }
}
