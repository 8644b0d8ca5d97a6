use crate::sources::{EncoderEvent, EncoderHandle, FrameSocket, MediaStream};
use anyhow::Result;
use bytes::Bytes;
use rand::Rng;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

const SOCKET_CAPACITY: usize = 1024;

/// Camera stand-in producing fake encoded chunks at a fixed interval.
pub struct MockCamera {
    chunk_interval: Duration,
}

impl MockCamera {
    pub fn new(chunk_interval_ms: u64) -> Self {
        MockCamera { chunk_interval: Duration::from_millis(chunk_interval_ms.max(1)) }
    }
}

impl MediaStream for MockCamera {
    fn start_encoder(&self, mime_type: &str) -> Result<EncoderHandle> {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (stop, mut stop_rx) = oneshot::channel();
        let interval = self.chunk_interval;
        let mime_type = mime_type.to_string();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            let mut seq = 0u64;
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let chunk = Bytes::from(format!("[{} chunk {}]", mime_type, seq));
                        seq += 1;
                        if events_tx.send(EncoderEvent::Chunk(chunk)).is_err() {
                            return;
                        }
                    }
                }
            }
            let _ = events_tx.send(EncoderEvent::Chunk(Bytes::from(format!("[{} final]", mime_type))));
            let _ = events_tx.send(EncoderEvent::Stopped);
        });

        Ok(EncoderHandle { events, stop })
    }
}

/// Encoder driven by hand, for exercising capture edge cases.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct ManualEncoder {
    slot: Arc<Mutex<Option<ManualControl>>>,
}

#[cfg(test)]
pub struct ManualControl {
    events: mpsc::UnboundedSender<EncoderEvent>,
    stop: Option<oneshot::Receiver<()>>,
}

#[cfg(test)]
impl ManualEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controls of the most recently started encoder.
    pub fn take_control(&self) -> Option<ManualControl> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

#[cfg(test)]
impl MediaStream for ManualEncoder {
    fn start_encoder(&self, _mime_type: &str) -> Result<EncoderHandle> {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (stop, stop_rx) = oneshot::channel();
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(ManualControl { events: events_tx, stop: Some(stop_rx) });
        Ok(EncoderHandle { events, stop })
    }
}

#[cfg(test)]
impl ManualControl {
    pub fn chunk(&self, data: &[u8]) {
        let _ = self.events.send(EncoderEvent::Chunk(Bytes::copy_from_slice(data)));
    }

    pub fn fail(&self, reason: &str) {
        let _ = self.events.send(EncoderEvent::Error(reason.to_string()));
    }

    pub fn finish(&self) {
        let _ = self.events.send(EncoderEvent::Stopped);
    }

    /// Resolves once the capturer asked this encoder to stop.
    pub async fn stop_requested(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.await;
        }
    }
}

/// Floor socket stand-in. Messages pushed through it reach every subscriber.
pub struct MockFloorSocket {
    url: String,
    tx: Mutex<Option<broadcast::Sender<String>>>,
}

impl MockFloorSocket {
    pub fn new(url: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(SOCKET_CAPACITY);
        MockFloorSocket { url: url.into(), tx: Mutex::new(Some(tx)) }
    }

    pub fn push(&self, message: &str) {
        if let Some(tx) = self.tx.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            // No subscribers is fine: the message is simply not observed.
            let _ = tx.send(message.to_string());
        }
    }

    /// Drops the sending side; subscribers observe the socket as closed.
    #[allow(dead_code)]
    pub fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Emits frames of random intensities every `interval_ms` until the task is
    /// aborted or the socket is closed.
    pub fn spawn_generator(self: &Arc<Self>, interval_ms: u64, rows: usize, cols: usize) -> JoinHandle<()> {
        let socket = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
            loop {
                ticker.tick().await;
                if socket.tx.lock().unwrap_or_else(PoisonError::into_inner).is_none() {
                    break;
                }
                let ts = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_millis();
                let message = synthetic_frame(ts, rows, cols);
                socket.push(&message);
            }
            tracing::debug!("mock floor generator {} stopped", socket.url);
        })
    }
}

impl FrameSocket for MockFloorSocket {
    fn url(&self) -> &str {
        &self.url
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        match self.tx.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(tx) => tx.subscribe(),
            None => broadcast::channel(1).1,
        }
    }
}

fn synthetic_frame(ts: u128, rows: usize, cols: usize) -> String {
    let mut rng = rand::thread_rng();
    let grid: Vec<String> = (0..rows)
        .map(|_| {
            (0..cols)
                .map(|_| rng.gen_range(0..=1000).to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();
    format!("{}:{}", ts, grid.join(";"))
}
