use crate::recording::Blob;
use crate::sources::{EncoderEvent, MediaStream};
use anyhow::{anyhow, bail, Context, Result};
use bytes::{Bytes, BytesMut};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// A running capture of one media stream.
pub struct StreamCapture {
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<Blob>>,
}

/// Starts encoding `stream` immediately and buffers every chunk it produces.
pub fn start_capturing(stream: &dyn MediaStream, mime_type: &str) -> Result<StreamCapture> {
    let handle = stream
        .start_encoder(mime_type)
        .with_context(|| format!("failed to start {} encoder", mime_type))?;
    let mime_type = mime_type.to_string();
    let task = tokio::spawn(collect_chunks(handle.events, mime_type));
    Ok(StreamCapture { stop: handle.stop, task })
}

impl StreamCapture {
    /// Asks the encoder to finalize and returns everything it produced since
    /// start, including the final flushed chunk.
    pub async fn stop_and_get_blob(self) -> Result<Blob> {
        // The encoder may already have finished on its own.
        let _ = self.stop.send(());
        self.task
            .await
            .map_err(|e| anyhow!("stream capture task failed: {}", e))?
    }
}

async fn collect_chunks(
    mut events: mpsc::UnboundedReceiver<EncoderEvent>,
    mime_type: String,
) -> Result<Blob> {
    let mut chunks: Vec<Bytes> = Vec::new();
    loop {
        match events.recv().await {
            Some(EncoderEvent::Chunk(chunk)) => {
                tracing::trace!("stream chunk: {} bytes", chunk.len());
                chunks.push(chunk);
            }
            Some(EncoderEvent::Stopped) => break,
            Some(EncoderEvent::Error(reason)) => bail!("media stream failed: {}", reason),
            None => bail!("media stream ended without finalizing"),
        }
    }

    let total: usize = chunks.iter().map(Bytes::len).sum();
    let mut data = BytesMut::with_capacity(total);
    for chunk in &chunks {
        data.extend_from_slice(chunk);
    }
    tracing::debug!("stream capture finalized: {} chunks, {} bytes", chunks.len(), total);
    Ok(Blob::new(mime_type, data.freeze()))
}
