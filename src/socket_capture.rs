use crate::frame::{self, Frame};
use crate::sources::FrameSocket;
use anyhow::{anyhow, bail, Result};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running capture of one frame socket.
pub struct SocketCapture {
    cancel: CancellationToken,
    task: JoinHandle<Result<Vec<Frame>>>,
}

/// Starts listening on `socket`. Only messages arriving after this call are
/// captured.
pub fn start_capturing(socket: &dyn FrameSocket) -> SocketCapture {
    let cancel = CancellationToken::new();
    let rx = socket.subscribe();
    let task = tokio::spawn(collect_frames(rx, socket.url().to_string(), cancel.clone()));
    SocketCapture { cancel, task }
}

impl SocketCapture {
    /// Detaches the listener and returns every frame received since start,
    /// in arrival order. The socket itself stays open.
    pub async fn stop_and_get_frames(self) -> Result<Vec<Frame>> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| anyhow!("socket capture task failed: {}", e))?
    }
}

async fn collect_frames(
    mut rx: broadcast::Receiver<String>,
    url: String,
    cancel: CancellationToken,
) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            msg = rx.recv() => match msg {
                Ok(raw) => frames.push(frame::parse(&raw)),
                Err(RecvError::Lagged(skipped)) => {
                    bail!("socket {} capture lagged, {} messages dropped", url, skipped)
                }
                Err(RecvError::Closed) => bail!("socket {} closed during capture", url),
            },
        }
    }

    // Messages already delivered but not yet taken still belong to this capture.
    loop {
        match rx.try_recv() {
            Ok(raw) => frames.push(frame::parse(&raw)),
            Err(TryRecvError::Lagged(skipped)) => {
                bail!("socket {} capture lagged, {} messages dropped", url, skipped)
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Closed) => bail!("socket {} closed during capture", url),
        }
    }

    tracing::debug!("socket capture {} finalized: {} frames", url, frames.len());
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFloorSocket;

    #[tokio::test]
    async fn test_collects_frames_in_arrival_order() -> Result<()> {
        let socket = MockFloorSocket::new("ws://floor/1");
        socket.push("before-start:0");
        let capture = start_capturing(&socket);

        socket.push("1000:1,1;2,2");
        socket.push("1100:3,3;4,4");
        let frames = capture.stop_and_get_frames().await?;

        let times: Vec<_> = frames.iter().map(|f| f.time).collect();
        assert_eq!(times, vec![Some(1000), Some(1100)]);
        assert_eq!(frames[1].rows, vec![vec![Some(3), Some(3)], vec![Some(4), Some(4)]]);
        Ok(())
    }

    #[tokio::test]
    async fn test_messages_after_stop_are_ignored() -> Result<()> {
        let socket = MockFloorSocket::new("ws://floor/1");
        let capture = start_capturing(&socket);
        socket.push("1:1");
        let frames = capture.stop_and_get_frames().await?;
        socket.push("2:2");

        assert_eq!(frames.len(), 1);
        // The socket keeps serving other listeners.
        let mut rx = socket.subscribe();
        socket.push("3:3");
        assert_eq!(rx.recv().await?, "3:3");
        Ok(())
    }

    #[tokio::test]
    async fn test_overrun_capture_rejects() {
        let socket = MockFloorSocket::new("ws://floor/1");
        let capture = start_capturing(&socket);
        for t in 0..1100 {
            socket.push(&format!("{}:1", t));
        }

        let err = capture.stop_and_get_frames().await.unwrap_err();
        assert!(err.to_string().contains("lagged"));
    }

    #[tokio::test]
    async fn test_socket_closed_mid_capture_rejects() {
        let socket = MockFloorSocket::new("ws://floor/1");
        let capture = start_capturing(&socket);
        socket.close();

        let err = capture.stop_and_get_frames().await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
