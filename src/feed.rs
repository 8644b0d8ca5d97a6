use crate::config::PlaybackMode;
use crate::frame::{self, Frame};
use crate::playback::{self, Playback};
use crate::sources::FrameSocket;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Where a floor display takes its frames from.
pub enum FloorFeed {
    Live(Arc<dyn FrameSocket>),
    Recorded(Vec<Frame>),
}

/// An open feed. Dropping it detaches from the socket or ends playback.
pub struct FeedHandle {
    source: FeedSource,
}

enum FeedSource {
    Live {
        frames: mpsc::UnboundedReceiver<Frame>,
        listener: JoinHandle<()>,
    },
    Recorded(Playback),
}

impl FloorFeed {
    pub fn open(self, mode: PlaybackMode) -> Result<FeedHandle> {
        let source = match self {
            FloorFeed::Live(socket) => {
                let (tx, frames) = mpsc::unbounded_channel();
                let mut rx = socket.subscribe();
                let url = socket.url().to_string();
                let listener = tokio::spawn(async move {
                    loop {
                        match rx.recv().await {
                            Ok(raw) => {
                                if tx.send(frame::parse(&raw)).is_err() {
                                    break;
                                }
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                tracing::debug!("{}: display skipped {} frames", url, skipped);
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                });
                FeedSource::Live { frames, listener }
            }
            FloorFeed::Recorded(frames) => FeedSource::Recorded(playback::start(frames, mode)?),
        };
        Ok(FeedHandle { source })
    }
}

impl FeedHandle {
    pub async fn next_frame(&mut self) -> Option<Frame> {
        match &mut self.source {
            FeedSource::Live { frames, .. } => frames.recv().await,
            FeedSource::Recorded(playback) => playback.next_frame().await,
        }
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        if let FeedSource::Live { listener, .. } = &self.source {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFloorSocket;

    #[tokio::test]
    async fn test_live_feed_parses_messages() -> Result<()> {
        let socket = Arc::new(MockFloorSocket::new("ws://floor/live"));
        let mut feed = FloorFeed::Live(socket.clone()).open(PlaybackMode::BusyWait)?;

        socket.push("7:1,2");
        let frame = feed.next_frame().await.unwrap();
        assert_eq!(frame.time, Some(7));
        assert_eq!(frame.rows, vec![vec![Some(1), Some(2)]]);

        socket.close();
        assert!(feed.next_frame().await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_recorded_feed_replays_in_order() -> Result<()> {
        let frames = vec![frame::parse("0:1"), frame::parse("20:2")];
        let mut feed = FloorFeed::Recorded(frames).open(PlaybackMode::Sleep)?;

        assert_eq!(feed.next_frame().await.unwrap().time, Some(0));
        assert_eq!(feed.next_frame().await.unwrap().time, Some(20));
        assert!(feed.next_frame().await.is_none());
        Ok(())
    }
}
