use crate::frame::Frame;
use crate::recording::{Blob, FloorTrack, VideoTrack};
use crate::socket_capture::{self, SocketCapture};
use crate::sources::{FloorSource, VideoSource};
use crate::stream_capture::{self, StreamCapture};
use anyhow::{Context, Result};
use futures::future::{try_join, try_join_all};

/// Captures running for every source of one session.
pub struct CaptureSet {
    videos: Vec<(VideoSource, StreamCapture)>,
    floors: Vec<(FloorSource, SocketCapture)>,
}

/// Results of a finished [`CaptureSet`], paired with their sources.
#[derive(Debug, Default)]
pub struct CollectedCaptures {
    pub videos: Vec<VideoTrack>,
    pub floors: Vec<FloorTrack>,
}

/// Starts one capturer per source, all at once.
pub fn start_all(
    videos: &[VideoSource],
    floors: &[FloorSource],
    mime_type: &str,
) -> Result<CaptureSet> {
    let mut video_captures = Vec::with_capacity(videos.len());
    for source in videos {
        let capture = stream_capture::start_capturing(source.stream.as_ref(), mime_type)
            .with_context(|| format!("failed to capture {}", source.device.label))?;
        video_captures.push((source.clone(), capture));
    }

    let floor_captures = floors
        .iter()
        .map(|source| {
            let capture = socket_capture::start_capturing(source.socket.as_ref());
            (source.clone(), capture)
        })
        .collect();

    tracing::info!("capturing {} video and {} floor sources", videos.len(), floors.len());
    Ok(CaptureSet { videos: video_captures, floors: floor_captures })
}

impl CaptureSet {
    /// Stops every capturer concurrently. Resolves once all of them have
    /// finished; the first failure fails the whole set.
    pub async fn stop_and_collect_all(self) -> Result<CollectedCaptures> {
        let (video_sources, video_captures): (Vec<_>, Vec<_>) = self.videos.into_iter().unzip();
        let (floor_sources, floor_captures): (Vec<_>, Vec<_>) = self.floors.into_iter().unzip();

        let blobs = try_join_all(video_captures.into_iter().map(StreamCapture::stop_and_get_blob));
        let frames = try_join_all(floor_captures.into_iter().map(SocketCapture::stop_and_get_frames));
        let (blobs, frames) = try_join(blobs, frames).await?;

        Ok(CollectedCaptures {
            videos: pair_videos(video_sources, blobs),
            floors: pair_floors(floor_sources, frames),
        })
    }
}

fn pair_videos(sources: Vec<VideoSource>, blobs: Vec<Blob>) -> Vec<VideoTrack> {
    sources
        .into_iter()
        .zip(blobs)
        .map(|(source, blob)| VideoTrack { device: source.device, blob })
        .collect()
}

fn pair_floors(sources: Vec<FloorSource>, frames: Vec<Vec<Frame>>) -> Vec<FloorTrack> {
    sources
        .into_iter()
        .zip(frames)
        .map(|(source, data)| FloorTrack { url: source.url, data })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ManualEncoder, MockCamera, MockFloorSocket};
    use crate::recording::DeviceRef;
    use std::sync::Arc;
    use std::time::Duration;

    fn video(id: &str, stream: Arc<dyn crate::sources::MediaStream>) -> VideoSource {
        VideoSource { device: DeviceRef::video_input(id, id), stream }
    }

    #[tokio::test]
    async fn test_results_pair_with_their_sources() -> Result<()> {
        let videos = vec![
            video("front", Arc::new(MockCamera::new(5))),
            video("side", Arc::new(MockCamera::new(5))),
        ];
        let socket = Arc::new(MockFloorSocket::new("ws://floor/1"));
        let floors = vec![FloorSource::new(socket.clone())];

        let set = start_all(&videos, &floors, "video/webm")?;
        socket.push("10:1");
        let collected = set.stop_and_collect_all().await?;

        let labels: Vec<_> = collected.videos.iter().map(|v| v.device.label.as_str()).collect();
        assert_eq!(labels, vec!["front", "side"]);
        assert!(collected.videos.iter().all(|v| !v.blob.is_empty()));
        assert_eq!(collected.floors.len(), 1);
        assert_eq!(collected.floors[0].url, "ws://floor/1");
        assert_eq!(collected.floors[0].data[0].time, Some(10));
        Ok(())
    }

    #[tokio::test]
    async fn test_waits_for_slowest_capturer() -> Result<()> {
        let slow = ManualEncoder::new();
        let videos = vec![
            video("fast", Arc::new(MockCamera::new(5))),
            video("slow", Arc::new(slow.clone())),
        ];
        let set = start_all(&videos, &[], "video/webm")?;
        let mut control = slow.take_control().unwrap();

        let mut collecting = tokio::spawn(set.stop_and_collect_all());
        control.stop_requested().await;

        let early = tokio::time::timeout(Duration::from_millis(50), &mut collecting).await;
        assert!(early.is_err(), "combined result available before slow capturer finished");

        control.chunk(b"late");
        control.finish();
        let collected = collecting.await??;
        assert_eq!(collected.videos.len(), 2);
        assert_eq!(&collected.videos[1].blob.data[..], b"late");
        Ok(())
    }

    #[tokio::test]
    async fn test_one_failure_fails_the_set() -> Result<()> {
        let broken = ManualEncoder::new();
        let videos = vec![
            video("ok", Arc::new(MockCamera::new(5))),
            video("broken", Arc::new(broken.clone())),
        ];
        let set = start_all(&videos, &[], "video/webm")?;
        broken.take_control().unwrap().fail("lost");

        assert!(set.stop_and_collect_all().await.is_err());
        Ok(())
    }

    #[test]
    fn test_pairing_truncates_to_shorter_side() {
        let socket = Arc::new(MockFloorSocket::new("ws://floor/1"));
        let sources = vec![FloorSource::new(socket.clone()), FloorSource::new(socket)];
        let paired = pair_floors(sources, vec![Vec::new()]);
        assert_eq!(paired.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_source_lists() -> Result<()> {
        let collected = start_all(&[], &[], "video/webm")?.stop_and_collect_all().await?;
        assert!(collected.videos.is_empty());
        assert!(collected.floors.is_empty());
        Ok(())
    }
}
