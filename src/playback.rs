use crate::config::PlaybackMode;
use crate::frame::Frame;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Upper bound on a single sleep so a stop request is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Replays captured frames with their original spacing.
///
/// The first frame's `time` is offset zero. Every frame is emitted once the
/// wall-clock time since [`start`] exceeds its offset, in the original order.
/// Frames without a time, or earlier than the first, are emitted without
/// waiting. Timing runs on its own thread and frames arrive through
/// [`Playback::next_frame`]; the thread ends after the last frame.
pub struct Playback {
    frames: mpsc::UnboundedReceiver<Frame>,
    cancel: Arc<AtomicBool>,
}

pub fn start(frames: Vec<Frame>, mode: PlaybackMode) -> Result<Playback> {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = Arc::clone(&cancel);
    let count = frames.len();

    thread::Builder::new()
        .name("floor-playback".to_string())
        .spawn(move || {
            let emitted = replay(frames, mode, &worker_cancel, |frame| tx.send(frame).is_ok());
            tracing::debug!("playback finished: {} of {} frames emitted", emitted, count);
        })
        .context("failed to spawn playback thread")?;

    tracing::info!("playback started: {} frames, {:?}", count, mode);
    Ok(Playback { frames: rx, cancel })
}

impl Playback {
    /// Next frame when it is due; `None` once playback has ended.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    /// Ends playback; no further frames are emitted.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Release);
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Emits frames on schedule until done, cancelled, or `emit` returns false.
/// Returns the number of frames emitted.
fn replay<F>(frames: Vec<Frame>, mode: PlaybackMode, cancel: &AtomicBool, mut emit: F) -> usize
where
    F: FnMut(Frame) -> bool,
{
    let started = Instant::now();
    let epoch = frames.first().and_then(|f| f.time);
    let mut emitted = 0;

    for frame in frames {
        let due = offset(epoch, frame.time);
        if !wait_past(started, due, mode, cancel) {
            break;
        }
        if !emit(frame) {
            break;
        }
        emitted += 1;
    }
    emitted
}

fn offset(epoch: Option<i64>, time: Option<i64>) -> Duration {
    match (epoch, time) {
        (Some(epoch), Some(time)) if time > epoch => Duration::from_millis(time.abs_diff(epoch)),
        _ => Duration::ZERO,
    }
}

/// Blocks until more than `due` has elapsed since `started`. Returns `false`
/// if cancelled first.
fn wait_past(started: Instant, due: Duration, mode: PlaybackMode, cancel: &AtomicBool) -> bool {
    loop {
        if cancel.load(Ordering::Acquire) {
            return false;
        }
        let elapsed = started.elapsed();
        if elapsed > due {
            return true;
        }
        match mode {
            PlaybackMode::BusyWait => std::hint::spin_loop(),
            PlaybackMode::Sleep => {
                let remaining = due.saturating_sub(elapsed).max(Duration::from_micros(50));
                thread::sleep(remaining.min(SLEEP_SLICE));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame;

    fn frames_at(times: &[i64]) -> Vec<Frame> {
        times.iter().map(|t| frame::parse(&format!("{}:0", t))).collect()
    }

    async fn collect_offsets(mut playback: Playback) -> Vec<(Option<i64>, Duration)> {
        let started = Instant::now();
        let mut out = Vec::new();
        while let Some(frame) = playback.next_frame().await {
            out.push((frame.time, started.elapsed()));
        }
        out
    }

    fn assert_schedule(offsets: &[(Option<i64>, Duration)], expected: &[(i64, u64)]) {
        assert_eq!(offsets.len(), expected.len());
        for ((time, at), (want_time, want_ms)) in offsets.iter().zip(expected) {
            assert_eq!(*time, Some(*want_time));
            let ms = at.as_millis() as u64;
            assert!(ms + 2 >= *want_ms, "frame {} emitted early at {}ms", want_time, ms);
            assert!(ms <= want_ms + 60, "frame {} emitted late at {}ms", want_time, ms);
        }
    }

    #[tokio::test]
    async fn test_empty_sequence_ends_immediately() -> Result<()> {
        let mut playback = start(Vec::new(), PlaybackMode::BusyWait)?;
        assert!(playback.next_frame().await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_busy_wait_preserves_gaps() -> Result<()> {
        let playback = start(frames_at(&[5000, 5100, 5250]), PlaybackMode::BusyWait)?;
        let offsets = collect_offsets(playback).await;
        assert_schedule(&offsets, &[(5000, 0), (5100, 100), (5250, 250)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_sleep_mode_preserves_gaps() -> Result<()> {
        let playback = start(frames_at(&[0, 100, 250]), PlaybackMode::Sleep)?;
        let offsets = collect_offsets(playback).await;
        assert_schedule(&offsets, &[(0, 0), (100, 100), (250, 250)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_halts_emission() -> Result<()> {
        let mut playback = start(frames_at(&[0, 10_000]), PlaybackMode::Sleep)?;
        assert_eq!(playback.next_frame().await.unwrap().time, Some(0));
        playback.stop();
        let rest = tokio::time::timeout(Duration::from_secs(1), playback.next_frame()).await?;
        assert!(rest.is_none());
        Ok(())
    }

    #[test]
    fn test_untimed_and_backward_frames_do_not_wait() {
        let mut frames = frames_at(&[1000, 900]);
        frames.push(frame::parse("junk:1"));
        let cancel = AtomicBool::new(false);
        let started = Instant::now();
        let mut seen = Vec::new();
        let emitted = replay(frames, PlaybackMode::BusyWait, &cancel, |f| {
            seen.push(f.time);
            true
        });
        assert_eq!(emitted, 3);
        assert_eq!(seen, vec![Some(1000), Some(900), None]);
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_offsets() {
        assert_eq!(offset(Some(1000), Some(1250)), Duration::from_millis(250));
        assert_eq!(offset(Some(1000), Some(900)), Duration::ZERO);
        assert_eq!(offset(None, Some(900)), Duration::ZERO);
    }
}
