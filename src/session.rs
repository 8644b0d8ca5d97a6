use crate::config::CaptureConfig;
use crate::coordinator;
use crate::deferred::Deferred;
use crate::recording::{title_for, Recording};
use crate::sources::SourceRegistry;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

pub type RecordingCallback = Arc<dyn Fn(Recording) + Send + Sync>;

/// Idle/Recording state machine. The presence of a stop signal is the
/// Recording state.
pub struct SessionController {
    registry: SourceRegistry,
    mime_type: String,
    on_recording: RecordingCallback,
    stop_signal: Mutex<Option<Deferred<()>>>,
}

impl SessionController {
    pub fn new<F>(registry: SourceRegistry, capture: &CaptureConfig, on_recording: F) -> Self
    where
        F: Fn(Recording) + Send + Sync + 'static,
    {
        SessionController {
            registry,
            mime_type: capture.mime_type.clone(),
            on_recording: Arc::new(on_recording),
            stop_signal: Mutex::new(None),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.signal().is_some()
    }

    /// Starts capturing every source attached right now.
    ///
    /// Returns `Ok(None)` without side effects when already recording.
    /// Otherwise returns the assembly task, which completes after [`stop`]
    /// once every capture has finished and the recording has been handed to
    /// the callback. A capture failure surfaces as the task's error and the
    /// callback is not called.
    ///
    /// [`stop`]: SessionController::stop
    pub async fn start(&self) -> Result<Option<JoinHandle<Result<()>>>> {
        if self.is_recording() {
            return Ok(None);
        }
        let started_at = Utc::now();
        let sources = self.registry.snapshot().await;

        let mut signal = self.signal();
        if signal.is_some() {
            return Ok(None);
        }
        let captures = coordinator::start_all(&sources.videos, &sources.floors, &self.mime_type)?;
        let deferred = Deferred::new();
        let stop_requested = deferred.promise();
        *signal = Some(deferred);
        drop(signal);

        let title = title_for(started_at);
        let on_recording = Arc::clone(&self.on_recording);
        tracing::info!("recording session {} started", title);

        let task = tokio::spawn(async move {
            // Only ever resolved.
            let _ = stop_requested.wait().await;
            let collected = captures
                .stop_and_collect_all()
                .await
                .with_context(|| format!("recording session {} failed", title))?;

            let recording = Recording {
                title,
                videos: collected.videos,
                floors: collected.floors,
            };
            tracing::info!(
                "recording session {} complete: {} videos, {} floors",
                recording.title,
                recording.videos.len(),
                recording.floors.len()
            );
            on_recording(recording);
            Ok(())
        });
        Ok(Some(task))
    }

    /// Flips to Idle immediately; teardown continues in the assembly task.
    /// Returns `false` when already idle.
    pub fn stop(&self) -> bool {
        match self.signal().take() {
            Some(deferred) => {
                deferred.resolve(());
                tracing::info!("recording session stop requested");
                true
            }
            None => false,
        }
    }

    fn signal(&self) -> MutexGuard<'_, Option<Deferred<()>>> {
        self.stop_signal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
