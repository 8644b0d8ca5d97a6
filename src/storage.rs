use crate::archive;
use crate::config::{CaptureConfig, StorageConfig};
use crate::recording::Recording;
use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory of saved recording archives.
#[derive(Clone)]
pub struct RecordingStore {
    pub root: Arc<PathBuf>,
    video_extension: Arc<str>,
}

impl RecordingStore {
    pub async fn new(cfg: &StorageConfig, capture: &CaptureConfig) -> Result<Self> {
        let root = cfg.path.clone();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("failed to create {}", root.display()))?;
        Ok(RecordingStore {
            root: Arc::new(root),
            video_extension: Arc::from(capture.video_extension.as_str()),
        })
    }

    /// Writes the archive next to a temporary file and renames it into place.
    pub async fn save(&self, recording: &Recording) -> Result<PathBuf> {
        let bytes = encode_blocking(recording.clone(), self.video_extension.clone()).await?;
        let path = self.root.join(archive::archive_file_name(recording));
        let tmp_path = path.with_extension("zip.tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        tracing::info!("saved recording {} to {} ({} bytes)", recording.title, path.display(), bytes.len());
        Ok(path)
    }

    pub async fn load(&self, path: &Path) -> Result<Recording> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let extension = self.video_extension.clone();
        let recording = tokio::task::spawn_blocking(move || archive::decode(&bytes, &extension))
            .await
            .map_err(|e| anyhow!("archive decode task failed: {}", e))?
            .with_context(|| format!("failed to load {}", path.display()))?;
        tracing::info!("loaded recording {} from {}", recording.title, path.display());
        Ok(recording)
    }

    pub async fn list_archives(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&*self.root).await?;
        let mut out = Vec::new();
        while let Some(ent) = entries.next_entry().await? {
            let p = ent.path();
            if p.extension().and_then(|s| s.to_str()) == Some("zip") {
                out.push(p);
            }
        }
        out.sort();
        Ok(out)
    }

    pub async fn archive_checksum(path: &Path) -> Result<String> {
        let data = tokio::fs::read(path).await?;
        let mut hasher = Sha256::new();
        hasher.update(&data);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

async fn encode_blocking(recording: Recording, video_extension: Arc<str>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || archive::encode(&recording, &video_extension))
        .await
        .map_err(|e| anyhow!("archive encode task failed: {}", e))?
}
