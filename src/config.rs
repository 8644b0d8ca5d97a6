use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    /// Extension of the per-video archive entries.
    #[serde(default = "default_video_extension")]
    pub video_extension: String,
}

fn default_mime_type() -> String {
    "video/webm".to_string()
}

fn default_video_extension() -> String {
    "webm".to_string()
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            mime_type: default_mime_type(),
            video_extension: default_video_extension(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Spin on the clock until each frame is due.
    #[default]
    BusyWait,
    /// Sleep until each frame is due, measured from the playback start instant.
    Sleep,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub mode: PlaybackMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub path: PathBuf,
}

/// Synthetic sources attached by the `record` command.
#[derive(Debug, Clone, Deserialize)]
pub struct MockConfig {
    pub cameras: Vec<String>,
    pub floors: Vec<String>,
    pub frame_interval_ms: u64,
    pub chunk_interval_ms: u64,
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    pub storage: StorageConfig,
    pub mock: MockConfig,
}

impl AppConfig {
    pub fn load_default() -> anyhow::Result<Self> {
        let default = include_str!("../config/default.toml");
        let cfg: AppConfig = toml::from_str(default)?;
        Ok(cfg)
    }

    pub fn load_from(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let p = path.into();
        let s = fs::read_to_string(&p)?;
        let cfg: AppConfig = toml::from_str(&s)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg.capture.mime_type, "video/webm");
        assert_eq!(cfg.playback.mode, PlaybackMode::BusyWait);
        assert!(!cfg.mock.floors.is_empty());
    }

    #[test]
    fn test_sections_fall_back_to_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [playback]
            mode = "sleep"

            [storage]
            path = "/tmp/rec"

            [mock]
            cameras = []
            floors = []
            frame_interval_ms = 10
            chunk_interval_ms = 10
            rows = 2
            cols = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.playback.mode, PlaybackMode::Sleep);
        assert_eq!(cfg.capture.mime_type, "video/webm");
        assert_eq!(cfg.capture.video_extension, "webm");
    }
}
