use crate::frame::Frame;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Identity and label of one capture device, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRef {
    pub device_id: String,
    #[serde(default)]
    pub kind: String,
    pub label: String,
    #[serde(default)]
    pub group_id: String,
}

impl DeviceRef {
    pub fn video_input(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        DeviceRef {
            device_id: device_id.into(),
            kind: "videoinput".to_string(),
            label: label.into(),
            group_id: String::new(),
        }
    }
}

/// Assembled binary payload with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub data: Bytes,
}

impl Blob {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Blob { mime_type: mime_type.into(), data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTrack {
    pub device: DeviceRef,
    pub blob: Blob,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorTrack {
    pub url: String,
    pub data: Vec<Frame>,
}

impl FloorTrack {
    /// Milliseconds between the first and last frame, if both carry a time.
    /// Saturates instead of overflowing on extreme timestamps.
    pub fn time_span(&self) -> Option<i64> {
        let first = self.data.first()?.time?;
        let last = self.data.last()?.time?;
        Some(last.saturating_sub(first))
    }
}

/// Synchronized captures of one session. `title` is its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub title: String,
    pub videos: Vec<VideoTrack>,
    pub floors: Vec<FloorTrack>,
}

/// Sortable ISO-8601 title, e.g. `2024-05-01T09:30:00.000Z`.
pub fn title_for(started_at: DateTime<Utc>) -> String {
    started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Replaces `.` and `:` so a label or title is safe as a file name.
pub fn sanitize_name(name: &str) -> String {
    name.replace(['.', ':'], "_")
}
