use crate::recording::{sanitize_name, Blob, DeviceRef, FloorTrack, Recording, VideoTrack};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const METADATA_ENTRY: &str = "recording.json";

/// Contents of the metadata entry. Video payloads live in their own entries.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    title: String,
    videos: Vec<VideoEntry>,
    #[serde(default)]
    floors: Vec<FloorTrack>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VideoEntry {
    device: DeviceRef,
    #[serde(default = "default_mime_type", rename = "mimeType")]
    mime_type: String,
}

fn default_mime_type() -> String {
    "video/webm".to_string()
}

/// Entry name of the payload for `videos[index]`.
pub fn video_entry_name(index: usize, device: &DeviceRef, extension: &str) -> String {
    format!("{}-{}.{}", index, sanitize_name(&device.label), extension)
}

/// File name offered when saving `recording`.
pub fn archive_file_name(recording: &Recording) -> String {
    format!("{}.zip", sanitize_name(&recording.title))
}

/// Video entries are named with `video_extension`; each blob's content type
/// is kept in the metadata entry.
pub fn encode(recording: &Recording, video_extension: &str) -> Result<Vec<u8>> {
    let manifest = Manifest {
        title: recording.title.clone(),
        videos: recording
            .videos
            .iter()
            .map(|v| VideoEntry {
                device: v.device.clone(),
                mime_type: v.blob.mime_type.clone(),
            })
            .collect(),
        floors: recording.floors.clone(),
    };

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let text = FileOptions::default().compression_method(CompressionMethod::Deflated);
    // Encoded video does not shrink further.
    let binary = FileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file(METADATA_ENTRY, text)?;
    zip.write_all(&serde_json::to_vec(&manifest)?)?;

    for (index, video) in recording.videos.iter().enumerate() {
        zip.start_file(video_entry_name(index, &video.device, video_extension), binary)?;
        zip.write_all(&video.blob.data)?;
    }

    let out = zip.finish()?.into_inner();
    tracing::debug!("encoded recording {} ({} bytes)", recording.title, out.len());
    Ok(out)
}

pub fn decode(bytes: &[u8], video_extension: &str) -> Result<Recording> {
    let mut zip = ZipArchive::new(Cursor::new(bytes)).context("not a recording archive")?;

    let mut metadata = String::new();
    zip.by_name(METADATA_ENTRY)
        .with_context(|| format!("archive has no {}", METADATA_ENTRY))?
        .read_to_string(&mut metadata)?;
    let manifest: Manifest =
        serde_json::from_str(&metadata).with_context(|| format!("invalid {}", METADATA_ENTRY))?;

    let mut names = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        names.push(zip.by_index(i)?.name().to_string());
    }

    let mut videos = Vec::with_capacity(manifest.videos.len());
    for (index, entry) in manifest.videos.into_iter().enumerate() {
        let prefix = format!("{}-", index);
        let suffix = format!(".{}", video_extension);
        let name = names
            .iter()
            .find(|n| n.starts_with(&prefix) && n.ends_with(&suffix))
            .ok_or_else(|| anyhow!("archive has no video entry for index {}", index))?;

        let mut data = Vec::new();
        zip.by_name(name)?.read_to_end(&mut data)?;
        videos.push(VideoTrack {
            device: entry.device,
            blob: Blob::new(entry.mime_type, data),
        });
    }

    Ok(Recording {
        title: manifest.title,
        videos,
        floors: manifest.floors,
    })
}
