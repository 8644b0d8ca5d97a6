use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod archive;
mod config;
mod coordinator;
mod deferred;
mod feed;
mod frame;
mod library;
mod mock;
mod playback;
mod recorder;
mod recording;
mod render;
mod session;
mod socket_capture;
mod sources;
mod storage;
mod stream_capture;

use config::AppConfig;
use feed::FloorFeed;
use library::RecordingLibrary;
use mock::MockFloorSocket;
use std::sync::Arc;
use storage::RecordingStore;

#[derive(Parser)]
#[command(name = "floor_recorder", about = "Record and replay floor sensor sessions")]
struct Cli {
    /// TOML configuration overriding the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record one session from the configured sources and save it.
    Record {
        #[arg(long, default_value_t = 3000)]
        duration_ms: u64,
    },
    /// Print the contents of saved archives (all in the storage dir if none given).
    Inspect { archives: Vec<PathBuf> },
    /// Replay the frames of one floor source.
    Replay {
        archive: PathBuf,
        #[arg(long, default_value_t = 0)]
        floor: usize,
    },
    /// Show live frames from one configured floor source.
    Watch {
        #[arg(long, default_value_t = 0)]
        floor: usize,
        #[arg(long, default_value_t = 20)]
        frames: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load_default()?,
    };

    match cli.command {
        Command::Record { duration_ms } => {
            let store = RecordingStore::new(&config.storage, &config.capture).await?;
            let mut library = RecordingLibrary::new();
            library.push(recorder::record_session(&config, Duration::from_millis(duration_ms)).await?);
            for recording in library.iter() {
                let path = store.save(recording).await?;
                println!("{}", path.display());
                print_summary(recording);
            }
        }
        Command::Inspect { mut archives } => {
            let store = RecordingStore::new(&config.storage, &config.capture).await?;
            if archives.is_empty() {
                archives = store.list_archives().await?;
            }
            let mut library = RecordingLibrary::new();
            for path in &archives {
                let recording = store.load(path).await?;
                if !library.insert_loaded(recording) {
                    info!("skipping {}: recording already loaded", path.display());
                    continue;
                }
                println!("{}  sha256={}", path.display(), RecordingStore::archive_checksum(path).await?);
            }
            for recording in library.iter() {
                print_summary(recording);
            }
        }
        Command::Replay { archive, floor } => {
            let store = RecordingStore::new(&config.storage, &config.capture).await?;
            let recording = store.load(&archive).await?;
            let track = recording
                .floors
                .into_iter()
                .nth(floor)
                .ok_or_else(|| anyhow!("recording has no floor source #{}", floor))?;
            info!("replaying {} frames from {}", track.data.len(), track.url);

            let mut feed = FloorFeed::Recorded(track.data).open(config.playback.mode)?;
            while let Some(frame) = feed.next_frame().await {
                println!("{}\n{}\n", frame.raw, render::grid_to_text(&frame));
            }
        }
        Command::Watch { floor, frames } => {
            let url = config
                .mock
                .floors
                .get(floor)
                .ok_or_else(|| anyhow!("no floor source #{} configured", floor))?;
            let socket = Arc::new(MockFloorSocket::new(url.clone()));
            let generator = socket.spawn_generator(config.mock.frame_interval_ms, config.mock.rows, config.mock.cols);
            info!("watching {}", url);

            let mut feed = FloorFeed::Live(socket).open(config.playback.mode)?;
            for _ in 0..frames {
                let Some(frame) = feed.next_frame().await else { break };
                println!("{}\n{}\n", frame.raw, render::grid_to_text(&frame));
            }
            generator.abort();
        }
    }

    Ok(())
}

fn print_summary(recording: &recording::Recording) {
    println!("title: {}", recording.title);
    for (i, video) in recording.videos.iter().enumerate() {
        println!("  video #{}: {} ({} bytes)", i, video.device.label, video.blob.len());
    }
    for (i, floor) in recording.floors.iter().enumerate() {
        let span = match floor.time_span() {
            Some(ms) => format!("{}ms", ms),
            None => "n/a".to_string(),
        };
        println!("  floor #{}: {} ({} frames, span {})", i, floor.url, floor.data.len(), span);
    }
}
