//! Push Frames
//!
//! Streams image files from disk to a running relay over `StreamFrames`.
//!
//! # Usage
//!
//! ```bash
//! push-frames http://localhost:50051 ./frames --fps 15 --loop
//! push-frames localhost:50051 a.jpg b.jpg
//! ```
//!
//! Directories are expanded to their image files in name order. With
//! `--loop` the sequence repeats until Ctrl+C.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use clap::Parser;
use frame_relay::proto::SendFrameRequest;
use frame_relay::proto::frame_relay_service_client::FrameRelayServiceClient;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing_subscriber::EnvFilter;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

#[derive(Debug, Parser)]
#[command(name = "push-frames", about = "Stream image files to a frame relay", version)]
struct Args {
    /// Relay gRPC endpoint (`http://host:port` or `host:port`)
    endpoint: String,

    /// Image files or directories of images
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Frames per second
    #[arg(long, default_value_t = 10)]
    fps: u32,

    /// Repeat the sequence until interrupted
    #[arg(long = "loop")]
    repeat: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("push_frames=info")),
        )
        .init();

    let args = Args::parse();
    if args.fps == 0 {
        bail!("--fps must be greater than zero");
    }

    let frames = load_frames(&args.paths)?;
    tracing::info!(frames = frames.len(), fps = args.fps, repeat = args.repeat, "Loaded frames");

    let endpoint = normalize_endpoint(&args.endpoint);
    let mut client = FrameRelayServiceClient::connect(endpoint.clone())
        .await
        .with_context(|| format!("failed to connect to {endpoint}"))?;

    let (tx, rx) = mpsc::channel(1);
    let period = Duration::from_secs(1) / args.fps;
    let pacer = tokio::spawn(pace(frames, period, args.repeat, tx));

    let response = client
        .stream_frames(ReceiverStream::new(rx))
        .await
        .context("relay rejected the stream")?
        .into_inner();

    let sent = pacer.await.context("frame pacer panicked")?;
    println!(
        "{} ({} of {} frames accepted)",
        response.message, response.frames_accepted, sent
    );
    Ok(())
}

/// Send frames at a fixed rate; returns how many were sent.
async fn pace(
    frames: Vec<(PathBuf, Bytes)>,
    period: Duration,
    repeat: bool,
    tx: mpsc::Sender<SendFrameRequest>,
) -> u64 {
    let mut ticker = tokio::time::interval(period);
    let mut sent = 0u64;
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        for (path, data) in &frames {
            tokio::select! {
                _ = &mut interrupted => {
                    tracing::info!(sent, "Interrupted, finishing stream");
                    return sent;
                }
                _ = ticker.tick() => {}
            }

            let request = SendFrameRequest {
                image_data: data.clone(),
                media_type: String::new(),
            };
            if tx.send(request).await.is_err() {
                tracing::warn!(path = %path.display(), "Relay closed the stream");
                return sent;
            }
            sent += 1;
            tracing::debug!(path = %path.display(), sent, "Frame sent");
        }

        if !repeat {
            return sent;
        }
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn load_frames(paths: &[PathBuf]) -> Result<Vec<(PathBuf, Bytes)>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries = std::fs::read_dir(path)
                .with_context(|| format!("failed to read directory {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect::<Vec<_>>();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }

    if files.is_empty() {
        bail!("no image files found");
    }

    files
        .into_iter()
        .map(|path| {
            let data = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok((path, Bytes::from(data)))
        })
        .collect()
}
