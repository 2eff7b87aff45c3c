//! `turbo-upload`: uploads a signed data item from disk.

mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use turbo_http::UploadClient;
use turbo_transfer::{ChunkingMode, ProgressEmitter, ReaderSource, UploadEvent, UploadOptions};

use config::Config;

#[derive(Parser)]
#[command(name = "turbo-upload")]
#[command(version, about = "Upload a signed data item, in chunks when it is large", long_about = None)]
struct Cli {
    /// Signed data item to upload
    file: PathBuf,

    /// Storage token tag
    #[arg(long)]
    token: Option<String>,

    /// Upload service URL
    #[arg(long)]
    url: Option<String>,

    /// Bytes per chunk
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Maximum chunk uploads in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Chunking mode: auto, force or disabled
    #[arg(long)]
    mode: Option<ChunkingMode>,

    /// Payer address (repeatable)
    #[arg(long = "paid-by")]
    paid_by: Vec<String>,

    /// Config file (defaults to ~/.config/turbo-upload/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(token) = &self.token {
            config.token = token.clone();
        }
        if let Some(url) = &self.url {
            config.upload_url = url.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_byte_count = chunk_size;
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrency = concurrency;
        }
        if let Some(mode) = self.mode {
            config.chunking_mode = mode;
        }
        if !self.paid_by.is_empty() {
            config.paid_by = self.paid_by.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply(&mut config);
    if cli.save_config {
        let path = match &cli.config {
            Some(path) => path.clone(),
            None => config::config_path()?,
        };
        config.save_to(&path)?;
    }

    let file = tokio::fs::File::open(&cli.file)
        .await
        .with_context(|| format!("failed to open {}", cli.file.display()))?;
    let total = file.metadata().await?.len();

    let client = UploadClient::new(&config.upload_url, config.chunking())?;

    let events = ProgressEmitter::new();
    events.on_any(log_event);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling upload");
                cancel.cancel();
            }
        }
    });

    info!(
        file = %cli.file.display(),
        bytes = total,
        url = %config.upload_url,
        mode = %config.chunking_mode,
        "starting upload"
    );

    let mut options = UploadOptions::new(config.token.clone(), total);
    options.paid_by = config.paid_by.clone();
    options.events = Some(events);
    options.cancel = Some(cancel);

    let response = client
        .upload(options, move || ReaderSource::new(file))
        .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn log_event(event: &UploadEvent) {
    match event {
        UploadEvent::ChunkProgress {
            processed_bytes,
            total_bytes,
        } => {
            let percent = *processed_bytes as f64 * 100.0 / (*total_bytes).max(1) as f64;
            info!(processed_bytes, total_bytes, "{percent:.1}% uploaded");
        }
        UploadEvent::ChunkError {
            part_number,
            offset,
            error,
            ..
        } => warn!(part = part_number, offset, %error, "chunk failed"),
        UploadEvent::UploadSuccess { total_bytes } => {
            info!(total_bytes, "all bytes delivered")
        }
        UploadEvent::UploadError { error } => warn!(%error, "upload failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "turbo-upload",
            "item.bin",
            "--token",
            "ario",
            "--chunk-size",
            "10485760",
            "--mode",
            "force",
            "--paid-by",
            "a",
            "--paid-by",
            "b",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.token, "ario");
        assert_eq!(config.chunk_byte_count, 10_485_760);
        assert_eq!(config.chunking_mode, ChunkingMode::Force);
        assert_eq!(config.paid_by, vec!["a", "b"]);
        assert_eq!(config.max_concurrency, 5);
        assert_eq!(config.upload_url, turbo_http::DEFAULT_UPLOAD_URL);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["turbo-upload", "item.bin", "--mode", "sometimes"]).is_err());
    }
}
