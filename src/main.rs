mod core;
mod ui;
mod utils;
mod workers;

use crate::core::offline::{self, AssetCache, HttpSource, Served};
use crate::utils::data_dir;
use crate::utils::log_buffer::{BufferLayer, FileLogLayer, LogBuffer};
use crate::utils::sos::SignalOfStop;
use anyhow::Context;
use std::io::Write;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use workers::args::{Args, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::load();

    let data_dir = data_dir::resolve(args.conf.as_deref())?;

    let filter = match args.verbose {
        0 => "warn,stranger_connect=info",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let log_buffer = LogBuffer::new();
    let file_layer = FileLogLayer::new(&data_dir::log_file(&data_dir))?;

    // No fmt layer on stderr: it would tear the TUI. The Logs screen reads
    // the buffer and the file keeps the full history.
    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(BufferLayer::new(log_buffer.clone()))
        .with(file_layer)
        .init();

    let sos = SignalOfStop::new();

    let sos_clone = sos.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        sos_clone.cancel();
    });

    match args.command() {
        Command::Chat => ui::run(args, data_dir, sos, log_buffer).await,
        Command::Install => install(args.shell_origin(), &data_dir).await,
        Command::Fetch { url, output } => {
            fetch(args.shell_origin(), &data_dir, &url, output.as_deref()).await
        }
    }
}

async fn install(origin: &str, data_dir: &Path) -> anyhow::Result<()> {
    let urls = offline::manifest(origin)?;
    let cache = AssetCache::open(data_dir);
    let count = cache.install(&urls, &HttpSource::new()?).await?;
    println!("Cached {count} assets in {}", cache.dir().display());
    Ok(())
}

async fn fetch(
    origin: &str,
    data_dir: &Path,
    raw: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let url = offline::resolve(origin, raw)?;
    let (asset, served) = AssetCache::open(data_dir)
        .fetch(&url, &HttpSource::new()?)
        .await?;

    let from = match served {
        Served::Cache => "cache",
        Served::Network => "network",
    };
    eprintln!("{url} ({}, {} bytes, from {from})", asset.content_type, asset.body.len());

    match output {
        Some(path) => std::fs::write(path, &asset.body)
            .with_context(|| format!("writing {}", path.display()))?,
        None => std::io::stdout().write_all(&asset.body)?,
    }
    Ok(())
}
