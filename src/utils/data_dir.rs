//! Application data directory.
//!
//! Defaults to `~/.stranger-connect/`; `--conf` overrides it. The resolved
//! path is passed explicitly to whatever needs it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const DEFAULT_DIR_NAME: &str = ".stranger-connect";

/// Resolve the data directory and make sure it exists.
pub fn resolve(custom: Option<&Path>) -> Result<PathBuf> {
    let dir = match custom {
        Some(p) => p.to_path_buf(),
        None => dirs::home_dir()
            .context("no home directory found; pass --conf")?
            .join(DEFAULT_DIR_NAME),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating data directory {}", dir.display()))?;
    Ok(dir)
}

pub fn log_file(data_dir: &Path) -> PathBuf {
    data_dir.join("logs").join("stranger-connect.log")
}
