//! Versioned on-disk cache of the static shell assets.
//!
//! Layout under `<data_dir>/cache/<cache-name>/`:
//! - one file per asset, named by the SHA3-256 of its URL
//! - `index.json`: URL → content type, written last
//!
//! The index is the commit point: a cache without one is not installed.

use crate::core::config::{ASSET_FETCH_TIMEOUT, CACHE_NAME};
use crate::utils::atomic_write::atomic_write;
use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Url};
use sha3::{Digest, Sha3_256};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Where a fetched asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    Cache,
    Network,
}

/// Something that can download an asset.
pub trait AssetSource: Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Asset>> + Send;
}

/// Plain HTTP(S) downloads.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(ASSET_FETCH_TIMEOUT)
            .user_agent(concat!("stranger-connect/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build reqwest client")?;
        Ok(Self { client })
    }
}

impl AssetSource for HttpSource {
    async fn fetch(&self, url: &Url) -> Result<Asset> {
        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GET {url}: HTTP {}", status.as_u16()));
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = resp.bytes().await?.to_vec();
        Ok(Asset { content_type, body })
    }
}

pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    /// The current cache version inside `data_dir`.
    pub fn open(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("cache").join(CACHE_NAME),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_installed(&self) -> bool {
        self.dir.join(INDEX_FILE).is_file()
    }

    /// Download every URL and commit them together. If any download fails
    /// nothing is committed and the previous state is kept.
    pub async fn install<S: AssetSource>(&self, urls: &[Url], source: &S) -> Result<usize> {
        let mut fetched = Vec::with_capacity(urls.len());
        for url in urls {
            let asset = source
                .fetch(url)
                .await
                .with_context(|| format!("fetching {url}"))?;
            debug!(event = "asset_fetched", %url, bytes = asset.body.len(), "Asset downloaded");
            fetched.push((url, asset));
        }

        let mut index = BTreeMap::new();
        for (url, asset) in &fetched {
            atomic_write(&self.body_path(url.as_str()), &asset.body)?;
            index.insert(url.to_string(), asset.content_type.clone());
        }
        let content = serde_json::to_string_pretty(&index)?;
        atomic_write(&self.dir.join(INDEX_FILE), content.as_bytes())?;

        info!(
            event = "shell_installed",
            cache = CACHE_NAME,
            assets = index.len(),
            "Offline shell cached"
        );
        Ok(index.len())
    }

    /// Cached copy of `url`, if any.
    pub fn lookup(&self, url: &Url) -> Option<Asset> {
        let index = self.read_index();
        let content_type = index.get(url.as_str())?.clone();
        match std::fs::read(self.body_path(url.as_str())) {
            Ok(body) => Some(Asset { content_type, body }),
            Err(e) => {
                warn!(event = "asset_body_missing", %url, error = %e, "Indexed asset unreadable");
                None
            }
        }
    }

    /// Cache first, then the network. A network response is never stored.
    pub async fn fetch<S: AssetSource>(&self, url: &Url, source: &S) -> Result<(Asset, Served)> {
        if let Some(asset) = self.lookup(url) {
            debug!(event = "asset_cache_hit", %url);
            return Ok((asset, Served::Cache));
        }
        debug!(event = "asset_cache_miss", %url);
        let asset = source.fetch(url).await?;
        Ok((asset, Served::Network))
    }

    fn read_index(&self) -> BTreeMap<String, String> {
        std::fs::read_to_string(self.dir.join(INDEX_FILE))
            .ok()
            .and_then(|c| serde_json::from_str(&c).ok())
            .unwrap_or_default()
    }

    fn body_path(&self, url: &str) -> PathBuf {
        self.dir.join(hex::encode(Sha3_256::digest(url.as_bytes())))
    }
}
