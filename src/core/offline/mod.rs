//! Install/offline shell: a write-once cache of the static shell assets
//! and the deferred install prompt.

mod assets;
mod prompt;

pub use assets::{Asset, AssetCache, AssetSource, HttpSource, Served};
pub use prompt::{InstallPrompt, PromptChoice};

use crate::core::config::SHELL_ASSETS;
use anyhow::{Context, Result};
use reqwest::Url;

/// Resolve the asset manifest against `origin`. Absolute entries are kept
/// verbatim.
pub fn manifest(origin: &str) -> Result<Vec<Url>> {
    let base = Url::parse(origin).with_context(|| format!("invalid shell origin {origin:?}"))?;
    SHELL_ASSETS
        .iter()
        .map(|entry| {
            base.join(entry)
                .with_context(|| format!("invalid manifest entry {entry:?}"))
        })
        .collect()
}

/// Resolve a single request URL the same way manifest entries are.
pub fn resolve(origin: &str, raw: &str) -> Result<Url> {
    let base = Url::parse(origin).with_context(|| format!("invalid shell origin {origin:?}"))?;
    base.join(raw).with_context(|| format!("invalid url {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_resolves_relative_entries() {
        let urls = manifest("https://chat.example/app/").unwrap();
        assert_eq!(urls.len(), SHELL_ASSETS.len());
        assert_eq!(urls[0].as_str(), "https://chat.example/app/");
        assert_eq!(urls[2].as_str(), "https://chat.example/app/style.css");
        assert!(urls.iter().any(|u| u.host_str() == Some("unpkg.com")));
        assert!(urls.iter().any(|u| u.host_str() == Some("fonts.googleapis.com")));
    }

    #[test]
    fn bad_origin_is_an_error() {
        assert!(manifest("not a url").is_err());
    }

    #[test]
    fn resolve_keeps_absolute_urls() {
        let url = resolve("http://localhost:8080/", "https://unpkg.com/x.js").unwrap();
        assert_eq!(url.as_str(), "https://unpkg.com/x.js");
    }
}
