use std::path::PathBuf;

use async_trait::async_trait;
use raylace_core::{AssetsConfig, RaylaceError, RaylaceResult};

use crate::key::{is_http_url, AssetKey, AssetKind};

/// Loads the raw bytes behind an asset key.
///
/// Implementations do no caching of their own; [`crate::AssetCache`] calls
/// `fetch` at most once per key at a time.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, key: &AssetKey) -> RaylaceResult<Vec<u8>>;
}

/// Where an asset key resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    Url(String),
    Path(PathBuf),
}

impl std::fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetLocation::Url(url) => write!(f, "{}", url),
            AssetLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Resolves keys against the scene and model base locations.
#[derive(Debug, Clone)]
pub struct AssetLocator {
    pub scenes_base: String,
    pub models_base: String,
}

impl AssetLocator {
    pub fn new(scenes_base: impl Into<String>, models_base: impl Into<String>) -> Self {
        Self {
            scenes_base: scenes_base.into(),
            models_base: models_base.into(),
        }
    }

    pub fn from_config(config: &AssetsConfig) -> Self {
        Self::new(config.scenes_base.clone(), config.models_base.clone())
    }

    pub fn resolve(&self, key: &AssetKey) -> AssetLocation {
        if key.is_absolute_url() {
            return AssetLocation::Url(key.as_str().trim().to_string());
        }

        let base = match key.kind() {
            AssetKind::Mesh => &self.models_base,
            AssetKind::Scene => &self.scenes_base,
        };
        tracing::trace!("resolved key={} as {}", key, key.kind());

        if is_http_url(base) {
            AssetLocation::Url(format!("{}/{}", base.trim_end_matches('/'), key))
        } else {
            AssetLocation::Path(PathBuf::from(base).join(key.as_str()))
        }
    }
}

/// Fetches from the filesystem or over HTTP depending on where a key resolves.
pub struct LocatingFetcher {
    locator: AssetLocator,
    client: reqwest::Client,
}

impl LocatingFetcher {
    pub fn new(locator: AssetLocator) -> Self {
        Self {
            locator,
            client: reqwest::Client::new(),
        }
    }

    pub fn locator(&self) -> &AssetLocator {
        &self.locator
    }

    async fn fetch_url(&self, key: &AssetKey, url: &str) -> RaylaceResult<Vec<u8>> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RaylaceError::asset_fetch(key.as_str(), format!("GET {}: {}", url, e)))?;

        if !res.status().is_success() {
            return Err(RaylaceError::asset_fetch(
                key.as_str(),
                format!("GET {}: status {}", url, res.status()),
            ));
        }

        let bytes = res.bytes().await.map_err(|e| {
            RaylaceError::asset_fetch(key.as_str(), format!("reading body of {}: {}", url, e))
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AssetFetcher for LocatingFetcher {
    async fn fetch(&self, key: &AssetKey) -> RaylaceResult<Vec<u8>> {
        let location = self.locator.resolve(key);
        tracing::debug!("fetching {} from {}", key, location);

        match location {
            AssetLocation::Url(url) => self.fetch_url(key, &url).await,
            AssetLocation::Path(path) => tokio::fs::read(&path).await.map_err(|e| {
                RaylaceError::asset_fetch(key.as_str(), format!("{}: {}", path.display(), e))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> AssetLocator {
        AssetLocator::new("./res/scenes", "https://cdn.example/models/")
    }

    #[test]
    fn test_scene_resolves_under_scene_base() {
        assert_eq!(
            locator().resolve(&AssetKey::new("cornell_box.json")),
            AssetLocation::Path(PathBuf::from("./res/scenes/cornell_box.json"))
        );
    }

    #[test]
    fn test_mesh_resolves_under_url_base() {
        assert_eq!(
            locator().resolve(&AssetKey::new("santa.obj")),
            AssetLocation::Url("https://cdn.example/models/santa.obj".to_string())
        );
    }

    #[test]
    fn test_absolute_key_is_used_verbatim() {
        assert_eq!(
            locator().resolve(&AssetKey::new("https://other.example/x.json")),
            AssetLocation::Url("https://other.example/x.json".to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_reads_file() {
        let root = std::env::temp_dir().join(format!("raylace_fetch_{}", std::process::id()));
        let scenes = root.join("scenes");
        std::fs::create_dir_all(&scenes).unwrap();
        std::fs::write(scenes.join("a.json"), b"{\"meshes\":[]}").unwrap();

        let fetcher = LocatingFetcher::new(AssetLocator::new(
            scenes.to_string_lossy(),
            root.join("models").to_string_lossy(),
        ));
        let bytes = fetcher.fetch(&AssetKey::new("a.json")).await.unwrap();
        assert_eq!(bytes, b"{\"meshes\":[]}");

        let err = fetcher.fetch(&AssetKey::new("missing.obj")).await.unwrap_err();
        assert!(matches!(err, RaylaceError::AssetFetch { ref key, .. } if key == "missing.obj"));

        let _ = std::fs::remove_dir_all(&root);
    }
}
