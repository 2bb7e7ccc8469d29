use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::OnceCell;

use raylace_core::{RaylaceError, RaylaceResult};

use crate::fetch::AssetFetcher;
use crate::scene::{SceneAssets, SceneManifest};
use crate::{AssetBytes, AssetKey};

type Slot = Arc<OnceCell<AssetBytes>>;

/// Write-once store of asset bytes keyed by [`AssetKey`].
///
/// Each key owns a slot that is initialised at most once. Concurrent `put`s
/// for the same key await the same initialisation, so the underlying fetch
/// runs once; a failed fetch leaves the slot empty for the next caller.
pub struct AssetCache {
    fetcher: Arc<dyn AssetFetcher>,
    slots: DashMap<AssetKey, Slot>,
}

impl AssetCache {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            slots: DashMap::new(),
        }
    }

    // The shard guard must not live across an await.
    fn slot(&self, key: &AssetKey) -> Slot {
        Arc::clone(&self.slots.entry(key.clone()).or_default())
    }

    /// Fetch and insert `key` if absent, else return the cached bytes.
    pub async fn put(&self, key: &AssetKey) -> RaylaceResult<AssetBytes> {
        let slot = self.slot(key);
        let bytes = slot
            .get_or_try_init(|| async {
                let bytes = self.fetcher.fetch(key).await?;
                tracing::info!("cached asset '{}' ({} bytes)", key, bytes.len());
                Ok::<AssetBytes, RaylaceError>(AssetBytes::from(bytes))
            })
            .await?;
        Ok(bytes.clone())
    }

    /// Register externally supplied bytes under `key`.
    ///
    /// Returns the bytes that own the key afterwards: `bytes` if the key was
    /// free, the earlier bytes otherwise.
    pub async fn insert(&self, key: &AssetKey, bytes: impl Into<AssetBytes>) -> AssetBytes {
        let bytes = bytes.into();
        let slot = self.slot(key);
        slot.get_or_init(|| async move { bytes }).await.clone()
    }

    pub fn get(&self, key: &AssetKey) -> RaylaceResult<AssetBytes> {
        self.slots
            .get(key)
            .and_then(|slot| slot.get().cloned())
            .ok_or_else(|| RaylaceError::AssetNotFound(key.to_string()))
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.slots
            .get(key)
            .map(|slot| slot.initialized())
            .unwrap_or(false)
    }

    /// Number of keys with bytes present.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached keys, sorted.
    pub fn keys(&self) -> Vec<AssetKey> {
        let mut keys: Vec<AssetKey> = self
            .slots
            .iter()
            .filter(|slot| slot.initialized())
            .map(|slot| slot.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Fetch a scene and every mesh it references.
    ///
    /// Missing meshes are fetched concurrently. Any failure fails the whole
    /// load; meshes that did arrive stay cached.
    ///
    /// A scene whose bytes are not valid JSON fails with `InvalidManifest`
    /// instead of loading without meshes. Its bytes stay cached.
    pub async fn put_scene(&self, key: &AssetKey) -> RaylaceResult<SceneAssets> {
        let scene = self.put(key).await?;
        let manifest = SceneManifest::parse(key, &scene)?;
        let mesh_keys = manifest.mesh_keys();

        let pending: Vec<&AssetKey> = mesh_keys.iter().filter(|k| !self.contains(k)).collect();
        if !pending.is_empty() {
            tracing::debug!(
                "scene '{}' needs {} of {} meshes",
                key,
                pending.len(),
                mesh_keys.len()
            );
        }
        // Every fetch runs to completion so the ones that succeed stay cached.
        for result in join_all(pending.into_iter().map(|mesh| self.put(mesh))).await {
            result?;
        }

        let meshes = mesh_keys
            .into_iter()
            .map(|mesh| {
                let bytes = self.get(&mesh)?;
                Ok((mesh, bytes))
            })
            .collect::<RaylaceResult<Vec<_>>>()?;

        Ok(SceneAssets {
            key: key.clone(),
            scene,
            meshes,
        })
    }
}
