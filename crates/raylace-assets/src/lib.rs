//! # raylace-assets
//!
//! Content-keyed store of immutable scene and mesh blobs. Fetches are
//! deduplicated per key: concurrent requests for one key share a single
//! in-flight fetch, and a key's bytes never change once stored.

pub mod cache;
pub mod fetch;
pub mod key;
pub mod scene;

pub use cache::AssetCache;
pub use fetch::{AssetFetcher, AssetLocation, AssetLocator, LocatingFetcher};
pub use key::{AssetKey, AssetKind};
pub use scene::{SceneAssets, SceneManifest};

/// Immutable, cheaply shareable asset bytes.
pub type AssetBytes = std::sync::Arc<[u8]>;
