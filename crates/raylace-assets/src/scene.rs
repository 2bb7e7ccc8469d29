use serde::Deserialize;

use raylace_core::{RaylaceError, RaylaceResult};

use crate::{AssetBytes, AssetKey};

/// The part of a scene description the asset layer cares about: which mesh
/// files it references. Every other field belongs to the render engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneManifest {
    #[serde(default)]
    pub meshes: Option<Vec<MeshReference>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeshReference {
    pub file_name: String,
}

impl SceneManifest {
    pub fn parse(key: &AssetKey, bytes: &[u8]) -> RaylaceResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| RaylaceError::invalid_manifest(key.as_str(), e.to_string()))
    }

    /// Referenced mesh keys in manifest order, without duplicates.
    pub fn mesh_keys(&self) -> Vec<AssetKey> {
        let mut keys: Vec<AssetKey> = Vec::new();
        for mesh in self.meshes.iter().flatten() {
            let key = AssetKey::new(mesh.file_name.clone());
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

/// A scene description together with every mesh it references, all resolved.
#[derive(Debug, Clone)]
pub struct SceneAssets {
    pub key: AssetKey,
    pub scene: AssetBytes,
    pub meshes: Vec<(AssetKey, AssetBytes)>,
}

impl SceneAssets {
    pub fn mesh(&self, file_name: &str) -> Option<&AssetBytes> {
        self.meshes
            .iter()
            .find(|(key, _)| key.as_str() == file_name)
            .map(|(_, bytes)| bytes)
    }

    /// Total bytes held across the scene and its meshes.
    pub fn byte_size(&self) -> usize {
        self.scene.len() + self.meshes.iter().map(|(_, b)| b.len()).sum::<usize>()
    }
}
