use serde::{Deserialize, Serialize};

/// Mesh file extensions, matched case-insensitively.
const MESH_EXTENSIONS: &[&str] = &["gltf", "glb", "obj", "fbx"];

/// Unique key of a cached asset: a file name or an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey(pub String);

impl AssetKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is itself an absolute http(s) URL.
    pub fn is_absolute_url(&self) -> bool {
        is_http_url(&self.0)
    }

    pub fn kind(&self) -> AssetKind {
        let no_frag = self.0.split('#').next().unwrap_or(&self.0);
        let no_query = no_frag.split('?').next().unwrap_or(no_frag);
        let ext = std::path::Path::new(no_query)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());

        match ext {
            Some(ext) if MESH_EXTENSIONS.contains(&ext.as_str()) => AssetKind::Mesh,
            _ => AssetKind::Scene,
        }
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AssetKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for AssetKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// The kind of an asset, which decides the base location it resolves under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    Scene,
    Mesh,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Scene => write!(f, "scene"),
            AssetKind::Mesh => write!(f, "mesh"),
        }
    }
}

pub(crate) fn is_http_url(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("http://") || s.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_by_extension() {
        assert_eq!(AssetKey::new("santa.obj").kind(), AssetKind::Mesh);
        assert_eq!(AssetKey::new("Teapot.GLB").kind(), AssetKind::Mesh);
        assert_eq!(AssetKey::new("cornell_box.json").kind(), AssetKind::Scene);
        assert_eq!(AssetKey::new("no_extension").kind(), AssetKind::Scene);
        assert_eq!(
            AssetKey::new("https://cdn.example/models/bunny.fbx?v=2").kind(),
            AssetKind::Mesh
        );
    }

    #[test]
    fn test_absolute_url_detection() {
        assert!(AssetKey::new("https://cdn.example/a.json").is_absolute_url());
        assert!(AssetKey::new("http://localhost/a.json").is_absolute_url());
        assert!(!AssetKey::new("./res/scenes/a.json").is_absolute_url());
    }
}
