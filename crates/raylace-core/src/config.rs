use serde::{Deserialize, Serialize};

use crate::error::{RaylaceError, RaylaceResult};

/// Worker count used when the platform cannot report its parallelism.
pub const FALLBACK_WORKER_COUNT: usize = 4;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    pub initial_scene: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            initial_scene: "default.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WorkersConfig {
    /// Number of render workers. Zero means one per hardware thread.
    pub count: usize,
    /// Bounded wait for a render cycle. Absent means wait forever.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub scenes_base: String,
    pub models_base: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            scenes_base: "./res/scenes".to_string(),
            models_base: "./res/models".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RenderConfig {
    /// Hand partially composited frames to the display after every response.
    pub progressive_preview: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RaylaceConfig {
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

impl RaylaceConfig {
    pub fn load_from_file(path: &std::path::Path) -> RaylaceResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> RaylaceResult<Self> {
        toml::from_str(contents).map_err(|e| RaylaceError::Config(e.to_string()))
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> RaylaceResult<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| RaylaceError::Config(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Effective number of render workers.
    pub fn worker_count(&self) -> usize {
        if self.workers.count > 0 {
            return self.workers.count;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(FALLBACK_WORKER_COUNT)
    }

    pub fn worker_timeout(&self) -> Option<std::time::Duration> {
        self.workers.timeout_ms.map(std::time::Duration::from_millis)
    }
}
