//! Configuration for the slice cache.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const CACHE_DIR_ENV: &str = "NEX_GDDP_CACHE_DIR";
pub const MEMORY_CACHE_ENV: &str = "NEX_GDDP_MEMORY_CACHE";
pub const DISABLE_DISK_CACHE_ENV: &str = "NEX_GDDP_DISABLE_DISK_CACHE";

/// Subdirectory of the cache directory holding array blobs.
pub const DATA_CACHE_SUBDIR: &str = "data_cache";

/// Configuration for the two cache tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Base cache directory. Blobs live under `data_cache/`.
    pub cache_dir: PathBuf,

    /// Number of rasters kept in memory.
    pub memory_capacity: usize,

    /// Whether rasters are persisted to disk.
    pub disk_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            memory_capacity: 32,
            disk_enabled: true,
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var(CACHE_DIR_ENV) {
            if !val.trim().is_empty() {
                config.cache_dir = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var(MEMORY_CACHE_ENV) {
            if let Ok(capacity) = val.trim().parse() {
                config.memory_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var(DISABLE_DISK_CACHE_ENV) {
            let val = val.trim().to_lowercase();
            config.disk_enabled = !(val == "1" || val == "true");
        }

        config
    }

    /// Config rooted at `cache_dir` with other settings at their defaults.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.memory_capacity == 0 {
            return Err("memory_capacity must be > 0".to_string());
        }

        if self.disk_enabled && self.cache_dir.as_os_str().is_empty() {
            return Err("cache_dir must be set when the disk cache is enabled".to_string());
        }

        Ok(())
    }

    /// Directory holding the array blobs.
    pub fn data_dir(&self) -> PathBuf {
        self.cache_dir.join(DATA_CACHE_SUBDIR)
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nex_gddp_cache")
}
