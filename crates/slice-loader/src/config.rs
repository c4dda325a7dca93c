//! Configuration for the slice loader.

use serde::{Deserialize, Serialize};
use slice_cache::CacheConfig;

pub const MAX_WORKERS_ENV: &str = "NEX_GDDP_MAX_WORKERS";
pub const MAX_TIME_SERIES_POINTS_ENV: &str = "NEX_GDDP_MAX_TIME_SERIES_POINTS";
pub const DATASET_URL_ENV: &str = "NEX_GDDP_DATASET_URL";

/// Public NEX-GDDP-CMIP6 endpoint.
pub const DEFAULT_DATASET_URL: &str =
    "http://atlantis.sci.utah.edu/mod_visus?dataset=nex-gddp-cmip6&cached=arco";

/// Configuration for the slice loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Cache tiers.
    pub cache: CacheConfig,

    /// Maximum concurrent fetches per multi-slice call.
    pub max_workers: usize,

    /// Time series longer than this are evenly subsampled.
    pub max_time_series_points: usize,

    /// Dataset URL handed to source adapters.
    pub dataset_url: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            max_workers: 3,
            max_time_series_points: 600,
            dataset_url: DEFAULT_DATASET_URL.to_string(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            cache: CacheConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = std::env::var(MAX_WORKERS_ENV) {
            if let Ok(workers) = val.trim().parse() {
                config.max_workers = workers;
            }
        }

        if let Ok(val) = std::env::var(MAX_TIME_SERIES_POINTS_ENV) {
            if let Ok(points) = val.trim().parse() {
                config.max_time_series_points = points;
            }
        }

        if let Ok(val) = std::env::var(DATASET_URL_ENV) {
            if !val.trim().is_empty() {
                config.dataset_url = val.trim().to_string();
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()?;

        if self.max_workers == 0 {
            return Err("max_workers must be > 0".to_string());
        }

        if self.max_time_series_points < 2 {
            return Err("max_time_series_points must be >= 2".to_string());
        }

        Ok(())
    }
}
