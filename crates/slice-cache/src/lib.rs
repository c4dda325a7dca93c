//! Two-tier cache for remote climate raster slices.
//!
//! Provides:
//! - [`FetchKey`]: canonical identity of a slice (field, timestep, quality)
//! - [`MemoryCache`]: bounded in-process LRU of shared rasters
//! - [`DiskCache`]: persistent write-once `.npy` blobs, served memory-mapped
//! - [`CacheCoordinator`]: composes both tiers with a [`GridDataSource`] fetch
//!   so that each key is fetched at most once at a time

pub mod config;
pub mod coordinator;
pub mod disk;
pub mod error;
pub mod key;
pub mod memory;
pub mod npy;
pub mod raster;
pub mod source;

pub use config::CacheConfig;
pub use coordinator::{CacheCoordinator, CoordinatorStats};
pub use disk::{blob_file_name, DiskCache, DiskScan, VerifyReport};
pub use error::{BlobError, CacheSetupError, FetchError, RasterError, SourceError};
pub use key::FetchKey;
pub use memory::{MemoryCache, MemoryCacheStats};
pub use raster::{DType, NanStatistics, Raster};
pub use source::GridDataSource;
