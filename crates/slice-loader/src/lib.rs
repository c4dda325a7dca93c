//! Validated loading of NEX-GDDP-CMIP6 climate slices.
//!
//! # Architecture
//!
//! ```text
//! SliceRequest / TimeSeriesRequest
//!      │
//!      ▼
//! validate + infer scenario ──► ValidationError (no remote read)
//!      │
//!      ▼
//! FetchKey (field, timestep, quality)
//!      │
//!      ▼
//! FetchOrchestrator (≤ max_workers in flight, input order kept)
//!      │
//!      ▼
//! CacheCoordinator::acquire
//!      ├─► disk blob hit
//!      ├─► memory LRU hit
//!      ├─► join in-flight fetch
//!      └─► GridDataSource::read ──► populate both tiers
//! ```
//!
//! # Example
//!
//! ```ignore
//! use slice_loader::{ClimateLoader, LoaderConfig, SliceRequest};
//!
//! let loader = ClimateLoader::new(LoaderConfig::from_env(), source)?;
//! let slice = loader
//!     .load(&SliceRequest::new("tas", "ACCESS-CM2", "1999-12-20"))
//!     .await?;
//! assert_eq!(slice.timestep, 18250);
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod orchestrator;
pub mod request;
pub mod subsample;

pub use config::{LoaderConfig, DEFAULT_DATASET_URL};
pub use error::{LoaderError, Result};
pub use loader::ClimateLoader;
pub use orchestrator::FetchOrchestrator;
pub use request::{Slice, SliceMetadata, SliceRequest, TimeSeriesRequest};
pub use subsample::subsample;
