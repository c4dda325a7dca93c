//! Error types for slice loading.

use climate_common::ValidationError;
use slice_cache::FetchError;
use thiserror::Error;

/// Errors returned by [`crate::ClimateLoader`] operations.
///
/// Validation failures happen before any remote read and are never cached.
#[derive(Error, Debug, Clone)]
pub enum LoaderError {
    /// The request parameters are not a legal combination.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The remote read failed (or its task died).
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl LoaderError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
