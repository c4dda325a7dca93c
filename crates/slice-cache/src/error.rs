//! Error types for the slice cache.

use climate_common::LogicBox;
use thiserror::Error;

use crate::key::FetchKey;

/// Failure reported by a grid data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Could not reach or open the remote dataset.
    #[error("failed to connect to dataset: {0}")]
    Connection(String),

    /// The remote read itself failed.
    #[error("failed to read from dataset: {0}")]
    Read(String),

    /// The remote returned data that could not be decoded into a raster.
    #[error("failed to decode slice: {0}")]
    Decode(String),

    /// The requested window could not be served.
    #[error("failed to read window {window}: {message}")]
    Window { window: LogicBox, message: String },
}

impl SourceError {
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

/// A fetch for a key failed.
///
/// Cloneable because every caller waiting on the same in-flight fetch
/// receives the same error.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The grid data source returned an error.
    #[error("failed to read {key}: {reason}")]
    Source { key: FetchKey, reason: String },

    /// The fetch task panicked or was torn down before finishing.
    #[error("fetch for {key} did not complete: {reason}")]
    Aborted { key: FetchKey, reason: String },
}

impl FetchError {
    pub fn source(key: FetchKey, err: &SourceError) -> Self {
        Self::Source {
            key,
            reason: err.to_string(),
        }
    }

    pub fn aborted(key: FetchKey, reason: impl Into<String>) -> Self {
        Self::Aborted {
            key,
            reason: reason.into(),
        }
    }

    /// Key whose fetch failed.
    pub fn key(&self) -> &FetchKey {
        match self {
            Self::Source { key, .. } | Self::Aborted { key, .. } => key,
        }
    }
}

/// Values and shape of a raster disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shape {rows}x{cols} needs {expected} values, got {actual}")]
pub struct RasterError {
    pub rows: usize,
    pub cols: usize,
    pub expected: usize,
    pub actual: usize,
}

/// Reading or writing an on-disk array blob failed.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not a well-formed blob (corrupt or truncated).
    #[error("invalid npy blob: {0}")]
    Invalid(String),

    /// Well-formed, but a layout this cache never writes.
    #[error("unsupported npy blob: {0}")]
    Unsupported(String),
}

impl BlobError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

/// A cache could not be set up from its configuration.
#[derive(Debug, Error)]
pub enum CacheSetupError {
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to create cache directory: {0}")]
    Io(#[from] std::io::Error),
}
