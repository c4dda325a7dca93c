//! Boundary to the remote multiresolution grid reader.

use climate_common::LogicBox;

use crate::error::SourceError;
use crate::raster::Raster;

/// Synchronous reader for the remote gridded dataset.
///
/// Implementations may block on network I/O; callers run them on the
/// blocking pool. A `window` is inclusive; implementations pass
/// [`LogicBox::end_exclusive`] bounds to readers that expect half-open
/// ranges.
pub trait GridDataSource: Send + Sync {
    fn read(
        &self,
        field: &str,
        timestep: i64,
        quality: i32,
        window: Option<LogicBox>,
    ) -> Result<Raster, SourceError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "grid-source"
    }
}
