//! Request and result types for slice loading.

use std::sync::Arc;

use chrono::NaiveDate;
use climate_common::{LogicBox, Resolution, ScenarioInfo, VariableInfo};
use serde::{Deserialize, Serialize};
use slice_cache::{DType, FetchKey, NanStatistics, Raster};

/// One slice: a variable from one model run on one day.
///
/// ```rust
/// use climate_common::Resolution;
/// use slice_loader::SliceRequest;
///
/// let request = SliceRequest::new("tas", "ACCESS-CM2", "2050-07-01")
///     .with_scenario("ssp245")
///     .at_resolution(Resolution::Low);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRequest {
    pub variable: String,
    pub model: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Inferred from the date when absent.
    pub scenario: Option<String>,
    #[serde(default)]
    pub resolution: Resolution,
}

impl SliceRequest {
    pub fn new(variable: impl Into<String>, model: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            model: model.into(),
            date: date.into(),
            scenario: None,
            resolution: Resolution::default(),
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    pub fn at_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }
}

/// A daily series of one variable between two dates (both inclusive).
///
/// ```rust
/// use slice_loader::TimeSeriesRequest;
///
/// let request = TimeSeriesRequest::new("pr", "MIROC6", "1999-01-01", "1999-03-01")
///     .every(30)
///     .with_nan_stats();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesRequest {
    pub variable: String,
    pub model: String,
    pub start_date: String,
    pub end_date: String,
    /// Scenario for every date; inferred per date when absent.
    pub scenario: Option<String>,
    #[serde(default)]
    pub resolution: Resolution,
    pub step_days: i64,
    pub include_nan_stats: bool,
    /// Overrides the configured point cap.
    pub max_points: Option<usize>,
    /// Overrides the configured concurrency.
    pub max_workers: Option<usize>,
}

impl TimeSeriesRequest {
    pub fn new(
        variable: impl Into<String>,
        model: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            model: model.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            scenario: None,
            resolution: Resolution::default(),
            step_days: 1,
            include_nan_stats: false,
            max_points: None,
            max_workers: None,
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    pub fn at_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sample every `step_days` days.
    pub fn every(mut self, step_days: i64) -> Self {
        self.step_days = step_days;
        self
    }

    pub fn with_nan_stats(mut self) -> Self {
        self.include_nan_stats = true;
        self
    }

    /// Cap the number of points; must be at least 2.
    pub fn max_points(mut self, max_points: usize) -> Self {
        self.max_points = Some(max_points);
        self
    }

    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }
}

/// Catalogue metadata attached to a loaded slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceMetadata {
    pub variable: Option<VariableInfo>,
    pub scenario: Option<ScenarioInfo>,
}

/// A loaded slice and where it came from.
///
/// The raster is shared with the cache and read-only.
#[derive(Debug, Clone, Serialize)]
pub struct Slice {
    #[serde(skip)]
    pub raster: Arc<Raster>,
    pub variable: String,
    pub model: String,
    pub scenario: String,
    pub date: NaiveDate,
    pub resolution: Resolution,
    pub field: String,
    pub timestep: i64,
    pub quality: i32,
    /// Set for windowed reads.
    pub window: Option<LogicBox>,
    pub metadata: SliceMetadata,
    pub nan_statistics: Option<NanStatistics>,
}

impl Slice {
    pub(crate) fn new(resolved: ResolvedSlice, raster: Arc<Raster>) -> Self {
        let metadata = SliceMetadata {
            variable: climate_common::variable_info(&resolved.variable),
            scenario: climate_common::scenario_info(&resolved.scenario),
        };
        Self {
            raster,
            field: resolved.key.field().to_string(),
            timestep: resolved.key.timestep(),
            quality: resolved.key.quality(),
            variable: resolved.variable,
            model: resolved.model,
            scenario: resolved.scenario,
            date: resolved.date,
            resolution: resolved.resolution,
            window: None,
            metadata,
            nan_statistics: None,
        }
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.raster.shape()
    }

    pub fn dtype(&self) -> DType {
        self.raster.dtype()
    }

    pub fn size_bytes(&self) -> usize {
        self.raster.nbytes()
    }

    /// Date as `YYYY-MM-DD`.
    pub fn time(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn key(&self) -> FetchKey {
        FetchKey::new(self.field.clone(), self.timestep, self.quality)
    }
}

/// Validated request parameters with their cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedSlice {
    pub variable: String,
    pub model: String,
    pub scenario: String,
    pub date: NaiveDate,
    pub resolution: Resolution,
    pub key: FetchKey,
}
