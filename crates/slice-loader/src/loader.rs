//! The slice loading service.
//!
//! `ClimateLoader` validates requests, derives cache keys and routes reads
//! through the [`CacheCoordinator`]. Multi-slice calls fan out through the
//! [`FetchOrchestrator`]:
//!
//! - batches and multi-variable loads are best-effort, one result per item
//! - time series are all-or-nothing; the first failure fails the call
//!
//! Everything that can be validated is validated before the first remote
//! read.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use climate_common::{
    date_range, infer_scenario, parse_date, validate_all, LogicBox, Resolution, ValidationError,
    ValidationResult,
};
use slice_cache::{
    CacheCoordinator, CacheSetupError, CoordinatorStats, FetchError, FetchKey, GridDataSource,
    Raster, SourceError,
};
use tracing::{debug, info};

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use crate::orchestrator::FetchOrchestrator;
use crate::request::{ResolvedSlice, Slice, SliceRequest, TimeSeriesRequest};
use crate::subsample::subsample;

/// Loads climate slices through a two-tier single-flight cache.
pub struct ClimateLoader {
    coordinator: CacheCoordinator,
    source: Arc<dyn GridDataSource>,
    orchestrator: FetchOrchestrator,
    config: LoaderConfig,
}

impl ClimateLoader {
    /// Create a loader and its cache tiers from `config`.
    pub fn new(
        config: LoaderConfig,
        source: Arc<dyn GridDataSource>,
    ) -> std::result::Result<Self, CacheSetupError> {
        config.validate().map_err(CacheSetupError::InvalidConfig)?;
        let coordinator = CacheCoordinator::new(&config.cache)?;
        Ok(Self::with_coordinator(config, source, coordinator))
    }

    /// Create a loader configured from the environment.
    pub fn from_env(source: Arc<dyn GridDataSource>) -> std::result::Result<Self, CacheSetupError> {
        Self::new(LoaderConfig::from_env(), source)
    }

    /// Create a loader over an existing coordinator, e.g. one shared with
    /// another loader.
    pub fn with_coordinator(
        config: LoaderConfig,
        source: Arc<dyn GridDataSource>,
        coordinator: CacheCoordinator,
    ) -> Self {
        Self {
            orchestrator: FetchOrchestrator::new(config.max_workers),
            coordinator,
            source,
            config,
        }
    }

    /// Load one slice.
    pub async fn load(&self, request: &SliceRequest) -> Result<Slice> {
        let date = parse_date(&request.date)?;
        let resolved = resolve(
            &request.variable,
            &request.model,
            request.scenario.as_deref(),
            date,
            request.resolution,
        )?;
        self.load_resolved(resolved).await
    }

    /// Load many independent slices, reporting each outcome in input order.
    pub async fn load_batch(&self, requests: &[SliceRequest]) -> Vec<Result<Slice>> {
        let width = self.orchestrator.width_for(requests.len(), None);
        self.orchestrator
            .run_each(requests.to_vec(), width, move |request| async move {
                self.load(&request).await
            })
            .await
    }

    /// Load several variables for the same model, scenario and day.
    ///
    /// An empty variable list is a validation error. Otherwise each
    /// variable's outcome is reported separately, in input order.
    pub async fn load_variables<S: AsRef<str>>(
        &self,
        variables: &[S],
        date: &str,
        model: &str,
        scenario: Option<&str>,
        resolution: Resolution,
        max_workers: Option<usize>,
    ) -> Result<Vec<Result<Slice>>> {
        if variables.is_empty() {
            return Err(ValidationError::invalid_request("At least one variable is required").into());
        }

        let requests: Vec<SliceRequest> = variables
            .iter()
            .map(|variable| SliceRequest {
                variable: variable.as_ref().to_string(),
                model: model.to_string(),
                date: date.to_string(),
                scenario: scenario.map(str::to_string),
                resolution,
            })
            .collect();

        let width = self.orchestrator.width_for(requests.len(), max_workers);
        Ok(self
            .orchestrator
            .run_each(requests, width, move |request| async move {
                self.load(&request).await
            })
            .await)
    }

    /// Load a daily series, subsampled to at most the point cap.
    ///
    /// The requested end date is always the last point. Any failed slice
    /// fails the whole series.
    pub async fn load_time_series(&self, request: &TimeSeriesRequest) -> Result<Vec<Slice>> {
        let started = Instant::now();
        let resolved = self.resolve_series(request)?;
        let width = self.orchestrator.width_for(resolved.len(), request.max_workers);
        let include_nan_stats = request.include_nan_stats;

        let slices = self
            .orchestrator
            .try_run_all(resolved, width, move |slice| async move {
                let mut slice = self.load_resolved(slice).await?;
                if include_nan_stats {
                    slice.nan_statistics = Some(slice.raster.nan_statistics());
                }
                Ok::<_, LoaderError>(slice)
            })
            .await?;

        info!(
            variable = %request.variable,
            model = %request.model,
            points = slices.len(),
            workers = width,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded time series"
        );
        Ok(slices)
    }

    /// Load a daily series of one pixel window.
    ///
    /// Dates are generated and capped as for [`Self::load_time_series`].
    /// Windowed reads go straight to the source; they are neither served
    /// from nor written to the caches.
    pub async fn load_window_series(
        &self,
        request: &TimeSeriesRequest,
        window: LogicBox,
    ) -> Result<Vec<Slice>> {
        let window = window.validate()?;
        let resolved = self.resolve_series(request)?;
        let width = self.orchestrator.width_for(resolved.len(), request.max_workers);
        let include_nan_stats = request.include_nan_stats;

        self.orchestrator
            .try_run_all(resolved, width, move |resolved| async move {
                let raster = self.read_window(&resolved.key, window).await?;
                let mut slice = Slice::new(resolved, Arc::new(raster));
                slice.window = Some(window);
                if include_nan_stats {
                    slice.nan_statistics = Some(slice.raster.nan_statistics());
                }
                Ok::<_, LoaderError>(slice)
            })
            .await
    }

    pub fn cache_stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &CacheCoordinator {
        &self.coordinator
    }

    async fn load_resolved(&self, resolved: ResolvedSlice) -> Result<Slice> {
        let fetch = fetch_closure(self.source.clone(), resolved.key.clone(), None);
        let raster = self.coordinator.acquire(resolved.key.clone(), fetch).await?;
        debug!(key = %resolved.key, "Slice ready");
        Ok(Slice::new(resolved, raster))
    }

    async fn read_window(&self, key: &FetchKey, window: LogicBox) -> Result<Raster> {
        let read = fetch_closure(self.source.clone(), key.clone(), Some(window));
        let raster = tokio::task::spawn_blocking(read)
            .await
            .map_err(|e| FetchError::aborted(key.clone(), e.to_string()))?
            .map_err(|e| FetchError::source(key.clone(), &e))?;
        Ok(raster)
    }

    /// Validate a series request and resolve every date it will load.
    fn resolve_series(&self, request: &TimeSeriesRequest) -> ValidationResult<Vec<ResolvedSlice>> {
        let start = parse_date(&request.start_date)?;
        let end = parse_date(&request.end_date)?;
        let dates = date_range(start, end, request.step_days)?;

        let cap = request
            .max_points
            .unwrap_or(self.config.max_time_series_points);
        if cap < 2 {
            return Err(ValidationError::invalid_request(format!(
                "max_points must be >= 2, got {cap}"
            )));
        }
        let sampled = subsample(&dates, cap);
        if sampled.len() < dates.len() {
            debug!(
                requested = dates.len(),
                kept = sampled.len(),
                cap,
                "Subsampled time series"
            );
        }

        sampled
            .into_iter()
            .map(|date| {
                resolve(
                    &request.variable,
                    &request.model,
                    request.scenario.as_deref(),
                    date,
                    request.resolution,
                )
            })
            .collect()
    }
}

/// Infer the scenario, validate, and derive the cache key.
fn resolve(
    variable: &str,
    model: &str,
    scenario: Option<&str>,
    date: NaiveDate,
    resolution: Resolution,
) -> ValidationResult<ResolvedSlice> {
    let scenario = infer_scenario(date, scenario)?;
    validate_all(variable, model, &scenario, date, resolution)?;
    let key = FetchKey::for_slice(variable, model, &scenario, date, resolution)?;

    Ok(ResolvedSlice {
        variable: variable.to_string(),
        model: model.to_string(),
        scenario,
        date,
        resolution,
        key,
    })
}

fn fetch_closure(
    source: Arc<dyn GridDataSource>,
    key: FetchKey,
    window: Option<LogicBox>,
) -> impl FnOnce() -> std::result::Result<Raster, SourceError> + Send + 'static {
    move || source.read(key.field(), key.timestep(), key.quality(), window)
}
