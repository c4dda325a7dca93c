//! Instrumented in-process stand-in for the remote grid reader.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use climate_common::LogicBox;
use rand::Rng;
use slice_cache::{GridDataSource, Raster, SourceError};

use crate::generators::slice_values;

#[derive(Debug, Clone, Copy)]
enum Latency {
    None,
    Fixed(Duration),
    Random { min: Duration, max: Duration },
}

/// Fake [`GridDataSource`] that counts reads and can inject latency and
/// failures.
///
/// Values come from [`slice_values`], so the same slice always reads back
/// bit-identical, unless a fixed grid is set with [`Self::with_grid`].
pub struct FakeGridSource {
    rows: usize,
    cols: usize,
    latency: Latency,
    grid: Option<Vec<f32>>,
    fail_timesteps: HashSet<i64>,
    fail_all: AtomicBool,
    calls: AtomicUsize,
    windowed_calls: AtomicUsize,
    calls_by_slice: Mutex<HashMap<(String, i64, i32), usize>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeGridSource {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            latency: Latency::None,
            grid: None,
            fail_timesteps: HashSet::new(),
            fail_all: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            windowed_calls: AtomicUsize::new(0),
            calls_by_slice: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Block every read for `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Latency::Fixed(latency);
        self
    }

    /// Block every read for a random duration in `min..=max`.
    pub fn with_random_latency(mut self, min: Duration, max: Duration) -> Self {
        self.latency = Latency::Random { min, max };
        self
    }

    /// Serve `values` (row-major, `rows * cols` long) for every slice.
    pub fn with_grid(mut self, values: Vec<f32>) -> Self {
        self.grid = Some(values);
        self
    }

    /// Fail every read of `timestep`.
    pub fn failing_on(mut self, timestep: i64) -> Self {
        self.fail_timesteps.insert(timestep);
        self
    }

    /// Fail (or stop failing) every read.
    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    /// Total reads, windowed or not.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn windowed_calls(&self) -> usize {
        self.windowed_calls.load(Ordering::SeqCst)
    }

    /// Reads of one slice.
    pub fn calls_for(&self, field: &str, timestep: i64, quality: i32) -> usize {
        self.calls_by_slice
            .lock()
            .unwrap()
            .get(&(field.to_string(), timestep, quality))
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of reads observed running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn sleep(&self) {
        let delay = match self.latency {
            Latency::None => return,
            Latency::Fixed(d) => d,
            Latency::Random { min, max } => {
                let ms = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(ms as u64)
            }
        };
        std::thread::sleep(delay);
    }
}

impl GridDataSource for FakeGridSource {
    fn read(
        &self,
        field: &str,
        timestep: i64,
        quality: i32,
        window: Option<LogicBox>,
    ) -> Result<Raster, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_slice
            .lock()
            .unwrap()
            .entry((field.to_string(), timestep, quality))
            .or_insert(0) += 1;

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.sleep();
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_all.load(Ordering::SeqCst) || self.fail_timesteps.contains(&timestep) {
            return Err(SourceError::Connection(format!(
                "simulated failure reading {field} at {timestep}"
            )));
        }

        let values = match &self.grid {
            Some(grid) => grid.clone(),
            None => slice_values(field, timestep, quality, self.rows, self.cols),
        };
        let Some(window) = window else {
            return Raster::from_f32(self.rows, self.cols, values)
                .map_err(|e| SourceError::decode(e.to_string()));
        };

        self.windowed_calls.fetch_add(1, Ordering::SeqCst);
        let (x_end, y_end) = window.end_exclusive();
        let (x_end, y_end) = (x_end as usize, y_end as usize);
        if x_end > self.cols || y_end > self.rows {
            return Err(SourceError::Window {
                window,
                message: format!("outside {}x{} grid", self.rows, self.cols),
            });
        }

        let mut cropped = Vec::with_capacity(window.width() as usize * window.height() as usize);
        for row in window.y0 as usize..y_end {
            cropped.extend_from_slice(&values[row * self.cols + window.x0 as usize..row * self.cols + x_end]);
        }
        Raster::from_f32(window.height() as usize, window.width() as usize, cropped)
            .map_err(|e| SourceError::decode(e.to_string()))
    }

    fn name(&self) -> &str {
        "fake"
    }
}
