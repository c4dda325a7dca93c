//! Synthetic raster data for tests.
//!
//! Every generator is deterministic, so two calls with the same arguments
//! produce bit-identical grids. Grids are row-major, row 0 first.

use slice_cache::Raster;

/// Grid where each cell is `col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(5, 10);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);  // row 0, col 1
/// assert_eq!(grid[10], 1.0);    // row 1, col 0
/// ```
pub fn create_test_grid(rows: usize, cols: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Near-surface temperature in Kelvin, 250K at the top-left corner rising
/// towards 310K at the bottom-right.
pub fn create_temperature_grid(rows: usize, cols: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let x_factor = col as f32 / cols.max(1) as f32;
            let y_factor = row as f32 / rows.max(1) as f32;
            data.push(250.0 + x_factor * 30.0 + y_factor * 30.0);
        }
    }
    data
}

/// Zeros with NaN at the given `(row, col)` positions.
pub fn create_grid_with_nans(rows: usize, cols: usize, nan_positions: &[(usize, usize)]) -> Vec<f32> {
    let mut data = vec![0.0f32; rows * cols];
    for &(row, col) in nan_positions {
        if row < rows && col < cols {
            data[row * cols + col] = f32::NAN;
        }
    }
    data
}

/// Temperature-like grid whose bottom rows are NaN, like an ocean mask on
/// a land-only variable.
pub fn create_masked_grid(rows: usize, cols: usize, masked_rows: usize) -> Vec<f32> {
    let mut data = create_temperature_grid(rows, cols);
    let start = rows.saturating_sub(masked_rows) * cols;
    for v in &mut data[start..] {
        *v = f32::NAN;
    }
    data
}

/// Values a fake remote source returns for one slice.
///
/// Depends only on the slice identity, so repeated reads are identical and
/// different slices are distinguishable.
pub fn slice_values(field: &str, timestep: i64, quality: i32, rows: usize, cols: usize) -> Vec<f32> {
    let seed = field
        .bytes()
        .fold(quality as u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32));
    let base = (timestep % 10_000) as f32;
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let jitter = (simple_hash(col as u32, row as u32, seed) % 1000) as f32 / 1000.0;
            data.push(base + jitter);
        }
    }
    data
}

/// `rows x cols` f32 raster built from [`create_test_grid`].
pub fn test_raster(rows: usize, cols: usize) -> Raster {
    Raster::from_f32(rows, cols, create_test_grid(rows, cols))
        .unwrap_or_else(|e| panic!("generator produced a bad shape: {e}"))
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
