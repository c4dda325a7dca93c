//! Immutable 2-D rasters.

use std::fmt;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::error::RasterError;

/// Floating element type of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    F32,
    F64,
}

impl DType {
    /// Bytes per element.
    pub fn size(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
        }
    }

    /// NumPy type descriptor (always little-endian).
    pub fn descr(&self) -> &'static str {
        match self {
            DType::F32 => "<f4",
            DType::F64 => "<f8",
        }
    }

    pub fn from_descr(descr: &str) -> Option<Self> {
        match descr {
            "<f4" => Some(DType::F32),
            "<f8" => Some(DType::F64),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => f.write_str("float32"),
            DType::F64 => f.write_str("float64"),
        }
    }
}

enum Buffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
    /// Read-only map of a cache file; `offset` is where the payload starts.
    Mapped { map: Mmap, offset: usize },
}

/// A row-major 2-D grid of floating values.
///
/// Rasters have no mutable accessors. Once one is handed out by a cache tier
/// it is shared by every caller, so callers copy (`to_vec_f64`,
/// `to_owned_f32`) before modifying values:
///
/// ```compile_fail
/// use slice_cache::Raster;
///
/// let raster = std::sync::Arc::new(Raster::from_f32(1, 2, vec![1.0, 2.0]).unwrap());
/// raster.as_f32().unwrap()[0] = 5.0;
/// ```
pub struct Raster {
    rows: usize,
    cols: usize,
    dtype: DType,
    buffer: Buffer,
}

impl Raster {
    /// Create a single-precision raster.
    pub fn from_f32(rows: usize, cols: usize, values: Vec<f32>) -> Result<Self, RasterError> {
        check_len(rows, cols, values.len())?;
        Ok(Self {
            rows,
            cols,
            dtype: DType::F32,
            buffer: Buffer::F32(values),
        })
    }

    /// Create a double-precision raster.
    pub fn from_f64(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, RasterError> {
        check_len(rows, cols, values.len())?;
        Ok(Self {
            rows,
            cols,
            dtype: DType::F64,
            buffer: Buffer::F64(values),
        })
    }

    /// Wrap a mapped payload. The caller has checked length, alignment and
    /// host endianness.
    pub(crate) fn from_mapped(rows: usize, cols: usize, dtype: DType, map: Mmap, offset: usize) -> Self {
        Self {
            rows,
            cols,
            dtype,
            buffer: Buffer::Mapped { map, offset },
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload size in bytes.
    pub fn nbytes(&self) -> usize {
        self.len() * self.dtype.size()
    }

    /// Whether the values are served from a memory-mapped cache file.
    pub fn is_memory_mapped(&self) -> bool {
        matches!(self.buffer, Buffer::Mapped { .. })
    }

    /// Raw payload in host byte order.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.buffer {
            Buffer::F32(values) => bytemuck::cast_slice(values),
            Buffer::F64(values) => bytemuck::cast_slice(values),
            Buffer::Mapped { map, offset } => &map[*offset..*offset + self.nbytes()],
        }
    }

    /// Values, if the element type is `f32`.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match (&self.buffer, self.dtype) {
            (Buffer::F32(values), _) => Some(values.as_slice()),
            (Buffer::Mapped { .. }, DType::F32) => bytemuck::try_cast_slice(self.as_bytes()).ok(),
            _ => None,
        }
    }

    /// Values, if the element type is `f64`.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match (&self.buffer, self.dtype) {
            (Buffer::F64(values), _) => Some(values.as_slice()),
            (Buffer::Mapped { .. }, DType::F64) => bytemuck::try_cast_slice(self.as_bytes()).ok(),
            _ => None,
        }
    }

    /// Value at `(row, col)`, widened to `f64`.
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let idx = row * self.cols + col;
        match self.dtype {
            DType::F32 => self.as_f32().and_then(|v| v.get(idx)).map(|v| *v as f64),
            DType::F64 => self.as_f64().and_then(|v| v.get(idx)).copied(),
        }
    }

    /// Owned copy of the values, widened to `f64`.
    pub fn to_vec_f64(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each_value(|v| out.push(v));
        out
    }

    /// Owned copy of the values, narrowed to `f32` when needed.
    pub fn to_owned_f32(&self) -> Vec<f32> {
        match self.as_f32() {
            Some(values) => values.to_vec(),
            None => self.to_vec_f64().into_iter().map(|v| v as f32).collect(),
        }
    }

    /// Summary of missing-data markers and the finite values.
    pub fn nan_statistics(&self) -> NanStatistics {
        let mut valid_count = 0usize;
        let mut nan_count = 0usize;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;

        self.for_each_value(|v| {
            if v.is_nan() {
                nan_count += 1;
            } else if v.is_finite() {
                valid_count += 1;
                sum += v;
                sum_sq += v * v;
            }
        });

        let (mean, std) = if valid_count == 0 {
            (f64::NAN, f64::NAN)
        } else {
            let n = valid_count as f64;
            let mean = sum / n;
            let variance = (sum_sq / n - mean * mean).max(0.0);
            (mean, variance.sqrt())
        };

        NanStatistics {
            valid_count,
            nan_count,
            mean,
            std,
        }
    }

    fn for_each_value(&self, mut f: impl FnMut(f64)) {
        if let Some(values) = self.as_f32() {
            values.iter().for_each(|v| f(*v as f64));
        } else if let Some(values) = self.as_f64() {
            values.iter().for_each(|v| f(*v));
        }
    }
}

impl PartialEq for Raster {
    /// Bit-level equality of shape, type and payload.
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.dtype == other.dtype && self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("shape", &self.shape())
            .field("dtype", &self.dtype)
            .field("memory_mapped", &self.is_memory_mapped())
            .finish()
    }
}

/// Missing-data summary of a raster.
///
/// `mean` and `std` are computed over finite values only and are NaN when
/// there are none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NanStatistics {
    pub valid_count: usize,
    pub nan_count: usize,
    pub mean: f64,
    pub std: f64,
}

fn check_len(rows: usize, cols: usize, actual: usize) -> Result<(), RasterError> {
    match rows.checked_mul(cols) {
        Some(expected) if expected == actual => Ok(()),
        expected => Err(RasterError {
            rows,
            cols,
            expected: expected.unwrap_or(usize::MAX),
            actual,
        }),
    }
}
