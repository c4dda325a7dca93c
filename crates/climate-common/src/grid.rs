//! Global grid shape and pixel windows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Rows (latitude) of the full-resolution grid.
pub const GRID_HEIGHT: u32 = 600;

/// Columns (longitude) of the full-resolution grid.
pub const GRID_WIDTH: u32 = 1440;

/// Grid spacing in degrees.
pub const GRID_RESOLUTION_DEG: f64 = 0.25;

/// Inclusive pixel rectangle in the source's 2-D logic coordinates.
///
/// `x` runs along longitude columns, `y` along latitude rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicBox {
    pub x0: u32,
    pub x1: u32,
    pub y0: u32,
    pub y1: u32,
}

impl LogicBox {
    pub fn new(x0: u32, x1: u32, y0: u32, y1: u32) -> Self {
        Self { x0, x1, y0, y1 }
    }

    /// Check the window is ordered and lies inside the full grid.
    pub fn validate(self) -> ValidationResult<Self> {
        if !(self.x0 <= self.x1 && self.x1 < GRID_WIDTH) {
            return Err(ValidationError::InvalidWindow(format!(
                "Invalid x-bounds [{}, {}] for grid width {}",
                self.x0, self.x1, GRID_WIDTH
            )));
        }
        if !(self.y0 <= self.y1 && self.y1 < GRID_HEIGHT) {
            return Err(ValidationError::InvalidWindow(format!(
                "Invalid y-bounds [{}, {}] for grid height {}",
                self.y0, self.y1, GRID_HEIGHT
            )));
        }
        Ok(self)
    }

    /// Number of columns covered.
    pub fn width(&self) -> u32 {
        self.x1 - self.x0 + 1
    }

    /// Number of rows covered.
    pub fn height(&self) -> u32 {
        self.y1 - self.y0 + 1
    }

    /// Upper bounds as the source expects them (exclusive).
    pub fn end_exclusive(&self) -> (u32, u32) {
        (self.x1 + 1, self.y1 + 1)
    }

    /// Center pixel, rounded toward the origin.
    pub fn center(&self) -> (u32, u32) {
        ((self.x0 + self.x1) / 2, (self.y0 + self.y1) / 2)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.x0..=self.x1).contains(&x) && (self.y0..=self.y1).contains(&y)
    }
}

impl fmt::Display for LogicBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x0, self.x1, self.y0, self.y1)
    }
}
