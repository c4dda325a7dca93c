//! Canonical identity of a cached slice.

use std::fmt;

use chrono::NaiveDate;
use climate_common::{date_to_timestep, field_name, Resolution, ValidationResult};
use serde::{Deserialize, Serialize};

/// Cache key for one remote slice: (field, timestep, quality).
///
/// Keys are the sole identity used by both cache tiers. Fields are private
/// so a key cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FetchKey {
    field: String,
    timestep: i64,
    quality: i32,
}

impl FetchKey {
    pub fn new(field: impl Into<String>, timestep: i64, quality: i32) -> Self {
        Self {
            field: field.into(),
            timestep,
            quality,
        }
    }

    /// Derive the key for already-validated request parameters.
    pub fn for_slice(
        variable: &str,
        model: &str,
        scenario: &str,
        date: NaiveDate,
        resolution: Resolution,
    ) -> ValidationResult<Self> {
        Ok(Self::new(
            field_name(variable, model, scenario),
            date_to_timestep(date)?,
            resolution.quality(),
        ))
    }

    /// Source field name (variable + model + scenario + ensemble run).
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Day index since the dataset epoch.
    pub fn timestep(&self) -> i64 {
        self.timestep
    }

    /// Source quality level; lower is coarser.
    pub fn quality(&self) -> i32 {
        self.quality
    }
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.field, self.timestep, self.quality)
    }
}
