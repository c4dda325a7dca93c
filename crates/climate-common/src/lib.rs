//! Common types and utilities shared across the climate slice crates.
//!
//! - [`catalog`]: the variables, models, scenarios and resolutions the
//!   NEX-GDDP-CMIP6 dataset exposes, with their descriptive metadata
//! - [`time`]: calendar dates to day-resolution timestep indices and back
//! - [`validation`]: parameter checks and field-name derivation
//! - [`grid`]: the global grid shape and pixel windows ("logic boxes")

pub mod catalog;
pub mod error;
pub mod grid;
pub mod time;
pub mod validation;

pub use catalog::{
    available_metadata, scenario_info, variable_info, CatalogMetadata, Resolution, ScenarioInfo,
    VariableInfo, DEFAULT_RUN_ID, VALID_MODELS, VALID_SCENARIOS, VALID_VARIABLES,
};
pub use error::{ValidationError, ValidationResult};
pub use grid::{LogicBox, GRID_HEIGHT, GRID_RESOLUTION_DEG, GRID_WIDTH};
pub use time::{date_range, date_to_timestep, parse_date, timestep_to_date, EPOCH};
pub use validation::{field_name, infer_scenario, run_id, validate_all};
