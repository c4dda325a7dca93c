//! What the NEX-GDDP-CMIP6 daily dataset contains.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Climate variables published by the dataset.
pub const VALID_VARIABLES: &[&str] = &[
    "hurs", "huss", "pr", "rlds", "rsds", "sfcWind", "tas", "tasmax", "tasmin",
];

/// CMIP6 models published by the dataset.
pub const VALID_MODELS: &[&str] = &[
    "ACCESS-CM2",
    "CanESM5",
    "CESM2",
    "CMCC-CM2-SR5",
    "EC-Earth3",
    "GFDL-ESM4",
    "INM-CM5-0",
    "IPSL-CM6A-LR",
    "MIROC6",
    "MPI-ESM1-2-HR",
    "MRI-ESM2-0",
];

/// Emission scenarios published by the dataset.
pub const VALID_SCENARIOS: &[&str] = &["historical", "ssp245", "ssp370", "ssp585"];

/// Ensemble member used by every model without an explicit override.
pub const DEFAULT_RUN_ID: &str = "r1i1p1f1";

/// Models whose published ensemble member differs from [`DEFAULT_RUN_ID`].
pub(crate) const MODEL_RUN_IDS: &[(&str, &str)] = &[("CESM2", "r4i1p1f1")];

/// First year served by the projection scenarios.
pub const SCENARIO_SWITCH_YEAR: i32 = 2015;

/// Scenario assumed for projection-era dates when the caller names none.
pub const DEFAULT_PROJECTION_SCENARIO: &str = "ssp585";

/// Spatial resolution level, mapped onto the source's quality parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// quality = -6, roughly 50 KB per slice.
    Low,
    /// quality = -2, roughly 200 KB per slice.
    #[default]
    Medium,
    /// quality = 0, full grid, roughly 3.5 MB per slice.
    High,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::Low, Resolution::Medium, Resolution::High];

    /// Quality level passed to the grid source (lower is coarser).
    pub fn quality(&self) -> i32 {
        match self {
            Resolution::Low => -6,
            Resolution::Medium => -2,
            Resolution::High => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Low => "low",
            Resolution::Medium => "medium",
            Resolution::High => "high",
        }
    }
}

impl FromStr for Resolution {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_parameter("resolution", s, &["low", "medium", "high"])
            })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive metadata for a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableInfo {
    pub name: &'static str,
    pub unit: &'static str,
    pub description: &'static str,
}

/// Descriptive metadata and valid year span for a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioInfo {
    pub period: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    pub start_year: i32,
    #[serde(skip)]
    pub end_year: i32,
}

/// Look up metadata for a variable.
pub fn variable_info(variable: &str) -> Option<VariableInfo> {
    let (name, unit, description) = match variable {
        "tas" => (
            "Daily Near-Surface Air Temperature",
            "K",
            "Daily mean temperature at 2 meters height",
        ),
        "tasmin" => (
            "Daily Minimum Near-Surface Air Temperature",
            "K",
            "Daily minimum temperature at 2 meters height",
        ),
        "tasmax" => (
            "Daily Maximum Near-Surface Air Temperature",
            "K",
            "Daily maximum temperature at 2 meters height",
        ),
        "pr" => (
            "Precipitation",
            "kg m-2 s-1",
            "Daily accumulated precipitation",
        ),
        "hurs" => (
            "Near-Surface Relative Humidity",
            "%",
            "Daily mean relative humidity at 2 meters height",
        ),
        "huss" => (
            "Near-Surface Specific Humidity",
            "%",
            "Daily mean specific humidity at 2 meters height",
        ),
        "rsds" => (
            "Surface Downwelling Shortwave Radiation",
            "W/m²",
            "Daily mean downwelling shortwave radiation at the surface",
        ),
        "rlds" => (
            "Surface Downwelling Longwave Radiation",
            "W/m²",
            "Daily mean downwelling longwave radiation at the surface",
        ),
        "sfcWind" => (
            "Daily-Mean Near-Surface Wind Speed",
            "m s-1",
            "Daily mean wind speed at 10 meters height",
        ),
        _ => return None,
    };
    Some(VariableInfo {
        name,
        unit,
        description,
    })
}

/// Look up metadata for a scenario.
pub fn scenario_info(scenario: &str) -> Option<ScenarioInfo> {
    let info = match scenario {
        "historical" => ScenarioInfo {
            period: "1950-2014",
            kind: "observation-based",
            description: "Historical simulations and observations",
            start_year: 1950,
            end_year: 2014,
        },
        "ssp245" => ScenarioInfo {
            period: "2015-2100",
            kind: "projection",
            description: "SSP 2-4.5 (moderate emissions)",
            start_year: 2015,
            end_year: 2100,
        },
        "ssp370" => ScenarioInfo {
            period: "2015-2100",
            kind: "projection",
            description: "SSP 3-7.0 (medium-high emissions)",
            start_year: 2015,
            end_year: 2100,
        },
        "ssp585" => ScenarioInfo {
            period: "2015-2100",
            kind: "projection",
            description: "SSP 5-8.5 (high emissions)",
            start_year: 2015,
            end_year: 2100,
        },
        _ => return None,
    };
    Some(info)
}

/// Overall time coverage of the dataset.
#[derive(Debug, Clone, Serialize)]
pub struct TimeCoverage {
    pub start: &'static str,
    pub end: &'static str,
    pub historical_end: &'static str,
    pub projection_start: &'static str,
}

/// Everything a client needs to build valid requests.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogMetadata {
    pub variables: &'static [&'static str],
    pub models: &'static [&'static str],
    pub scenarios: &'static [&'static str],
    pub resolutions: Vec<Resolution>,
    pub variable_metadata: BTreeMap<&'static str, VariableInfo>,
    pub scenario_metadata: BTreeMap<&'static str, ScenarioInfo>,
    pub time_range: TimeCoverage,
}

/// Describe the catalogue.
pub fn available_metadata() -> CatalogMetadata {
    CatalogMetadata {
        variables: VALID_VARIABLES,
        models: VALID_MODELS,
        scenarios: VALID_SCENARIOS,
        resolutions: Resolution::ALL.to_vec(),
        variable_metadata: VALID_VARIABLES
            .iter()
            .filter_map(|v| variable_info(v).map(|info| (*v, info)))
            .collect(),
        scenario_metadata: VALID_SCENARIOS
            .iter()
            .filter_map(|s| scenario_info(s).map(|info| (*s, info)))
            .collect(),
        time_range: TimeCoverage {
            start: "1950-01-01",
            end: "2100-12-31",
            historical_end: "2014-12-31",
            projection_start: "2015-01-01",
        },
    }
}
