//! Parameter validation and source field-name derivation.

use chrono::{Datelike, NaiveDate};
use tracing::warn;

use crate::catalog::{
    scenario_info, Resolution, DEFAULT_PROJECTION_SCENARIO, DEFAULT_RUN_ID, MODEL_RUN_IDS,
    SCENARIO_SWITCH_YEAR, VALID_MODELS, VALID_SCENARIOS, VALID_VARIABLES,
};
use crate::error::{ValidationError, ValidationResult};

pub fn validate_variable(variable: &str) -> ValidationResult<&str> {
    if VALID_VARIABLES.contains(&variable) {
        Ok(variable)
    } else {
        Err(ValidationError::invalid_parameter("variable", variable, VALID_VARIABLES))
    }
}

pub fn validate_model(model: &str) -> ValidationResult<&str> {
    if VALID_MODELS.contains(&model) {
        Ok(model)
    } else {
        Err(ValidationError::invalid_parameter("model", model, VALID_MODELS))
    }
}

pub fn validate_scenario(scenario: &str) -> ValidationResult<&str> {
    if VALID_SCENARIOS.contains(&scenario) {
        Ok(scenario)
    } else {
        Err(ValidationError::invalid_parameter("scenario", scenario, VALID_SCENARIOS))
    }
}

/// Check the date's year falls inside the scenario's published span.
pub fn validate_date_range(date: NaiveDate, scenario: &str) -> ValidationResult<()> {
    let info = scenario_info(scenario)
        .ok_or_else(|| ValidationError::invalid_parameter("scenario", scenario, VALID_SCENARIOS))?;

    if (info.start_year..=info.end_year).contains(&date.year()) {
        Ok(())
    } else {
        Err(ValidationError::DateOutOfRange {
            year: date.year(),
            scenario: scenario.to_string(),
            start_year: info.start_year,
            end_year: info.end_year,
        })
    }
}

/// Validate a complete slice request.
///
/// Resolution is already typed, so only the string parameters and the
/// date/scenario pairing need checking.
pub fn validate_all(
    variable: &str,
    model: &str,
    scenario: &str,
    date: NaiveDate,
    _resolution: Resolution,
) -> ValidationResult<()> {
    validate_variable(variable)?;
    validate_model(model)?;
    validate_scenario(scenario)?;
    validate_date_range(date, scenario)
}

/// Resolve the scenario for a date.
///
/// Dates before the switch year only exist in `historical`; naming another
/// scenario for them is an error. Later dates use the provided scenario or
/// fall back to the high-emissions projection.
pub fn infer_scenario(date: NaiveDate, provided: Option<&str>) -> ValidationResult<String> {
    if date.year() < SCENARIO_SWITCH_YEAR {
        return match provided {
            Some(scenario) if scenario != "historical" => {
                Err(ValidationError::ScenarioNotAvailable {
                    date,
                    scenario: scenario.to_string(),
                    switch_year: SCENARIO_SWITCH_YEAR,
                })
            }
            _ => Ok("historical".to_string()),
        };
    }

    match provided {
        Some(scenario) => Ok(scenario.to_string()),
        None => {
            warn!(
                year = date.year(),
                scenario = DEFAULT_PROJECTION_SCENARIO,
                "No scenario provided, using default projection scenario"
            );
            Ok(DEFAULT_PROJECTION_SCENARIO.to_string())
        }
    }
}

/// Ensemble member id published for a model.
pub fn run_id(model: &str) -> &'static str {
    MODEL_RUN_IDS
        .iter()
        .find(|(m, _)| *m == model)
        .map(|(_, run)| *run)
        .unwrap_or(DEFAULT_RUN_ID)
}

/// Source field name, e.g. `tas_day_ACCESS-CM2_historical_r1i1p1f1_gn`.
pub fn field_name(variable: &str, model: &str, scenario: &str) -> String {
    format!("{}_day_{}_{}_{}_gn", variable, model, scenario, run_id(model))
}
