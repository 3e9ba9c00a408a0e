//! Structured error taxonomy for the planner core.
//!
//! Mirrors the host's split of `thiserror` for typed, matchable library
//! errors and `anyhow` for opaque context at the binary boundary (see
//! `domain::battery::BatteryError` / `domain::ev_load::EvLoadError` for the
//! per-subsystem precedent this generalizes).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("configuration invalid: {violations:?}")]
    ConfigInvalid { violations: Vec<String> },

    #[error("shortest forecast covers only {shortest_minutes} minutes, need at least {required_minutes}")]
    ForecastCoverageTooShort {
        shortest_minutes: u32,
        required_minutes: u32,
    },

    #[error("slot {slot_index} for '{entity_ref}' is not fully covered by forecast intervals")]
    AlignmentCoverageError {
        slot_index: usize,
        entity_ref: String,
    },

    #[error("solver proved the MILP infeasible")]
    SolverInfeasible,

    #[error("solver error: {status}")]
    SolverError { status: String },

    #[error("data source error: {0}")]
    DataSourceError(#[source] anyhow::Error),
}

impl PlannerError {
    pub fn kind(&self) -> &'static str {
        match self {
            PlannerError::ConfigInvalid { .. } => "ConfigInvalid",
            PlannerError::ForecastCoverageTooShort { .. } => "ForecastCoverageTooShort",
            PlannerError::AlignmentCoverageError { .. } => "AlignmentCoverageError",
            PlannerError::SolverInfeasible => "SolverInfeasible",
            PlannerError::SolverError { .. } => "SolverError",
            PlannerError::DataSourceError(_) => "DataSourceError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_taxonomy() {
        let err = PlannerError::ForecastCoverageTooShort {
            shortest_minutes: 30,
            required_minutes: 60,
        };
        assert_eq!(err.kind(), "ForecastCoverageTooShort");
    }

    #[test]
    fn config_invalid_carries_all_violations() {
        let err = PlannerError::ConfigInvalid {
            violations: vec!["min_soc_pct > max_soc_pct".to_string(), "negative capacity".to_string()],
        };
        match err {
            PlannerError::ConfigInvalid { violations } => assert_eq!(violations.len(), 2),
            _ => panic!("wrong variant"),
        }
    }
}
