//! Source resolver: the single trait boundary between the planner core and
//! everywhere realtime scalars and forecast intervals actually come from
//! (Home Assistant, fixtures, synthetic generators). Generalizes the
//! host's `Battery`/`EvCharger`/`Inverter` hardware traits — same shape
//! (a trait object behind `Arc`, swappable live-vs-simulated
//! implementations) applied to data sourcing instead of actuation.

pub mod fixture;
pub mod synthetic;

use crate::domain::forecast::ForecastInterval;
use crate::error::PlannerError;

/// Identifies what to resolve: an opaque string key interpreted by the
/// concrete resolver (a Home Assistant entity id, a fixture key, ...).
pub type EntityRef<'a> = &'a str;

pub trait SourceResolver: Send + Sync {
    /// Current sensor reading, normalized to kW / kWh / currency-per-kWh.
    fn resolve_scalar(&self, entity: EntityRef) -> Result<f64, PlannerError>;

    /// Non-empty, contiguous power forecast covering at least
    /// `min_horizon_minutes`.
    fn resolve_power_forecast(
        &self,
        entity: EntityRef,
        min_horizon_minutes: u32,
    ) -> Result<Vec<ForecastInterval>, PlannerError>;

    /// Non-empty, contiguous price forecast covering at least
    /// `min_horizon_minutes`.
    fn resolve_price_forecast(
        &self,
        entity: EntityRef,
        min_horizon_minutes: u32,
    ) -> Result<Vec<ForecastInterval>, PlannerError>;

    /// Historical-average synthesizer: averages the last `days` days of
    /// history, bucketed at `interval_minutes`, to produce `horizon_hours`
    /// of synthetic forecast.
    fn resolve_history_profile(
        &self,
        entity: EntityRef,
        days: u32,
        interval_minutes: u32,
        horizon_hours: u32,
    ) -> Result<Vec<ForecastInterval>, PlannerError>;
}

fn coverage_minutes(intervals: &[ForecastInterval]) -> u32 {
    match (intervals.first(), intervals.last()) {
        (Some(first), Some(last)) => {
            ((last.end - first.start).num_seconds().max(0) / 60) as u32
        }
        _ => 0,
    }
}

/// Shared guard used by every concrete resolver: forecasts must be
/// non-empty and cover at least `min_horizon_minutes`.
pub fn require_coverage(
    intervals: Vec<ForecastInterval>,
    min_horizon_minutes: u32,
) -> Result<Vec<ForecastInterval>, PlannerError> {
    let covered = coverage_minutes(&intervals);
    if intervals.is_empty() || covered < min_horizon_minutes {
        return Err(PlannerError::ForecastCoverageTooShort {
            shortest_minutes: covered,
            required_minutes: min_horizon_minutes,
        });
    }
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn coverage_rejects_too_short() {
        let intervals = vec![ForecastInterval {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap(),
            value: 1.0,
        }];
        let err = require_coverage(intervals, 60).unwrap_err();
        assert!(matches!(err, PlannerError::ForecastCoverageTooShort { .. }));
    }

    #[test]
    fn coverage_accepts_exact_minimum() {
        let intervals = vec![ForecastInterval {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
            value: 1.0,
        }];
        assert!(require_coverage(intervals, 60).is_ok());
    }
}
