//! Forecast intervals and the time-weighted slot aligner.
//!
//! The host's `domain::forecast::PriceForecast`/`ConsumptionForecast` align
//! interval data onto arbitrary timestamps via linear point interpolation
//! (`interpolate_value`); this planner instead needs a strict time-weighted
//! *average over a slot*, so the aligner below is a new implementation in
//! the same spirit (typed interval structs, a small generic helper) rather
//! than a reuse of that interpolation.

use chrono::{DateTime, Utc};

use crate::domain::horizon::Horizon;
use crate::domain::time::Interval;
use crate::error::PlannerError;

/// One forecast interval: a contiguous time span carrying a single scalar
/// (price in currency/kWh, or power in kW).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub value: f64,
}

impl ForecastInterval {
    fn as_time_interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// Sub-minute gaps between adjacent intervals are tolerated.
const GAP_TOLERANCE_SECONDS: f64 = 60.0;

/// Projects `intervals` onto `horizon`'s slots via time-weighted averaging.
///
/// `first_slot_override`, when set, supplies slot 0's value whenever slot 0
/// is not covered by `intervals` (the MPC-anchoring convention: slot 0 may
/// start before `now` and thus before the earliest forecast interval).
pub fn align_series(
    intervals: &[ForecastInterval],
    horizon: &Horizon,
    first_slot_override: Option<f64>,
    entity_ref: &str,
) -> Result<Vec<f64>, PlannerError> {
    let mut out = Vec::with_capacity(horizon.slots.len());

    for slot in &horizon.slots {
        let slot_interval = Interval::new(slot.start, slot.end);
        let slot_seconds = slot_interval.duration_hours() * 3600.0;

        let overlapping: Vec<&ForecastInterval> = intervals
            .iter()
            .filter(|iv| iv.as_time_interval().overlap_seconds(&slot_interval) > 0.0)
            .collect();

        let covered_seconds: f64 = overlapping
            .iter()
            .map(|iv| iv.as_time_interval().overlap_seconds(&slot_interval))
            .sum();

        let fully_covered = (slot_seconds - covered_seconds).abs() <= GAP_TOLERANCE_SECONDS
            || covered_seconds >= slot_seconds - GAP_TOLERANCE_SECONDS;

        if !overlapping.is_empty() && fully_covered {
            let weighted: f64 = overlapping
                .iter()
                .map(|iv| iv.value * iv.as_time_interval().overlap_seconds(&slot_interval))
                .sum();
            out.push(weighted / slot_seconds.max(f64::EPSILON));
        } else if slot.index == 0 {
            if let Some(value) = first_slot_override {
                out.push(value);
            } else {
                return Err(PlannerError::AlignmentCoverageError {
                    slot_index: slot.index,
                    entity_ref: entity_ref.to_string(),
                });
            }
        } else {
            return Err(PlannerError::AlignmentCoverageError {
                slot_index: slot.index,
                entity_ref: entity_ref.to_string(),
            });
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::horizon::{build_horizon, HorizonSpec};
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn flat_horizon(now: DateTime<Utc>, slots: u32, timestep: u32) -> Horizon {
        let spec = HorizonSpec {
            timestep_minutes: timestep,
            high_res_timestep_minutes: None,
            high_res_horizon_minutes: None,
            min_horizon_minutes: slots * timestep,
            tz: chrono_tz::UTC,
        };
        build_horizon(now, &spec, slots * timestep).unwrap()
    }

    #[test]
    fn full_coverage_gives_exact_mean() {
        let now = utc(2024, 1, 1, 0, 0, 0);
        let horizon = flat_horizon(now, 2, 60);
        let intervals = vec![
            ForecastInterval { start: utc(2024, 1, 1, 0, 0, 0), end: utc(2024, 1, 1, 1, 0, 0), value: 1.0 },
            ForecastInterval { start: utc(2024, 1, 1, 1, 0, 0), end: utc(2024, 1, 1, 2, 0, 0), value: 2.0 },
        ];
        let aligned = align_series(&intervals, &horizon, None, "load").unwrap();
        assert_eq!(aligned, vec![1.0, 2.0]);
    }

    #[test]
    fn time_weighted_mean_across_split_intervals() {
        let now = utc(2024, 1, 1, 0, 0, 0);
        let horizon = flat_horizon(now, 1, 60);
        let intervals = vec![
            ForecastInterval { start: utc(2024, 1, 1, 0, 0, 0), end: utc(2024, 1, 1, 0, 30, 0), value: 0.0 },
            ForecastInterval { start: utc(2024, 1, 1, 0, 30, 0), end: utc(2024, 1, 1, 1, 0, 0), value: 4.0 },
        ];
        let aligned = align_series(&intervals, &horizon, None, "price").unwrap();
        assert_eq!(aligned, vec![2.0]);
    }

    #[test]
    fn slot_zero_override_used_when_forecast_starts_late() {
        let now = utc(2024, 1, 1, 0, 3, 0);
        let horizon = flat_horizon(now, 1, 60);
        // Forecast only covers from now+ a bit later than slot 0's floor start.
        let intervals = vec![ForecastInterval {
            start: utc(2024, 1, 1, 1, 0, 0),
            end: utc(2024, 1, 1, 2, 0, 0),
            value: 9.0,
        }];
        let aligned = align_series(&intervals, &horizon, Some(5.0), "price").unwrap();
        assert_eq!(aligned, vec![5.0]);
    }

    #[test]
    fn missing_coverage_without_override_fails() {
        let now = utc(2024, 1, 1, 0, 0, 0);
        let horizon = flat_horizon(now, 1, 60);
        let err = align_series(&[], &horizon, None, "price").unwrap_err();
        assert!(matches!(err, PlannerError::AlignmentCoverageError { slot_index: 0, .. }));
    }

    #[test]
    fn sub_minute_gap_is_tolerated() {
        let now = utc(2024, 1, 1, 0, 0, 0);
        let horizon = flat_horizon(now, 1, 60);
        let intervals = vec![
            ForecastInterval { start: utc(2024, 1, 1, 0, 0, 0), end: utc(2024, 1, 1, 0, 29, 50), value: 1.0 },
            ForecastInterval { start: utc(2024, 1, 1, 0, 30, 0), end: utc(2024, 1, 1, 1, 0, 0), value: 1.0 },
        ];
        let aligned = align_series(&intervals, &horizon, None, "price").unwrap();
        assert_eq!(aligned, vec![1.0]);
    }
}
