//! Synthetic resolver: generates deterministic interval series from a
//! small declarative table, with no filesystem or network dependency.
//! Used by property tests and examples in place of a fixture tree.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::domain::forecast::ForecastInterval;
use crate::error::PlannerError;
use crate::resolver::{require_coverage, EntityRef, SourceResolver};

#[derive(Debug, Clone)]
pub struct SyntheticSeries {
    pub start: DateTime<Utc>,
    pub step_minutes: u32,
    pub values: Vec<f64>,
}

impl SyntheticSeries {
    /// A flat series of `count` slots of `step_minutes` at a constant value.
    pub fn flat(start: DateTime<Utc>, step_minutes: u32, count: usize, value: f64) -> Self {
        Self { start, step_minutes, values: vec![value; count] }
    }

    fn to_intervals(&self) -> Vec<ForecastInterval> {
        let mut out = Vec::with_capacity(self.values.len());
        let mut cursor = self.start;
        for &value in &self.values {
            let end = cursor + Duration::minutes(self.step_minutes as i64);
            out.push(ForecastInterval { start: cursor, end, value });
            cursor = end;
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticResolver {
    pub scalars: HashMap<String, f64>,
    pub power_series: HashMap<String, SyntheticSeries>,
    pub price_series: HashMap<String, SyntheticSeries>,
}

impl SyntheticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, entity: &str, value: f64) -> Self {
        self.scalars.insert(entity.to_string(), value);
        self
    }

    pub fn with_power_series(mut self, entity: &str, series: SyntheticSeries) -> Self {
        self.power_series.insert(entity.to_string(), series);
        self
    }

    pub fn with_price_series(mut self, entity: &str, series: SyntheticSeries) -> Self {
        self.price_series.insert(entity.to_string(), series);
        self
    }
}

impl SourceResolver for SyntheticResolver {
    fn resolve_scalar(&self, entity: EntityRef) -> Result<f64, PlannerError> {
        self.scalars.get(entity).copied().ok_or_else(|| {
            PlannerError::DataSourceError(anyhow::anyhow!("no synthetic scalar for '{entity}'"))
        })
    }

    fn resolve_power_forecast(
        &self,
        entity: EntityRef,
        min_horizon_minutes: u32,
    ) -> Result<Vec<ForecastInterval>, PlannerError> {
        let series = self.power_series.get(entity).ok_or_else(|| {
            PlannerError::DataSourceError(anyhow::anyhow!("no synthetic power series for '{entity}'"))
        })?;
        require_coverage(series.to_intervals(), min_horizon_minutes)
    }

    fn resolve_price_forecast(
        &self,
        entity: EntityRef,
        min_horizon_minutes: u32,
    ) -> Result<Vec<ForecastInterval>, PlannerError> {
        let series = self.price_series.get(entity).ok_or_else(|| {
            PlannerError::DataSourceError(anyhow::anyhow!("no synthetic price series for '{entity}'"))
        })?;
        require_coverage(series.to_intervals(), min_horizon_minutes)
    }

    fn resolve_history_profile(
        &self,
        entity: EntityRef,
        _days: u32,
        _interval_minutes: u32,
        horizon_hours: u32,
    ) -> Result<Vec<ForecastInterval>, PlannerError> {
        self.resolve_power_forecast(entity, horizon_hours * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn flat_series_resolves_to_constant_intervals() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let resolver = SyntheticResolver::new()
            .with_power_series("pv", SyntheticSeries::flat(start, 60, 4, 2.0));
        let intervals = resolver.resolve_power_forecast("pv", 120).unwrap();
        assert_eq!(intervals.len(), 4);
        assert!(intervals.iter().all(|iv| iv.value == 2.0));
    }

    #[test]
    fn missing_series_is_data_source_error() {
        let resolver = SyntheticResolver::new();
        let err = resolver.resolve_power_forecast("pv", 60).unwrap_err();
        assert!(matches!(err, PlannerError::DataSourceError(_)));
    }
}
