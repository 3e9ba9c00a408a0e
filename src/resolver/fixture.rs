//! Fixture-replay resolver: reads a recorded `ems_fixture.json` tree so a
//! scenario can be replayed byte-for-byte without touching a live data
//! source. Backs the `record-scenario`/`refresh-baseline`/`scenario-report`
//! CLI subcommands and the roundtrip law in the design's testable
//! properties.

use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::forecast::ForecastInterval;
use crate::error::PlannerError;
use crate::resolver::{require_coverage, EntityRef, SourceResolver};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalDto {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub value: f64,
}

impl From<&IntervalDto> for ForecastInterval {
    fn from(dto: &IntervalDto) -> Self {
        ForecastInterval { start: dto.start, end: dto.end, value: dto.value }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureData {
    /// The planning instant this fixture was recorded at. Replaying the
    /// fixture through `now` (rather than a fresh `Utc::now()`) is what
    /// makes record -> report a byte-for-byte roundtrip: a fresh instant
    /// would shift `Plan::generated_at` and so the plan hash on every run.
    #[serde(default)]
    pub now: DateTime<Utc>,
    #[serde(default)]
    pub scalars: HashMap<String, f64>,
    #[serde(default)]
    pub power_forecasts: HashMap<String, Vec<IntervalDto>>,
    #[serde(default)]
    pub price_forecasts: HashMap<String, Vec<IntervalDto>>,
    #[serde(default)]
    pub history_profiles: HashMap<String, Vec<IntervalDto>>,
}

impl FixtureData {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture at {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing fixture at {}", path.display()))
    }

    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw).with_context(|| format!("writing fixture at {}", path.display()))
    }
}

pub struct FixtureResolver {
    data: FixtureData,
}

impl FixtureResolver {
    pub fn new(data: FixtureData) -> Self {
        Self { data }
    }

    fn lookup(
        map: &HashMap<String, Vec<IntervalDto>>,
        entity: EntityRef,
    ) -> Result<Vec<ForecastInterval>, PlannerError> {
        map.get(entity)
            .map(|series| series.iter().map(ForecastInterval::from).collect())
            .ok_or_else(|| {
                PlannerError::DataSourceError(anyhow::anyhow!(
                    "fixture has no series recorded for '{entity}'"
                ))
            })
    }
}

impl SourceResolver for FixtureResolver {
    fn resolve_scalar(&self, entity: EntityRef) -> Result<f64, PlannerError> {
        self.data.scalars.get(entity).copied().ok_or_else(|| {
            PlannerError::DataSourceError(anyhow::anyhow!(
                "fixture has no scalar recorded for '{entity}'"
            ))
        })
    }

    fn resolve_power_forecast(
        &self,
        entity: EntityRef,
        min_horizon_minutes: u32,
    ) -> Result<Vec<ForecastInterval>, PlannerError> {
        require_coverage(Self::lookup(&self.data.power_forecasts, entity)?, min_horizon_minutes)
    }

    fn resolve_price_forecast(
        &self,
        entity: EntityRef,
        min_horizon_minutes: u32,
    ) -> Result<Vec<ForecastInterval>, PlannerError> {
        require_coverage(Self::lookup(&self.data.price_forecasts, entity)?, min_horizon_minutes)
    }

    fn resolve_history_profile(
        &self,
        entity: EntityRef,
        _days: u32,
        _interval_minutes: u32,
        horizon_hours: u32,
    ) -> Result<Vec<ForecastInterval>, PlannerError> {
        require_coverage(Self::lookup(&self.data.history_profiles, entity)?, horizon_hours * 60)
    }
}
