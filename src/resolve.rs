//! Resolves a [`crate::config`] plant/loads topology plus a
//! [`crate::resolver::SourceResolver`] into a fully realtime-populated
//! [`crate::domain::Plant`] and the raw (un-aligned) forecast interval
//! streams the aligner will project onto the horizon.
//!
//! This is the "Source resolver" collaborator from the design's data flow
//! (`Plant + EMS config → Source resolver → aligned forecasts + realtime
//! scalars`) made concrete: it is the one place config entity-ref strings
//! turn into numbers, mirroring how the host's `forecast::engine` pulls
//! raw series before `domain` ever sees them.

use std::collections::HashMap;

use validator::Validate;

use crate::config::{EmsConfig, LoadsConfig, PlantConfig};
use crate::domain::battery::{Battery, TerminalSocMode};
use crate::domain::ev_load::ControlledEvLoad;
use crate::domain::forecast::ForecastInterval;
use crate::domain::grid::Grid;
use crate::domain::inverter::Inverter;
use crate::domain::plant::Plant;
use crate::error::PlannerError;
use crate::resolver::SourceResolver;

#[derive(Debug, Clone)]
pub struct ResolvedInputs {
    pub plant: Plant,
    pub load_forecast: Vec<ForecastInterval>,
    pub load_override: Option<f64>,
    pub price_import_forecast: Vec<ForecastInterval>,
    pub price_import_override: Option<f64>,
    pub price_export_forecast: Vec<ForecastInterval>,
    pub price_export_override: Option<f64>,
    /// Keyed by inverter id.
    pub pv_forecast: HashMap<String, Vec<ForecastInterval>>,
    pub pv_override: HashMap<String, Option<f64>>,
    pub max_coverage_minutes: u32,
}

fn coverage_minutes(intervals: &[ForecastInterval]) -> u32 {
    match (intervals.first(), intervals.last()) {
        (Some(first), Some(last)) => ((last.end - first.start).num_seconds().max(0) / 60) as u32,
        _ => 0,
    }
}

fn resolve_optional_scalar(
    resolver: &dyn SourceResolver,
    entity: &Option<String>,
) -> Result<Option<f64>, PlannerError> {
    match entity {
        Some(e) => Ok(Some(resolver.resolve_scalar(e)?)),
        None => Ok(None),
    }
}

pub fn resolve(
    plant_cfg: &PlantConfig,
    loads_cfg: &LoadsConfig,
    ems_cfg: &EmsConfig,
    resolver: &dyn SourceResolver,
) -> Result<ResolvedInputs, PlannerError> {
    let min_minutes = ems_cfg.min_horizon_minutes;

    let grid = Grid {
        import_cap_kw: plant_cfg.grid.import_cap_kw,
        export_cap_kw: plant_cfg.grid.export_cap_kw,
        import_forbidden_periods: plant_cfg.grid.import_forbidden_periods.clone(),
        price_bias_pct: plant_cfg.grid.price_bias_pct,
    };

    let price_import_forecast = resolver
        .resolve_price_forecast(&plant_cfg.grid.import_price_forecast_entity, min_minutes)?;
    let price_export_forecast = resolver
        .resolve_price_forecast(&plant_cfg.grid.export_price_forecast_entity, min_minutes)?;
    let price_import_override =
        resolve_optional_scalar(resolver, &plant_cfg.grid.import_price_realtime_entity)?;
    let price_export_override =
        resolve_optional_scalar(resolver, &plant_cfg.grid.export_price_realtime_entity)?;

    let mut inverters = Vec::with_capacity(plant_cfg.inverters.len());
    let mut pv_forecast = HashMap::with_capacity(plant_cfg.inverters.len());
    let mut pv_override = HashMap::with_capacity(plant_cfg.inverters.len());
    let mut coverage_candidates = vec![
        coverage_minutes(&price_import_forecast),
        coverage_minutes(&price_export_forecast),
    ];

    for inv_cfg in &plant_cfg.inverters {
        let forecast = resolver.resolve_power_forecast(&inv_cfg.pv_forecast_entity, min_minutes)?;
        coverage_candidates.push(coverage_minutes(&forecast));
        let override_value = resolve_optional_scalar(resolver, &inv_cfg.pv_realtime_entity)?;

        let battery = match &inv_cfg.battery {
            Some(b) => Some(Battery {
                capacity_kwh: b.capacity_kwh,
                storage_efficiency_pct: b.storage_efficiency_pct,
                min_soc_pct: b.min_soc_pct,
                max_soc_pct: b.max_soc_pct,
                reserve_soc_pct: b.reserve_soc_pct,
                max_charge_kw: b.max_charge_kw,
                max_discharge_kw: b.max_discharge_kw,
                charge_wear_cost_per_kwh: b.charge_wear_cost_per_kwh,
                discharge_wear_cost_per_kwh: b.discharge_wear_cost_per_kwh,
                terminal_value_per_kwh: b.terminal_value_per_kwh,
                terminal_mode: b.terminal_mode,
                soc_now_pct: resolver.resolve_scalar(&b.soc_realtime_entity)?,
            }),
            None => None,
        };

        pv_forecast.insert(inv_cfg.id.clone(), forecast);
        pv_override.insert(inv_cfg.id.clone(), override_value);
        inverters.push(Inverter {
            id: inv_cfg.id.clone(),
            name: inv_cfg.name.clone(),
            peak_power_kw: inv_cfg.peak_power_kw,
            curtailment_mode: inv_cfg.curtailment_mode,
            battery,
        });
    }

    let load_forecast =
        resolver.resolve_power_forecast(&loads_cfg.base_load_forecast_entity, min_minutes)?;
    coverage_candidates.push(coverage_minutes(&load_forecast));
    let load_override = resolve_optional_scalar(resolver, &loads_cfg.base_load_realtime_entity)?;

    let mut ev_loads = Vec::with_capacity(loads_cfg.ev_loads.len());
    for ev_cfg in &loads_cfg.ev_loads {
        let connected = resolver.resolve_scalar(&ev_cfg.connected_entity)? > 0.5;
        let power_now_kw = resolver.resolve_scalar(&ev_cfg.power_realtime_entity)?;
        let soc_now_pct = resolver.resolve_scalar(&ev_cfg.soc_realtime_entity)?;
        ev_loads.push(ControlledEvLoad {
            id: ev_cfg.id.clone(),
            min_power_kw: ev_cfg.min_power_kw,
            max_power_kw: ev_cfg.max_power_kw,
            capacity_kwh: ev_cfg.capacity_kwh,
            connected,
            power_now_kw,
            soc_now_pct,
            can_connect: ev_cfg.can_connect,
            allowed_connect_times: ev_cfg.allowed_connect_times.clone(),
            connect_grace_minutes: ev_cfg.connect_grace_minutes,
            soc_incentives: ev_cfg.soc_incentives.clone(),
            switch_penalty: ev_cfg.switch_penalty,
            deadline_target: ev_cfg.deadline_target,
        });
    }

    let plant = Plant { grid, inverters, ev_loads };
    plant.validate().map_err(|e| PlannerError::ConfigInvalid {
        violations: e
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| errs.iter().map(move |err| format!("{field}: {err}")))
            .collect(),
    })?;

    let max_coverage_minutes = coverage_candidates.into_iter().min().unwrap_or(0);

    Ok(ResolvedInputs {
        plant,
        load_forecast,
        load_override,
        price_import_forecast,
        price_import_override,
        price_export_forecast,
        price_export_override,
        pv_forecast,
        pv_override,
        max_coverage_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BatteryConfig, GridConfig, InverterConfig};
    use crate::domain::inverter::CurtailmentMode;
    use crate::resolver::synthetic::{SyntheticResolver, SyntheticSeries};
    use chrono::{TimeZone, Utc};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn ems() -> EmsConfig {
        EmsConfig {
            timestep_minutes: 60,
            high_res_timestep_minutes: None,
            high_res_horizon_minutes: None,
            min_horizon_minutes: 120,
            timezone: "UTC".into(),
            short_horizon_minutes: 240,
        }
    }

    #[test]
    fn resolves_plant_and_computes_shortest_coverage() {
        let start = utc(2024, 1, 1, 0, 0, 0);
        let resolver = SyntheticResolver::new()
            .with_price_series("price.import", SyntheticSeries::flat(start, 60, 4, 0.3))
            .with_price_series("price.export", SyntheticSeries::flat(start, 60, 4, 0.1))
            .with_power_series("pv.roof", SyntheticSeries::flat(start, 60, 2, 3.0))
            .with_power_series("load.base", SyntheticSeries::flat(start, 60, 4, 1.0))
            .with_scalar("battery.roof.soc", 50.0);

        let plant_cfg = PlantConfig {
            grid: GridConfig {
                import_cap_kw: 10.0,
                export_cap_kw: 10.0,
                import_price_forecast_entity: "price.import".into(),
                import_price_realtime_entity: None,
                export_price_forecast_entity: "price.export".into(),
                export_price_realtime_entity: None,
                import_forbidden_periods: vec![],
                price_bias_pct: None,
            },
            inverters: vec![InverterConfig {
                id: "roof".into(),
                name: "Roof".into(),
                peak_power_kw: 5.0,
                curtailment_mode: CurtailmentMode::None,
                pv_forecast_entity: "pv.roof".into(),
                pv_realtime_entity: None,
                battery: Some(BatteryConfig {
                    capacity_kwh: 10.0,
                    storage_efficiency_pct: 95.0,
                    min_soc_pct: 0.0,
                    max_soc_pct: 100.0,
                    reserve_soc_pct: 0.0,
                    max_charge_kw: Some(5.0),
                    max_discharge_kw: Some(5.0),
                    charge_wear_cost_per_kwh: 0.0,
                    discharge_wear_cost_per_kwh: 0.0,
                    terminal_value_per_kwh: None,
                    terminal_mode: TerminalSocMode::Hard,
                    soc_realtime_entity: "battery.roof.soc".into(),
                }),
            }],
        };
        let loads_cfg = LoadsConfig {
            base_load_forecast_entity: "load.base".into(),
            base_load_realtime_entity: None,
            ev_loads: vec![],
        };

        let resolved = resolve(&plant_cfg, &loads_cfg, &ems(), &resolver).unwrap();
        assert_eq!(resolved.plant.inverters.len(), 1);
        assert_eq!(resolved.plant.inverters[0].battery.as_ref().unwrap().soc_now_pct, 50.0);
        // pv.roof only covers 2 hours, shorter than price/load's 4.
        assert_eq!(resolved.max_coverage_minutes, 120);
    }
}
