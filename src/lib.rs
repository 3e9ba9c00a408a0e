//! Receding-horizon MILP planner core.
//!
//! [`plan`] is the single entry point: resolve → align → build → solve →
//! extract, wrapped in one tracing span per run, mirroring the host's
//! `Orchestrator::run_cycle` top-level shape (`controller/orchestrator.rs`)
//! applied to a synchronous, side-effect-free planning core instead of a
//! live hardware control loop.

pub mod config;
pub mod domain;
pub mod error;
pub mod inputs;
pub mod milp;
pub mod plan;
pub mod resolve;
pub mod resolver;
pub mod telemetry;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{EmsConfig, LoadsConfig, PlantConfig};
use crate::domain::horizon::{build_horizon, HorizonSpec};
use crate::error::PlannerError;
use crate::inputs::AlignedInputs;
use crate::plan::Plan;
use crate::resolver::SourceResolver;

pub use crate::plan::PlanSlot;

/// Runs one full receding-horizon planning cycle against `now`.
pub fn plan(
    ems_cfg: &EmsConfig,
    plant_cfg: &PlantConfig,
    loads_cfg: &LoadsConfig,
    weights: &milp::ObjectiveWeights,
    backend: milp::SolverBackend,
    now: DateTime<Utc>,
    resolver: &dyn SourceResolver,
) -> Result<Plan, PlannerError> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("plan", run_id = %run_id);
    let _guard = span.enter();

    let tz: chrono_tz::Tz = ems_cfg
        .timezone
        .parse()
        .map_err(|_| PlannerError::ConfigInvalid {
            violations: vec![format!("ems.timezone '{}' not recognized", ems_cfg.timezone)],
        })?;

    let resolved = resolve::resolve(plant_cfg, loads_cfg, ems_cfg, resolver)?;

    let horizon_spec = HorizonSpec {
        timestep_minutes: ems_cfg.timestep_minutes,
        high_res_timestep_minutes: ems_cfg.high_res_timestep_minutes,
        high_res_horizon_minutes: ems_cfg.high_res_horizon_minutes,
        min_horizon_minutes: ems_cfg.min_horizon_minutes,
        tz,
    };
    let horizon = build_horizon(now, &horizon_spec, resolved.max_coverage_minutes)?;

    tracing::info!(slot_count = horizon.len(), "horizon built");

    let aligned = AlignedInputs::align(&resolved, &horizon)?;

    let (vars, model, constraints) =
        milp::build(&horizon, &resolved.plant, &aligned, now, tz, ems_cfg)?;
    let objective = milp::build_objective(&model, &resolved.plant, &aligned, &horizon, weights);
    let outcome = milp::solve(vars, objective, constraints, backend)?;

    tracing::info!(status = %outcome.status, objective = outcome.objective, "plan solved");

    Ok(plan::extract(&horizon, &resolved.plant, &aligned, &model, &outcome))
}
