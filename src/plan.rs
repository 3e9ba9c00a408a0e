//! Plan extraction: reads every `good_lp` variable's solved value and
//! assembles the per-slot, human/machine-readable output structure.
//!
//! Field-by-field analogous to the host's `domain::schedule::Schedule`,
//! which likewise carries both per-slot values and a running cost; this
//! planner additionally exposes the raw grid/PV/EV/battery breakdown each
//! slot so a consumer never has to re-derive it from the schedule alone.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Horizon, Plant};
use crate::inputs::AlignedInputs;
use crate::milp::{MilpModel, SolveOutcome};

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSlot {
    pub index: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_s: i64,

    pub grid_import_kw: f64,
    pub grid_export_kw: f64,
    pub grid_import_violation_kw: f64,
    /// Net grid flow, positive importing: `grid_import_kw - grid_export_kw`.
    pub grid_kw: f64,
    pub import_allowed: bool,

    pub load_kw: f64,
    /// `load_kw` plus every EV's charge power, the total the grid/PV/battery
    /// side of the balance actually has to cover.
    pub load_total_kw: f64,

    pub price_import: f64,
    pub price_export: f64,
    /// Grid-only cost for this slot, excluding penalty and incentive terms.
    pub segment_cost: f64,
    pub cumulative_cost: f64,

    pub pv_kw: f64,
    pub pv_inverters: HashMap<String, f64>,
    pub inverter_ac_net_kw: HashMap<String, f64>,
    pub curtail_inverters: HashMap<String, u8>,
    pub curtail_any: bool,

    pub battery_charge_kw: f64,
    pub battery_discharge_kw: f64,
    pub battery_soc_kwh: HashMap<String, f64>,

    pub ev_charge_kw: f64,
    pub ev_soc_kwh: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub generated_at: DateTime<Utc>,
    pub status: String,
    pub objective: f64,
    pub grid_import_cap_kw: f64,
    pub grid_export_cap_kw: f64,
    pub slots: Vec<PlanSlot>,
}

pub fn extract(
    horizon: &Horizon,
    plant: &Plant,
    inputs: &AlignedInputs,
    model: &MilpModel,
    outcome: &SolveOutcome,
) -> Plan {
    let values = outcome.values.as_ref();
    let n = horizon.len();
    let mut slots = Vec::with_capacity(n);
    let mut cumulative_cost = 0.0;

    for t in 0..n {
        let slot = &horizon.slots[t];
        let dt = model.dt_h[t];

        let grid_import_kw = values.value(model.grid.p_imp[t]);
        let grid_export_kw = values.value(model.grid.p_exp[t]);
        let grid_import_violation_kw = values.value(model.grid.v_imp[t]);

        let price_import = inputs.price_import[t];
        let price_export = plant.grid.biased_export_price(inputs.price_export[t]);
        let segment_cost = (price_import * grid_import_kw - price_export * grid_export_kw) * dt;
        cumulative_cost += segment_cost;

        let mut pv_kw = 0.0;
        let mut pv_inverters = HashMap::with_capacity(model.inverters.len());
        let mut inverter_ac_net_kw = HashMap::with_capacity(model.inverters.len());
        let mut curtail_inverters = HashMap::with_capacity(model.inverters.len());
        let mut curtail_any = false;
        let mut battery_charge_kw = 0.0;
        let mut battery_discharge_kw = 0.0;
        let mut battery_soc_kwh = HashMap::new();

        for inv in &model.inverters {
            let pv = values.value(inv.p_pv[t]);
            pv_kw += pv;
            pv_inverters.insert(inv.id.clone(), round3(pv));
            inverter_ac_net_kw.insert(inv.id.clone(), round3(values.value(inv.p_acnet[t])));

            let curtailed = match &inv.curt {
                Some(c) => values.value(c[t]) > 0.5,
                None => false,
            };
            curtail_any |= curtailed;
            curtail_inverters.insert(inv.id.clone(), if curtailed { 1 } else { 0 });

            if let Some(b) = &inv.battery {
                let charge = values.value(b.p_bc[t]);
                let discharge = values.value(b.p_bd[t]);
                battery_charge_kw += charge;
                battery_discharge_kw += discharge;
                battery_soc_kwh.insert(inv.id.clone(), round3(values.value(b.e_b[t])));
            }
        }

        let mut ev_charge_kw = 0.0;
        let mut ev_soc_kwh = HashMap::new();
        for ev in &model.evs {
            let power = values.value(ev.p_ev[t]);
            ev_charge_kw += power;
            ev_soc_kwh.insert(ev.id.clone(), round3(values.value(ev.e_ev[t])));
        }

        slots.push(PlanSlot {
            index: t,
            start: slot.start,
            end: slot.end,
            duration_s: (slot.end - slot.start).num_seconds(),

            grid_import_kw: round3(grid_import_kw),
            grid_export_kw: round3(grid_export_kw),
            grid_import_violation_kw: round3(grid_import_violation_kw),
            grid_kw: round3(grid_import_kw - grid_export_kw),
            import_allowed: model.grid.allow_imp[t],

            load_kw: round3(inputs.load_kw[t]),
            load_total_kw: round3(inputs.load_kw[t] + ev_charge_kw),

            price_import: round3(price_import),
            price_export: round3(price_export),
            segment_cost: round3(segment_cost),
            cumulative_cost: round3(cumulative_cost),

            pv_kw: round3(pv_kw),
            pv_inverters,
            inverter_ac_net_kw,
            curtail_inverters,
            curtail_any,

            battery_charge_kw: round3(battery_charge_kw),
            battery_discharge_kw: round3(battery_discharge_kw),
            battery_soc_kwh,

            ev_charge_kw: round3(ev_charge_kw),
            ev_soc_kwh,
        });
    }

    Plan {
        generated_at: horizon.now,
        status: outcome.status.clone(),
        objective: round3(outcome.objective),
        grid_import_cap_kw: plant.grid.import_cap_kw,
        grid_export_cap_kw: plant.grid.export_cap_kw,
        slots,
    }
}
