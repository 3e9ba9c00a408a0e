//! Assembles the full objective expression from every `MilpModel` variable
//! group plus the aligned price series, generalizing the host's
//! `energy_cost + peak_power_penalty + battery_wear_cost` sum
//! (`optimizer/strategies/milp.rs`) to the larger preference-term family
//! this planner's objective covers (export preference, tie-breakers,
//! terminal value, EV incentives/ramp/anchor).

use good_lp::Expression;

use crate::domain::{Horizon, Plant};
use crate::inputs::AlignedInputs;
use crate::milp::builder::MilpModel;
use crate::milp::weights::ObjectiveWeights;

pub fn build_objective(
    model: &MilpModel,
    plant: &Plant,
    inputs: &AlignedInputs,
    horizon: &Horizon,
    weights: &ObjectiveWeights,
) -> Expression {
    let n = horizon.len();
    let mut objective = Expression::from(0.0);

    // 1. Energy cost, plus a tiny export preference when export is free.
    // 2. Forbidden-import penalty.
    // 3. Early-flow tie-breaker.
    for t in 0..n {
        let dt = model.dt_h[t];
        let price_import = inputs.price_import[t];
        let price_export = plant.grid.biased_export_price(inputs.price_export[t]);

        objective = objective + model.grid.p_imp[t] * (price_import * dt);
        objective = objective - model.grid.p_exp[t] * (price_export * dt);
        if price_export.abs() < f64::EPSILON {
            objective = objective - model.grid.p_exp[t] * weights.eps_exp;
        }

        objective = objective + model.grid.v_imp[t] * (weights.w_viol * dt);

        let tie_weight = weights.eps_tie / (t as f64 + 1.0);
        objective = objective - (model.grid.p_imp[t] + model.grid.p_exp[t]) * tie_weight;
    }

    // 4. Battery wear, 5. battery timing tie-breaker, 6. terminal SoC value.
    for (inv_vars, inv_cfg) in model.inverters.iter().zip(plant.inverters.iter()) {
        let (Some(b_vars), Some(b_cfg)) = (&inv_vars.battery, &inv_cfg.battery) else {
            continue;
        };
        for t in 0..n {
            let dt = model.dt_h[t];
            objective = objective
                + b_vars.p_bc[t] * (b_cfg.charge_wear_cost_per_kwh * dt)
                + b_vars.p_bd[t] * (b_cfg.discharge_wear_cost_per_kwh * dt);

            let bt_weight = weights.w_bt * (t as f64 + 1.0) * dt;
            objective = objective + (b_vars.p_bc[t] + b_vars.p_bd[t]) * bt_weight;
        }

        if let Some(v_term) = b_cfg.terminal_value_per_kwh {
            objective = objective - b_vars.e_b[n] * v_term;
        }
        if let Some(slack) = b_vars.terminal_slack {
            objective = objective + slack * weights.w_term_shortfall;
        }
    }

    // 7. EV incentives, 8. ramp, 9. slot-0 anchor.
    for ev in &model.evs {
        for &(seg, reward_per_kwh) in &ev.segments {
            objective = objective - seg * reward_per_kwh;
        }
        for &ramp in &ev.r_ev {
            objective = objective + ramp * weights.w_ramp;
        }
        objective = objective + ev.a_ev * weights.w_anchor;
    }

    objective
}
