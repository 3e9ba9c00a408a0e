//! Builds the complete mixed-integer linear program.
//!
//! One variable group per plant subsystem (grid, inverters, batteries,
//! controlled EVs), generalizing the host's single-battery
//! `MilpOptimizer::solve_lp` (`optimizer/strategies/milp.rs`) — same
//! `good_lp` variable/constraint idiom (`problem.add_vector`,
//! `constraint!`), extended with a grid import/export selector, per-inverter
//! PV curtailment, multiple batteries, and EV charge scheduling, none of
//! which the host's 24h single-battery formulation needed.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use good_lp::{
    constraint, variable, Constraint, Expression, IntoAffineExpression, ProblemVariables, Variable,
};

use crate::config::EmsConfig;
use crate::domain::battery::TerminalSocMode;
use crate::domain::inverter::CurtailmentMode;
use crate::domain::{Horizon, Plant};
use crate::error::PlannerError;
use crate::inputs::AlignedInputs;

/// Anchor-drop threshold from the design: below this realtime EV power, the
/// slot-0 anchor term is skipped entirely rather than clamped to zero.
const EV_ANCHOR_DROP_KW: f64 = 0.1;

/// Reserve-SoC export gate is skipped (no `y_res` variables or constraints)
/// when the reserve floor is negligible, since the gate would otherwise
/// always be trivially satisfied.
const RESERVE_NEGLIGIBLE_KWH: f64 = 1e-9;

pub struct GridVars {
    pub p_imp: Vec<Variable>,
    pub p_exp: Vec<Variable>,
    pub on_imp: Vec<Variable>,
    pub v_imp: Vec<Variable>,
    pub allow_imp: Vec<bool>,
}

pub struct BatteryVars {
    pub p_bc: Vec<Variable>,
    pub p_bd: Vec<Variable>,
    /// Slot-boundary-indexed energy, length `N + 1`.
    pub e_b: Vec<Variable>,
    pub m_b: Vec<Variable>,
    /// Empty when the reserve floor is negligible (gate skipped).
    pub y_res: Vec<Variable>,
    pub terminal_slack: Option<Variable>,
    pub terminal_target_kwh: f64,
}

pub struct InverterVars {
    pub id: String,
    pub p_pv: Vec<Variable>,
    pub p_acnet: Vec<Variable>,
    pub curt: Option<Vec<Variable>>,
    pub battery: Option<BatteryVars>,
}

pub struct EvVars {
    pub id: String,
    pub p_ev: Vec<Variable>,
    /// Slot-boundary-indexed energy, length `N + 1`.
    pub e_ev: Vec<Variable>,
    /// Ramp magnitude between consecutive slots, length `N - 1`.
    pub r_ev: Vec<Variable>,
    pub a_ev: Variable,
    /// Piecewise incentive segments in band order, each paired with its
    /// reward per kWh.
    pub segments: Vec<(Variable, f64)>,
    pub on_ev: Option<Vec<Variable>>,
    pub anchor_active: bool,
}

pub struct MilpModel {
    pub grid: GridVars,
    pub inverters: Vec<InverterVars>,
    pub evs: Vec<EvVars>,
    pub dt_h: Vec<f64>,
}

pub fn build(
    horizon: &Horizon,
    plant: &Plant,
    inputs: &AlignedInputs,
    now: DateTime<Utc>,
    tz: Tz,
    ems_config: &EmsConfig,
) -> Result<(ProblemVariables, MilpModel, Vec<Constraint>), PlannerError> {
    let n = horizon.len();
    let dt_h: Vec<f64> = horizon.slots.iter().map(|s| s.duration_h()).collect();
    let horizon_minutes = (horizon.end() - horizon.start()).num_seconds().max(0) as f64 / 60.0;

    let mut vars = ProblemVariables::new();
    let mut cons: Vec<Constraint> = Vec::new();

    // ---- Grid ----
    let p_imp = vars.add_vector(variable().min(0.0).max(plant.grid.import_cap_kw), n);
    let p_exp = vars.add_vector(variable().min(0.0).max(plant.grid.export_cap_kw), n);
    let on_imp = vars.add_vector(variable().binary(), n);
    let v_imp = vars.add_vector(variable().min(0.0), n);
    let allow_imp: Vec<bool> = horizon
        .slots
        .iter()
        .map(|slot| {
            !plant
                .grid
                .import_forbidden_periods
                .iter()
                .any(|w| w.contains(slot.start, tz))
        })
        .collect();

    for t in 0..n {
        cons.push(constraint!(p_imp[t] <= plant.grid.import_cap_kw * on_imp[t]));
        cons.push(constraint!(p_exp[t] <= plant.grid.export_cap_kw * (1.0 - on_imp[t])));
        let allow_f = if allow_imp[t] { 1.0 } else { 0.0 };
        cons.push(constraint!(
            p_imp[t] <= plant.grid.import_cap_kw * allow_f + v_imp[t]
        ));
    }

    let grid = GridVars { p_imp, p_exp, on_imp, v_imp, allow_imp };

    // ---- Inverters, batteries ----
    let mut inverter_vars = Vec::with_capacity(plant.inverters.len());
    for inv in &plant.inverters {
        let forecast = inputs.pv_kw.get(&inv.id).ok_or_else(|| {
            PlannerError::AlignmentCoverageError {
                slot_index: 0,
                entity_ref: format!("plant.inverters.{}.pv", inv.id),
            }
        })?;

        let p_pv = vars.add_vector(variable().min(0.0).max(inv.peak_power_kw), n);
        let p_acnet = vars.add_vector(variable(), n);
        let curt = match inv.curtailment_mode {
            CurtailmentMode::None => None,
            CurtailmentMode::Binary | CurtailmentMode::LoadAware => {
                Some(vars.add_vector(variable().binary(), n))
            }
        };

        for t in 0..n {
            match (&inv.curtailment_mode, &curt) {
                (CurtailmentMode::None, _) => {
                    cons.push(constraint!(p_pv[t] == forecast[t]));
                }
                (CurtailmentMode::Binary, Some(c)) => {
                    cons.push(constraint!(p_pv[t] == forecast[t] * (1.0 - c[t])));
                }
                (CurtailmentMode::LoadAware, Some(c)) => {
                    cons.push(constraint!(p_pv[t] <= forecast[t]));
                    cons.push(constraint!(p_pv[t] >= forecast[t] * (1.0 - c[t])));
                    cons.push(constraint!(
                        grid.p_exp[t] <= plant.grid.export_cap_kw * (1.0 - c[t])
                    ));
                }
                _ => unreachable!("curtailment mode without its binary"),
            }
        }

        let battery = match &inv.battery {
            Some(battery) => {
                let max_charge = battery.max_charge_kw.unwrap_or(inv.peak_power_kw);
                let max_discharge = battery.max_discharge_kw.unwrap_or(inv.peak_power_kw);
                let eta = battery.eta();

                let p_bc = vars.add_vector(variable().min(0.0).max(max_charge), n);
                let p_bd = vars.add_vector(variable().min(0.0).max(max_discharge), n);
                let e_b = vars.add_vector(
                    variable().min(battery.min_energy_kwh()).max(battery.max_energy_kwh()),
                    n + 1,
                );
                let m_b = vars.add_vector(variable().binary(), n);

                cons.push(constraint!(e_b[0] == battery.initial_energy_kwh()));
                for t in 0..n {
                    cons.push(constraint!(p_bc[t] <= max_charge * m_b[t]));
                    cons.push(constraint!(p_bd[t] <= max_discharge * (1.0 - m_b[t])));
                    cons.push(constraint!(
                        e_b[t + 1] == e_b[t] + (p_bc[t] * eta - p_bd[t] / eta) * dt_h[t]
                    ));
                }

                let reserve_energy = battery.reserve_energy_kwh();
                let y_res = if reserve_energy > RESERVE_NEGLIGIBLE_KWH {
                    let y = vars.add_vector(variable().binary(), n);
                    let big_m = battery.capacity_kwh + reserve_energy + 1.0;
                    for t in 0..n {
                        cons.push(constraint!(
                            reserve_energy - e_b[t] <= big_m * y[t]
                        ));
                        cons.push(constraint!(
                            grid.p_exp[t] <= plant.grid.export_cap_kw * (1.0 - y[t])
                        ));
                    }
                    y
                } else {
                    Vec::new()
                };

                let (terminal_slack, terminal_target_kwh) = match battery.terminal_mode {
                    TerminalSocMode::Hard => {
                        cons.push(constraint!(e_b[n] >= e_b[0]));
                        (None, battery.initial_energy_kwh())
                    }
                    TerminalSocMode::Soft => {
                        let target = battery.initial_energy_kwh();
                        let slack = vars.add(variable().min(0.0));
                        cons.push(constraint!(e_b[n] + slack >= target));
                        (Some(slack), target)
                    }
                    TerminalSocMode::Adaptive => {
                        let nominal = battery.initial_energy_kwh();
                        let frac = (horizon_minutes / ems_config.short_horizon_minutes as f64).min(1.0);
                        let target = reserve_energy + (nominal - reserve_energy) * frac;
                        let slack = vars.add(variable().min(0.0));
                        cons.push(constraint!(e_b[n] + slack >= target));
                        (Some(slack), target)
                    }
                };

                Some(BatteryVars { p_bc, p_bd, e_b, m_b, y_res, terminal_slack, terminal_target_kwh })
            }
            None => None,
        };

        for t in 0..n {
            let net: Expression = match &battery {
                Some(b) => p_pv[t] + b.p_bd[t] - b.p_bc[t],
                None => p_pv[t].into_expression(),
            };
            cons.push(Constraint::from(p_acnet[t].into_expression().eq(net)));
        }

        inverter_vars.push(InverterVars { id: inv.id.clone(), p_pv, p_acnet, curt, battery });
    }

    // ---- Controlled EVs ----
    let mut ev_vars = Vec::with_capacity(plant.ev_loads.len());
    for ev in &plant.ev_loads {
        let allowed: Vec<bool> = horizon
            .slots
            .iter()
            .map(|slot| ev.is_allowed(now, slot.start, tz))
            .collect();

        let p_ev = vars.add_vector(variable().min(0.0).max(ev.max_power_kw), n);
        let e_ev = vars.add_vector(variable().min(0.0).max(ev.capacity_kwh), n + 1);
        let r_ev = if n > 1 { vars.add_vector(variable().min(0.0), n - 1) } else { Vec::new() };
        let a_ev = vars.add(variable().min(0.0));

        let on_ev = if ev.min_power_kw > 0.0 {
            Some(vars.add_vector(variable().binary(), n))
        } else {
            None
        };

        for t in 0..n {
            let allow_f = if allowed[t] { 1.0 } else { 0.0 };
            match &on_ev {
                Some(on) => {
                    cons.push(constraint!(p_ev[t] >= ev.min_power_kw * on[t]));
                    cons.push(constraint!(p_ev[t] <= ev.max_power_kw * on[t]));
                    if !allowed[t] {
                        cons.push(constraint!(on[t] == 0.0));
                    }
                }
                None => {
                    cons.push(constraint!(p_ev[t] <= ev.max_power_kw * allow_f));
                }
            }
        }

        cons.push(constraint!(e_ev[0] == ev.soc_now_pct / 100.0 * ev.capacity_kwh));
        for t in 0..n {
            cons.push(constraint!(e_ev[t + 1] == e_ev[t] + p_ev[t] * dt_h[t]));
        }

        for (j, &ramp) in r_ev.iter().enumerate() {
            let t = j + 1;
            cons.push(constraint!(ramp >= p_ev[t] - p_ev[t - 1]));
            cons.push(constraint!(ramp >= p_ev[t - 1] - p_ev[t]));
        }

        let anchor_active = ev.power_now_kw >= EV_ANCHOR_DROP_KW;
        if anchor_active {
            cons.push(constraint!(a_ev >= p_ev[0] - ev.power_now_kw));
            cons.push(constraint!(a_ev >= ev.power_now_kw - p_ev[0]));
        }

        let bands = ev.band_widths_kwh();
        let mut segments = Vec::with_capacity(bands.len());
        let mut seg_sum = Expression::from(0.0);
        for (width, reward) in bands {
            let seg = vars.add(variable().min(0.0).max(width));
            seg_sum = seg_sum + seg;
            segments.push((seg, reward));
        }
        cons.push(Constraint::from(
            seg_sum.eq(e_ev[n].into_expression() - e_ev[0].into_expression()),
        ));

        ev_vars.push(EvVars { id: ev.id.clone(), p_ev, e_ev, r_ev, a_ev, segments, on_ev, anchor_active });
    }

    // ---- System AC balance ----
    for t in 0..n {
        let mut lhs = grid.p_imp[t].into_expression();
        for inv in &inverter_vars {
            lhs = lhs + inv.p_acnet[t];
        }
        let mut rhs = Expression::from(inputs.load_kw[t]) + grid.p_exp[t];
        for ev in &ev_vars {
            rhs = rhs + ev.p_ev[t];
        }
        cons.push(Constraint::from(lhs.eq(rhs)));
    }

    let model = MilpModel { grid, inverters: inverter_vars, evs: ev_vars, dt_h };
    Ok((vars, model, cons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ev_load::ControlledEvLoad;
    use crate::domain::grid::Grid;
    use crate::domain::inverter::Inverter;
    use crate::domain::plant::Plant;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn ems_config() -> EmsConfig {
        EmsConfig {
            timestep_minutes: 60,
            high_res_timestep_minutes: None,
            high_res_horizon_minutes: None,
            min_horizon_minutes: 60,
            timezone: "UTC".into(),
            short_horizon_minutes: 240,
        }
    }

    #[test]
    fn bare_grid_only_plant_has_no_inverter_or_ev_vars() {
        let now = utc(2024, 1, 1, 0, 0, 0);
        let horizon = Horizon {
            now,
            slots: vec![crate::domain::horizon::Slot {
                index: 0,
                start: now,
                end: now + chrono::Duration::hours(1),
            }],
        };
        let plant = Plant {
            grid: Grid {
                import_cap_kw: 10.0,
                export_cap_kw: 10.0,
                import_forbidden_periods: vec![],
                price_bias_pct: None,
            },
            inverters: vec![],
            ev_loads: vec![],
        };
        let inputs = AlignedInputs {
            load_kw: vec![1.0],
            price_import: vec![0.3],
            price_export: vec![0.1],
            pv_kw: HashMap::new(),
        };

        let (_, model, cons) =
            build(&horizon, &plant, &inputs, now, chrono_tz::UTC, &ems_config()).unwrap();
        assert_eq!(model.grid.p_imp.len(), 1);
        assert!(model.inverters.is_empty());
        assert!(model.evs.is_empty());
        // grid exclusivity (2) + forbidden-window slack (1) for the one slot,
        // plus the system balance equation.
        assert_eq!(cons.len(), 4);
    }

    #[test]
    fn missing_pv_forecast_for_configured_inverter_is_an_alignment_error() {
        let now = utc(2024, 1, 1, 0, 0, 0);
        let horizon = Horizon {
            now,
            slots: vec![crate::domain::horizon::Slot {
                index: 0,
                start: now,
                end: now + chrono::Duration::hours(1),
            }],
        };
        let plant = Plant {
            grid: Grid {
                import_cap_kw: 10.0,
                export_cap_kw: 10.0,
                import_forbidden_periods: vec![],
                price_bias_pct: None,
            },
            inverters: vec![Inverter {
                id: "roof".into(),
                name: "Roof".into(),
                peak_power_kw: 5.0,
                curtailment_mode: CurtailmentMode::None,
                battery: None,
            }],
            ev_loads: Vec::<ControlledEvLoad>::new(),
        };
        let inputs = AlignedInputs {
            load_kw: vec![1.0],
            price_import: vec![0.3],
            price_export: vec![0.1],
            pv_kw: HashMap::new(),
        };

        let err = build(&horizon, &plant, &inputs, now, chrono_tz::UTC, &ems_config())
            .err()
            .unwrap();
        assert!(matches!(err, PlannerError::AlignmentCoverageError { .. }));
    }
}
