//! Measures MILP-build time (variables + constraints, no solve) as a
//! function of horizon length and entity count.

use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ems_planner::config::EmsConfig;
use ems_planner::domain::battery::{Battery, TerminalSocMode};
use ems_planner::domain::ev_load::ControlledEvLoad;
use ems_planner::domain::grid::Grid;
use ems_planner::domain::horizon::{build_horizon, HorizonSpec};
use ems_planner::domain::inverter::{CurtailmentMode, Inverter};
use ems_planner::domain::plant::Plant;
use ems_planner::inputs::AlignedInputs;
use std::collections::HashMap;

fn plant_with(inverter_count: usize, ev_count: usize) -> Plant {
    let inverters = (0..inverter_count)
        .map(|i| Inverter {
            id: format!("inv{i}"),
            name: format!("Inverter {i}"),
            peak_power_kw: 5.0,
            curtailment_mode: CurtailmentMode::Binary,
            battery: Some(Battery {
                capacity_kwh: 10.0,
                storage_efficiency_pct: 95.0,
                min_soc_pct: 0.0,
                max_soc_pct: 100.0,
                reserve_soc_pct: 10.0,
                max_charge_kw: Some(5.0),
                max_discharge_kw: Some(5.0),
                charge_wear_cost_per_kwh: 0.01,
                discharge_wear_cost_per_kwh: 0.01,
                terminal_value_per_kwh: None,
                terminal_mode: TerminalSocMode::Hard,
                soc_now_pct: 50.0,
            }),
        })
        .collect();

    let ev_loads = (0..ev_count)
        .map(|i| ControlledEvLoad {
            id: format!("ev{i}"),
            min_power_kw: 1.4,
            max_power_kw: 7.4,
            capacity_kwh: 50.0,
            connected: true,
            power_now_kw: 2.0,
            soc_now_pct: 40.0,
            can_connect: false,
            allowed_connect_times: vec![],
            connect_grace_minutes: 0,
            soc_incentives: vec![],
            switch_penalty: None,
            deadline_target: None,
        })
        .collect();

    Plant {
        grid: Grid { import_cap_kw: 20.0, export_cap_kw: 20.0, import_forbidden_periods: vec![], price_bias_pct: None },
        inverters,
        ev_loads,
    }
}

fn bench_build(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let ems_config = EmsConfig {
        timestep_minutes: 60,
        high_res_timestep_minutes: None,
        high_res_horizon_minutes: None,
        min_horizon_minutes: 60,
        timezone: "UTC".into(),
        short_horizon_minutes: 240,
    };

    let mut group = c.benchmark_group("milp_build");
    for &slots in &[4usize, 24, 96] {
        for &entities in &[1usize, 4] {
            let spec = HorizonSpec {
                timestep_minutes: 60,
                high_res_timestep_minutes: None,
                high_res_horizon_minutes: None,
                min_horizon_minutes: (slots as u32) * 60,
                tz: chrono_tz::UTC,
            };
            let horizon = build_horizon(now, &spec, (slots as u32) * 60).unwrap();
            let plant = plant_with(entities, entities);

            let mut pv_kw = HashMap::new();
            for inv in &plant.inverters {
                pv_kw.insert(inv.id.clone(), vec![2.0; slots]);
            }
            let inputs = AlignedInputs {
                load_kw: vec![1.0; slots],
                price_import: vec![0.3; slots],
                price_export: vec![0.1; slots],
                pv_kw,
            };

            group.bench_with_input(
                BenchmarkId::new(format!("{entities}_entities"), slots),
                &slots,
                |b, _| {
                    b.iter(|| {
                        ems_planner::milp::build(&horizon, &plant, &inputs, now, chrono_tz::UTC, &ems_config)
                            .unwrap()
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
