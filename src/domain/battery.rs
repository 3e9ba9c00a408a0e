//! Battery plant entity.
//!
//! Capacity/SoC-bound/wear-cost fields follow the host's
//! `domain::battery::BatteryState` shape; the async hardware trait and
//! `SimulatedBattery`/`MockBattery` drivers are dropped since this planner
//! only ever reasons about a battery's *configuration*, never commands one
//! directly (actuation is explicitly out of scope).

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminalSocMode {
    Hard,
    Soft,
    Adaptive,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_battery"))]
pub struct Battery {
    #[validate(range(min = 0.0))]
    pub capacity_kwh: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub storage_efficiency_pct: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_soc_pct: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub max_soc_pct: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub reserve_soc_pct: f64,
    pub max_charge_kw: Option<f64>,
    pub max_discharge_kw: Option<f64>,
    #[serde(default)]
    pub charge_wear_cost_per_kwh: f64,
    #[serde(default)]
    pub discharge_wear_cost_per_kwh: f64,
    pub terminal_value_per_kwh: Option<f64>,
    #[serde(default = "default_terminal_mode")]
    pub terminal_mode: TerminalSocMode,
    /// Realtime state of charge, percent. Supplied by the resolver, not
    /// part of the static config in practice, but kept here so a battery
    /// can be fully described by one struct in fixtures and tests.
    pub soc_now_pct: f64,
}

fn default_terminal_mode() -> TerminalSocMode {
    TerminalSocMode::Hard
}

fn validate_battery(battery: &Battery) -> Result<(), validator::ValidationError> {
    if battery.min_soc_pct > battery.max_soc_pct {
        return Err(validator::ValidationError::new("min_soc_pct_exceeds_max_soc_pct"));
    }
    if battery.reserve_soc_pct > battery.max_soc_pct {
        return Err(validator::ValidationError::new("reserve_soc_pct_exceeds_max_soc_pct"));
    }
    Ok(())
}

impl Battery {
    /// Round-trip-symmetric efficiency factor: `sqrt(storage_efficiency_pct / 100)`.
    ///
    /// Resolves the design's Open Question on the battery efficiency split
    /// by applying `eta` to both charge (multiplied) and discharge
    /// (divided), so a full charge-then-discharge cycle loses exactly
    /// `1 - storage_efficiency_pct / 100` regardless of which side of the
    /// cycle the energy enters or leaves on.
    pub fn eta(&self) -> f64 {
        (self.storage_efficiency_pct / 100.0).sqrt()
    }

    pub fn min_energy_kwh(&self) -> f64 {
        self.min_soc_pct / 100.0 * self.capacity_kwh
    }

    pub fn max_energy_kwh(&self) -> f64 {
        self.max_soc_pct / 100.0 * self.capacity_kwh
    }

    pub fn reserve_energy_kwh(&self) -> f64 {
        self.reserve_soc_pct / 100.0 * self.capacity_kwh
    }

    pub fn initial_energy_kwh(&self) -> f64 {
        self.soc_now_pct / 100.0 * self.capacity_kwh
    }
}
