//! Inverter plant entity: PV production and curtailment mode.
//!
//! Generalizes the host's `domain::inverter::InverterMode` tagged-enum
//! pattern to the three curtailment strategies this planner's MILP builder
//! needs to branch on (`milp::builder` reads this enum directly to decide
//! which curtailment constraint family to emit).

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::battery::Battery;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurtailmentMode {
    None,
    Binary,
    LoadAware,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Inverter {
    pub id: String,
    pub name: String,
    #[validate(range(min = 0.0))]
    pub peak_power_kw: f64,
    pub curtailment_mode: CurtailmentMode,
    #[validate(nested)]
    pub battery: Option<Battery>,
}
