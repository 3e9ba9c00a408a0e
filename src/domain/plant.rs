//! Top-level plant topology: everything the MILP builder needs about the
//! physical installation, read-only for the lifetime of a `plan()` call.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::ev_load::ControlledEvLoad;
use crate::domain::grid::Grid;
use crate::domain::inverter::Inverter;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Plant {
    #[validate(nested)]
    pub grid: Grid,
    #[validate(nested)]
    pub inverters: Vec<Inverter>,
    #[validate(nested)]
    pub ev_loads: Vec<ControlledEvLoad>,
}

impl Plant {
    pub fn batteries(&self) -> impl Iterator<Item = (&str, &crate::domain::battery::Battery)> {
        self.inverters
            .iter()
            .filter_map(|inv| inv.battery.as_ref().map(|b| (inv.id.as_str(), b)))
    }
}
