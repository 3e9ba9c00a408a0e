//! Per-slot aligned series handed to the MILP builder: the output of
//! running every resolved forecast through [`crate::domain::forecast::align_series`].
//!
//! Kept as a distinct type from [`crate::resolve::ResolvedInputs`] (which
//! carries the raw, un-aligned interval streams) because the horizon isn't
//! known until the shortest raw coverage has been measured; alignment is
//! necessarily a second pass.

use std::collections::HashMap;

use crate::domain::forecast::align_series;
use crate::domain::Horizon;
use crate::error::PlannerError;
use crate::resolve::ResolvedInputs;

#[derive(Debug, Clone)]
pub struct AlignedInputs {
    pub load_kw: Vec<f64>,
    pub price_import: Vec<f64>,
    pub price_export: Vec<f64>,
    pub pv_kw: HashMap<String, Vec<f64>>,
}

impl AlignedInputs {
    pub fn align(resolved: &ResolvedInputs, horizon: &Horizon) -> Result<Self, PlannerError> {
        let load_kw = align_series(
            &resolved.load_forecast,
            horizon,
            resolved.load_override,
            "loads.base_load",
        )?;
        let price_import = align_series(
            &resolved.price_import_forecast,
            horizon,
            resolved.price_import_override,
            "plant.grid.import_price",
        )?;
        let price_export = align_series(
            &resolved.price_export_forecast,
            horizon,
            resolved.price_export_override,
            "plant.grid.export_price",
        )?;

        let mut pv_kw = HashMap::with_capacity(resolved.pv_forecast.len());
        for (inverter_id, intervals) in &resolved.pv_forecast {
            let override_value = resolved.pv_override.get(inverter_id).copied().flatten();
            let aligned = align_series(
                intervals,
                horizon,
                override_value,
                &format!("plant.inverters.{inverter_id}.pv"),
            )?;
            pv_kw.insert(inverter_id.clone(), aligned);
        }

        Ok(Self { load_kw, price_import, price_export, pv_kw })
    }
}
