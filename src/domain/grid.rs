//! Grid connection plant entity.
//!
//! Grounded in `domain::grid::GridLimits`/`GridTariff` from the host: the
//! fixed-fuse-rating cap pattern and the local-time-window gating survive
//! here, generalized from Swedish peak-hour tariff rules to arbitrary
//! configured import-forbidden windows.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::time::LocalTimeWindow;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Grid {
    #[validate(range(min = 0.0))]
    pub import_cap_kw: f64,
    #[validate(range(min = 0.0))]
    pub export_cap_kw: f64,
    #[serde(default)]
    pub import_forbidden_periods: Vec<LocalTimeWindow>,
    /// Percentage bias applied to export price (e.g. -5.0 discounts export
    /// revenue by 5% to express reluctance to feed the grid).
    #[serde(default)]
    pub price_bias_pct: Option<f64>,
}

impl Grid {
    /// `export_price * (1 + price_bias_pct / 100)`, or the unbiased price
    /// when no bias is configured.
    pub fn biased_export_price(&self, export_price: f64) -> f64 {
        match self.price_bias_pct {
            Some(bias) => export_price * (1.0 + bias / 100.0),
            None => export_price,
        }
    }
}
