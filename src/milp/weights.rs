//! Tunable objective-term weights, kept on one struct so they can be
//! adjusted without touching the constraint/objective structure.
//!
//! Grounded in the host's `Constraints` struct (`optimizer/constraints.rs`),
//! which plays the same role for the host's single-battery objective
//! (peak tariff weight, wear cost factor); generalized to the larger term
//! family this planner's objective needs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    /// Penalty per kWh of forbidden-window import slack. Large enough that
    /// the solver only uses the slack when every feasible alternative is
    /// worse, never as a cheap substitute for curtailing import.
    pub w_viol: f64,
    /// Tiny export preference applied only when the export price is
    /// exactly zero, so the solver prefers exporting surplus PV over
    /// curtailing it when money is indifferent either way.
    pub eps_exp: f64,
    /// Tie-breaker nudging grid flow earlier in the horizon when the
    /// economic objective is otherwise indifferent between orderings.
    pub eps_tie: f64,
    /// Tie-breaker nudging battery cycling later in the horizon, for the
    /// same reason.
    pub w_bt: f64,
    /// Per-kW EV charge ramp cost, discourages oscillating EV power.
    pub w_ramp: f64,
    /// Per-kW penalty on slot-0 EV power deviating from the realtime
    /// reading, discourages re-litigating a decision already in effect.
    pub w_anchor: f64,
    /// Per-kWh penalty on terminal SoC shortfall under soft/adaptive
    /// terminal modes. An order of magnitude below `w_viol` so it never
    /// competes with the forbidden-import penalty.
    pub w_term_shortfall: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            w_viol: 1_000.0,
            eps_exp: 1e-4,
            eps_tie: 1e-5,
            w_bt: 1e-6,
            w_ramp: 1e-3,
            w_anchor: 1e-3,
            w_term_shortfall: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_never_let_tiebreakers_dominate_economics() {
        let w = ObjectiveWeights::default();
        assert!(w.eps_tie < w.eps_exp);
        assert!(w.w_bt < w.eps_tie);
        assert!(w.w_term_shortfall < w.w_viol);
    }
}
