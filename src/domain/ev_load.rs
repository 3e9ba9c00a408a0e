//! Controlled EV load plant entity.
//!
//! Replaces the host's hardware-facing `EvCharger` trait and OCPP/CC-CV
//! simulation (out of scope: this planner only schedules power, it never
//! drives a charger) with the static topology the MILP builder needs:
//! connection gating, the {0} ∪ [min, max] power gap, and the piecewise
//! SoC-incentive schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::time::LocalTimeWindow;

/// One band of the piecewise SoC-incentive schedule: reaching `target_pct`
/// is worth `reward_per_kwh` for the energy stored up to that target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SocIncentive {
    pub target_pct: f64,
    pub reward_per_kwh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_ev_load"))]
pub struct ControlledEvLoad {
    pub id: String,
    #[validate(range(min = 0.0))]
    pub min_power_kw: f64,
    #[validate(range(min = 0.0))]
    pub max_power_kw: f64,
    #[validate(range(min = 0.0))]
    pub capacity_kwh: f64,
    pub connected: bool,
    pub power_now_kw: f64,
    pub soc_now_pct: f64,
    #[serde(default)]
    pub can_connect: bool,
    #[serde(default)]
    pub allowed_connect_times: Vec<LocalTimeWindow>,
    #[serde(default)]
    pub connect_grace_minutes: u32,
    /// Non-decreasing in `target_pct`; enforced by `validate_ev_load`.
    #[serde(default)]
    pub soc_incentives: Vec<SocIncentive>,
    pub switch_penalty: Option<f64>,
    pub deadline_target: Option<f64>,
}

fn validate_ev_load(ev: &ControlledEvLoad) -> Result<(), validator::ValidationError> {
    if ev.min_power_kw > ev.max_power_kw {
        return Err(validator::ValidationError::new("min_power_kw_exceeds_max_power_kw"));
    }
    let mut last = f64::MIN;
    for band in &ev.soc_incentives {
        if band.target_pct < last {
            return Err(validator::ValidationError::new("soc_incentives_not_non_decreasing"));
        }
        last = band.target_pct;
    }
    Ok(())
}

impl ControlledEvLoad {
    pub fn is_allowed(&self, now: DateTime<Utc>, slot_start: DateTime<Utc>, tz: chrono_tz::Tz) -> bool {
        if self.connected {
            return true;
        }
        if !self.can_connect {
            return false;
        }
        let grace = now + chrono::Duration::minutes(self.connect_grace_minutes as i64);
        if slot_start < grace {
            return false;
        }
        if self.allowed_connect_times.is_empty() {
            return true;
        }
        self.allowed_connect_times
            .iter()
            .any(|w| w.contains(slot_start, tz))
    }

    /// Energy (kWh) represented by each incentive band, in order, given the
    /// EV's current SoC. The final implicit band absorbs all capacity above
    /// the last configured target at zero reward.
    pub fn band_widths_kwh(&self) -> Vec<(f64, f64)> {
        let mut widths = Vec::with_capacity(self.soc_incentives.len() + 1);
        let mut prev_target = self.soc_now_pct.max(0.0);
        for band in &self.soc_incentives {
            let target = band.target_pct.max(prev_target);
            let width = (target - prev_target) / 100.0 * self.capacity_kwh;
            widths.push((width.max(0.0), band.reward_per_kwh));
            prev_target = target;
        }
        let remaining = ((100.0 - prev_target) / 100.0 * self.capacity_kwh).max(0.0);
        widths.push((remaining, 0.0));
        widths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn ev() -> ControlledEvLoad {
        ControlledEvLoad {
            id: "ev1".into(),
            min_power_kw: 0.0,
            max_power_kw: 7.4,
            capacity_kwh: 50.0,
            connected: true,
            power_now_kw: 0.0,
            soc_now_pct: 20.0,
            can_connect: false,
            allowed_connect_times: vec![],
            connect_grace_minutes: 0,
            soc_incentives: vec![
                SocIncentive { target_pct: 50.0, reward_per_kwh: 0.20 },
                SocIncentive { target_pct: 80.0, reward_per_kwh: 0.05 },
            ],
            switch_penalty: None,
            deadline_target: None,
        }
    }

    #[test]
    fn connected_is_always_allowed() {
        let ev = ev();
        let now = utc(2024, 1, 1, 0, 0, 0);
        assert!(ev.is_allowed(now, now, chrono_tz::UTC));
    }

    #[test]
    fn disconnected_without_can_connect_is_disallowed() {
        let mut ev = ev();
        ev.connected = false;
        let now = utc(2024, 1, 1, 0, 0, 0);
        assert!(!ev.is_allowed(now, now, chrono_tz::UTC));
    }

    #[test]
    fn grace_period_delays_connection() {
        let mut ev = ev();
        ev.connected = false;
        ev.can_connect = true;
        ev.connect_grace_minutes = 30;
        let now = utc(2024, 1, 1, 0, 0, 0);
        assert!(!ev.is_allowed(now, now, chrono_tz::UTC));
        assert!(ev.is_allowed(now, now + chrono::Duration::minutes(31), chrono_tz::UTC));
    }

    #[test]
    fn band_widths_match_incentive_competition_scenario() {
        let ev = ev();
        let widths = ev.band_widths_kwh();
        // 20% -> 50% band = 30% of 50 kWh = 15 kWh at 0.20/kWh
        assert!((widths[0].0 - 15.0).abs() < 1e-9);
        assert_eq!(widths[0].1, 0.20);
        // 50% -> 80% band = 30% of 50 kWh = 15 kWh at 0.05/kWh
        assert!((widths[1].0 - 15.0).abs() < 1e-9);
        assert_eq!(widths[1].1, 0.05);
        // trailing band absorbs the rest at zero reward
        assert!((widths[2].0 - 10.0).abs() < 1e-9);
        assert_eq!(widths[2].1, 0.0);
    }

    #[test]
    fn non_monotonic_incentives_fail_validation() {
        let mut ev = ev();
        ev.soc_incentives = vec![
            SocIncentive { target_pct: 80.0, reward_per_kwh: 0.05 },
            SocIncentive { target_pct: 50.0, reward_per_kwh: 0.20 },
        ];
        assert!(ev.validate().is_err());
    }
}
