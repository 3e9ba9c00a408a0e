//! Application configuration: `server`, `homeassistant`, `ems`, `plant`,
//! `loads`. The planner core (`crate::plan`) only ever reads `ems`,
//! `plant`, and `loads`; `server`/`homeassistant` are parsed and validated
//! so one file can also drive the out-of-core worker, but `plan()` never
//! looks at them.
//!
//! Grounded in the host's `config.rs` (figment + validator, one struct per
//! top-level YAML key); trimmed to the keys this planner's data model
//! actually needs and re-pointed at entity-ref strings instead of raw
//! sensor values, since the planner core resolves those through
//! [`crate::resolver::SourceResolver`] rather than reading them directly
//! out of the file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::ev_load::SocIncentive;
use crate::domain::inverter::CurtailmentMode;
use crate::domain::battery::TerminalSocMode;
use crate::domain::time::LocalTimeWindow;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub homeassistant: HomeAssistantConfig,
    #[validate(nested)]
    pub ems: EmsConfig,
    #[validate(nested)]
    pub plant: PlantConfig,
    #[validate(nested)]
    pub loads: LoadsConfig,
}

impl AppConfig {
    /// Loads `path` as YAML, merges `EMS_`-prefixed environment overrides
    /// (double-underscore-separated, e.g. `EMS_EMS__TIMESTEP_MINUTES=15`),
    /// and validates the result.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config at {}", path.display()))?;
        let cfg: AppConfig = Figment::new()
            .merge(Yaml::string(&raw))
            .merge(Env::prefixed("EMS_").split("__"))
            .extract()
            .with_context(|| format!("parsing config at {}", path.display()))?;
        cfg.validate().context("config failed validation")?;
        Ok(cfg)
    }
}

/// HTTP surface for the out-of-core FastAPI-equivalent worker. Parsed here
/// so `ems_config.yaml` stays a single file; never read by `plan()`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .context("failed to parse server socket address")
    }
}

/// Home Assistant connection details for the out-of-core data-fetching
/// layer; never read by `plan()`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HomeAssistantConfig {
    #[validate(length(min = 1))]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub token: String,
    #[serde(default)]
    pub websocket: bool,
}

/// Horizon shape and planner-wide timing knobs.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_ems_config"))]
pub struct EmsConfig {
    #[validate(range(min = 1))]
    pub timestep_minutes: u32,
    pub high_res_timestep_minutes: Option<u32>,
    pub high_res_horizon_minutes: Option<u32>,
    #[validate(range(min = 1))]
    pub min_horizon_minutes: u32,
    /// IANA timezone name (e.g. `Europe/Stockholm`) used for all
    /// local-time windows and horizon clock-alignment.
    pub timezone: String,
    #[serde(default = "default_short_horizon_minutes")]
    pub short_horizon_minutes: u32,
}

fn default_short_horizon_minutes() -> u32 {
    240
}

fn validate_ems_config(ems: &EmsConfig) -> std::result::Result<(), validator::ValidationError> {
    if ems.timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(validator::ValidationError::new("timezone_not_recognized"));
    }
    match (ems.high_res_timestep_minutes, ems.high_res_horizon_minutes) {
        (Some(tau), Some(window)) if tau == 0 || window == 0 => {
            Err(validator::ValidationError::new("high_res_fields_must_be_positive"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PlantConfig {
    #[validate(nested)]
    pub grid: GridConfig,
    #[validate(nested)]
    pub inverters: Vec<InverterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GridConfig {
    #[validate(range(min = 0.0))]
    pub import_cap_kw: f64,
    #[validate(range(min = 0.0))]
    pub export_cap_kw: f64,
    pub import_price_forecast_entity: String,
    pub import_price_realtime_entity: Option<String>,
    pub export_price_forecast_entity: String,
    pub export_price_realtime_entity: Option<String>,
    #[serde(default)]
    pub import_forbidden_periods: Vec<LocalTimeWindow>,
    pub price_bias_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InverterConfig {
    pub id: String,
    pub name: String,
    #[validate(range(min = 0.0))]
    pub peak_power_kw: f64,
    pub curtailment_mode: CurtailmentMode,
    pub pv_forecast_entity: String,
    pub pv_realtime_entity: Option<String>,
    #[validate(nested)]
    pub battery: Option<BatteryConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_battery_config"))]
pub struct BatteryConfig {
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
    pub soc_realtime_entity: String,
}

fn default_terminal_mode() -> TerminalSocMode {
    TerminalSocMode::Hard
}

fn validate_battery_config(b: &BatteryConfig) -> std::result::Result<(), validator::ValidationError> {
    if b.min_soc_pct > b.max_soc_pct {
        return Err(validator::ValidationError::new("min_soc_pct_exceeds_max_soc_pct"));
    }
    if b.reserve_soc_pct > b.max_soc_pct {
        return Err(validator::ValidationError::new("reserve_soc_pct_exceeds_max_soc_pct"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoadsConfig {
    pub base_load_forecast_entity: String,
    pub base_load_realtime_entity: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub ev_loads: Vec<EvLoadConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_ev_load_config"))]
pub struct EvLoadConfig {
    pub id: String,
    #[validate(range(min = 0.0))]
    pub min_power_kw: f64,
    #[validate(range(min = 0.0))]
    pub max_power_kw: f64,
    #[validate(range(min = 0.0))]
    pub capacity_kwh: f64,
    pub connected_entity: String,
    pub power_realtime_entity: String,
    pub soc_realtime_entity: String,
    #[serde(default)]
    pub can_connect: bool,
    #[serde(default)]
    pub allowed_connect_times: Vec<LocalTimeWindow>,
    #[serde(default)]
    pub connect_grace_minutes: u32,
    #[serde(default)]
    pub soc_incentives: Vec<SocIncentive>,
    pub switch_penalty: Option<f64>,
    pub deadline_target: Option<f64>,
}

fn validate_ev_load_config(ev: &EvLoadConfig) -> std::result::Result<(), validator::ValidationError> {
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
