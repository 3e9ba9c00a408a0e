use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use ems_planner::config::AppConfig;
use ems_planner::resolver::fixture::{FixtureData, FixtureResolver};
use ems_planner::telemetry::init_tracing;
use ems_planner::{milp, plan};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ems-planner", about = "Receding-horizon MILP planner for a residential EMS")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolves a config against a fixture and solves one plan.
    Solve {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        fixture: PathBuf,
    },
    /// Captures resolved inputs plus the resulting plan under
    /// `fixtures/<fixture>/<name>/`.
    RecordScenario {
        #[arg(long)]
        fixture: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        fixtures_root: PathBuf,
    },
    /// Re-solves recorded scenarios and overwrites their baseline plan/hash
    /// after confirming the new plan's hash actually changed.
    RefreshBaseline {
        #[arg(long)]
        fixture: Option<String>,
        #[arg(long)]
        scenario: Option<String>,
        #[arg(long)]
        fixtures_root: PathBuf,
    },
    /// Aggregates a one-line pass/fail report across every recorded
    /// scenario under a fixture.
    ScenarioReport {
        #[arg(long)]
        fixture: Option<String>,
        #[arg(long)]
        fixtures_root: PathBuf,
    },
}

fn scenario_dir(fixtures_root: &Path, fixture: &str, scenario: &str) -> PathBuf {
    fixtures_root.join(fixture).join(scenario)
}

fn plan_hash(plan: &plan::Plan) -> Result<String> {
    let canonical = serde_json::to_vec(plan).context("serializing plan for hashing")?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(format!("{:x}", hasher.finalize()))
}

async fn run_solve(config_path: &Path, fixture_path: &Path) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let fixture = FixtureData::load(fixture_path)?;
    let resolver = FixtureResolver::new(fixture);

    let ems = config.ems.clone();
    let plant = config.plant.clone();
    let loads = config.loads.clone();
    let weights = milp::ObjectiveWeights::default();
    let now = Utc::now();

    let result = tokio::task::spawn_blocking(move || {
        ems_planner::plan(&ems, &plant, &loads, &weights, milp::SolverBackend::Cbc, now, &resolver)
    })
    .await
    .context("join solve task")?;

    let plan = result.map_err(|e| anyhow::anyhow!("planning failed: {e}"))?;
    info!(objective = plan.objective, slots = plan.slots.len(), "plan solved");
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

async fn run_record_scenario(
    fixture: &str,
    name: &str,
    config_path: &Path,
    fixtures_root: &Path,
) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let dir = scenario_dir(fixtures_root, fixture, name);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let now = Utc::now();
    let fixture_data = FixtureData { now, ..FixtureData::default() };
    fixture_data.save(&dir.join("ems_fixture.json"))?;
    std::fs::copy(config_path, dir.join("ems_config.yaml"))
        .with_context(|| format!("copying config to {}", dir.display()))?;

    let resolver = FixtureResolver::new(fixture_data);
    let ems = config.ems.clone();
    let plant = config.plant.clone();
    let loads = config.loads.clone();
    let weights = milp::ObjectiveWeights::default();

    let result = tokio::task::spawn_blocking(move || {
        ems_planner::plan(&ems, &plant, &loads, &weights, milp::SolverBackend::Cbc, now, &resolver)
    })
    .await
    .context("join record task")?;
    let plan = result.map_err(|e| anyhow::anyhow!("planning failed: {e}"))?;

    let hash = plan_hash(&plan)?;
    std::fs::write(dir.join("ems_plan.json"), serde_json::to_string_pretty(&plan)?)?;
    std::fs::write(dir.join("ems_plan.hash"), &hash)?;

    info!(%fixture, %name, hash = %hash, "scenario recorded");
    Ok(())
}

fn list_scenarios(fixtures_root: &Path, fixture: Option<&str>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    let fixture_dirs: Vec<PathBuf> = match fixture {
        Some(f) => vec![fixtures_root.join(f)],
        None => std::fs::read_dir(fixtures_root)
            .with_context(|| format!("reading {}", fixtures_root.display()))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.path())
            .collect(),
    };

    for fixture_dir in fixture_dirs {
        let fixture_name = fixture_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let Ok(entries) = std::fs::read_dir(&fixture_dir) else { continue };
        for entry in entries.filter_map(|e| e.ok()) {
            if entry.path().is_dir() {
                let scenario_name = entry.file_name().to_string_lossy().to_string();
                out.push((fixture_name.clone(), scenario_name));
            }
        }
    }
    Ok(out)
}

async fn run_refresh_baseline(
    fixture: Option<String>,
    scenario: Option<String>,
    fixtures_root: &Path,
) -> Result<()> {
    let scenarios = match (&fixture, &scenario) {
        (Some(f), Some(s)) => vec![(f.clone(), s.clone())],
        _ => list_scenarios(fixtures_root, fixture.as_deref())?,
    };

    for (fixture_name, scenario_name) in scenarios {
        let dir = scenario_dir(fixtures_root, &fixture_name, &scenario_name);
        let config = AppConfig::load(&dir.join("ems_config.yaml"))?;
        let fixture_data = FixtureData::load(&dir.join("ems_fixture.json"))?;
        let now = fixture_data.now;
        let resolver = FixtureResolver::new(fixture_data);

        let ems = config.ems.clone();
        let plant = config.plant.clone();
        let loads = config.loads.clone();
        let weights = milp::ObjectiveWeights::default();

        let result = tokio::task::spawn_blocking(move || {
            ems_planner::plan(&ems, &plant, &loads, &weights, milp::SolverBackend::Cbc, now, &resolver)
        })
        .await
        .context("join refresh task")?;
        let plan = result.map_err(|e| anyhow::anyhow!("planning failed: {e}"))?;
        let hash = plan_hash(&plan)?;

        let hash_path = dir.join("ems_plan.hash");
        let previous_hash = std::fs::read_to_string(&hash_path).ok();
        if previous_hash.as_deref() == Some(hash.as_str()) {
            info!(fixture = %fixture_name, scenario = %scenario_name, "baseline unchanged");
            continue;
        }

        std::fs::write(dir.join("ems_plan.json"), serde_json::to_string_pretty(&plan)?)?;
        std::fs::write(&hash_path, &hash)?;
        warn!(fixture = %fixture_name, scenario = %scenario_name, "baseline refreshed");
    }
    Ok(())
}

async fn run_scenario_report(fixture: Option<String>, fixtures_root: &Path) -> Result<()> {
    let scenarios = list_scenarios(fixtures_root, fixture.as_deref())?;
    let mut pass = 0;
    let mut fail = 0;

    for (fixture_name, scenario_name) in scenarios {
        let dir = scenario_dir(fixtures_root, &fixture_name, &scenario_name);
        let status = match run_one_scenario_check(&dir).await {
            Ok(true) => "PASS",
            Ok(false) => "FAIL",
            Err(_) => "ERROR",
        };

        if status == "PASS" {
            pass += 1;
        } else {
            fail += 1;
        }
        println!("{fixture_name}/{scenario_name}: {status}");
    }

    println!("{pass} passed, {fail} failed");
    Ok(())
}

async fn run_one_scenario_check(dir: &Path) -> Result<bool> {
    let baseline_hash = std::fs::read_to_string(dir.join("ems_plan.hash"))?;
    let config = AppConfig::load(&dir.join("ems_config.yaml"))?;
    let fixture_data = FixtureData::load(&dir.join("ems_fixture.json"))?;
    let now = fixture_data.now;
    let resolver = FixtureResolver::new(fixture_data);

    let ems = config.ems.clone();
    let plant = config.plant.clone();
    let loads = config.loads.clone();
    let weights = milp::ObjectiveWeights::default();

    let result = tokio::task::spawn_blocking(move || {
        ems_planner::plan(&ems, &plant, &loads, &weights, milp::SolverBackend::Cbc, now, &resolver)
    })
    .await
    .context("join report task")?;
    let plan = result.map_err(|e| anyhow::anyhow!("planning failed: {e}"))?;
    let hash = plan_hash(&plan)?;
    Ok(hash == baseline_hash.trim())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Solve { config, fixture } => run_solve(&config, &fixture).await,
        Command::RecordScenario { fixture, name, config, fixtures_root } => {
            run_record_scenario(&fixture, &name, &config, &fixtures_root).await
        }
        Command::RefreshBaseline { fixture, scenario, fixtures_root } => {
            run_refresh_baseline(fixture, scenario, &fixtures_root).await
        }
        Command::ScenarioReport { fixture, fixtures_root } => {
            run_scenario_report(fixture, &fixtures_root).await
        }
    }
}
