//! SKYFENCE headless runner.
//!
//! Loads a scenario (built-in preset or JSON file), drives the simulation
//! kernel, and writes every emitted event to a JSONL log.

mod config;
mod logger;
mod runner;

use std::fs;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use skyfence_core::config::KernelConfig;
use skyfence_core::enums::{EngagePolicy, EstimatorKind, GuidanceMode};
use skyfence_core::scenario::ScenarioSpec;
use skyfence_sim::{SimConfig, SimulationEngine};

use config::AppConfig;
use logger::EventLog;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Baseline,
    Fusion,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GuidanceArg {
    PurePursuit,
    Pn,
    Apn,
}

/// Counter-UAS command-and-control simulator.
#[derive(Debug, Parser)]
#[command(name = "skyfence", version, about)]
struct Cli {
    /// Built-in preset (baseline_raid, mixed_traffic, saturation) or the
    /// name of a JSON file in the scenarios directory.
    #[arg(long, default_value = "baseline_raid")]
    scenario: String,

    /// Override the scenario's RNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Sim seconds to run.
    #[arg(long, default_value_t = 60.0)]
    duration: f64,

    /// Initial speed multiplier (realtime mode only).
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Engagement policy.
    #[arg(long, value_enum, default_value = "fusion")]
    policy: PolicyArg,

    /// Guidance law for interceptors.
    #[arg(long, value_enum, default_value = "pn")]
    guidance: GuidanceArg,

    /// Use the EKF track estimator instead of the weighted-mean filter.
    #[arg(long)]
    ekf: bool,

    /// Enable the dynamic threat scorer.
    #[arg(long)]
    dynamic_threat: bool,

    /// Disable autonomous engagement.
    #[arg(long)]
    no_auto_engage: bool,

    /// Pace ticks against the wall clock instead of running flat out.
    #[arg(long)]
    realtime: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let app_config = AppConfig::from_env();

    let mut scenario = load_scenario(&cli.scenario, &app_config)?;
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }

    let mut kernel = KernelConfig::default();
    kernel.tick_interval = app_config.tick_interval;
    kernel.auto_engage = !cli.no_auto_engage;
    kernel.dynamic_threat_scoring = cli.dynamic_threat;
    kernel.guidance_mode = match cli.guidance {
        GuidanceArg::PurePursuit => GuidanceMode::PurePursuit,
        GuidanceArg::Pn => GuidanceMode::Pn,
        GuidanceArg::Apn => GuidanceMode::Apn,
    };
    kernel.engagement.policy = match cli.policy {
        PolicyArg::Baseline => EngagePolicy::Baseline,
        PolicyArg::Fusion => EngagePolicy::Fusion,
    };
    if cli.ekf {
        kernel.fusion.estimator = EstimatorKind::Ekf;
    }

    info!(
        scenario = %scenario.name,
        seed = scenario.seed,
        duration = cli.duration,
        "starting simulation"
    );

    let mut log = EventLog::create(&app_config.logs_dir, &scenario)?;
    let mut engine = SimulationEngine::new(SimConfig {
        seed: scenario.seed,
        kernel,
    });
    engine.load_scenario(scenario);
    engine.set_speed_multiplier(cli.speed);
    engine.start();

    let summary = if cli.realtime {
        runner::run_realtime(&mut engine, cli.duration, &mut log)?
    } else {
        runner::run_batch(&mut engine, cli.duration, &mut log)?
    };

    let log_path = log.path().to_path_buf();
    log.finish(summary.sim_time_secs)?;

    println!(
        "{} ticks, {} events -> {}",
        summary.ticks,
        summary.events,
        log_path.display()
    );
    println!(
        "neutralized {} / launched {} / tracks {} / false alarms {}",
        summary.hostiles_neutralized,
        summary.interceptors_launched,
        summary.tracks_created,
        summary.false_alarms
    );
    Ok(())
}

/// Resolve a scenario argument: preset first, then a JSON file in the
/// scenarios directory (with or without the extension).
fn load_scenario(name: &str, config: &AppConfig) -> anyhow::Result<ScenarioSpec> {
    if let Some(preset) = ScenarioSpec::preset(name) {
        return Ok(preset);
    }

    let mut path = config.scenarios_dir.join(name);
    if path.extension().is_none() {
        path.set_extension("json");
    }
    if !path.exists() {
        bail!(
            "unknown scenario '{name}': not a preset and {} does not exist",
            path.display()
        );
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("decoding scenario {}", path.display()))
}
