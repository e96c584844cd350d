//! Simulation drivers: a headless batch loop for analysis runs and a
//! wall-clock loop with drift-compensated pacing for watching live.

use std::time::{Duration, Instant};

use tracing::info;

use skyfence_core::events::SimEvent;
use skyfence_sim::SimulationEngine;

use crate::logger::EventLog;

/// Outcome counters for the end-of-run report.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub ticks: u64,
    pub events: u64,
    pub sim_time_secs: f64,
    pub hostiles_neutralized: u32,
    pub interceptors_launched: u32,
    pub tracks_created: u32,
    pub false_alarms: u32,
}

/// Run as fast as the machine allows for `duration_secs` of sim time.
pub fn run_batch(
    engine: &mut SimulationEngine,
    duration_secs: f64,
    log: &mut EventLog,
) -> anyhow::Result<RunSummary> {
    let dt = engine.tick_interval();
    let ticks = (duration_secs / dt).ceil() as u64;
    let mut summary = RunSummary::default();

    for _ in 0..ticks {
        let events = engine.tick(dt);
        record(events, log, &mut summary)?;
    }

    finish(engine, &mut summary);
    Ok(summary)
}

/// Run in wall-clock time, honoring the engine's speed multiplier each
/// tick. Falls back to "no sleep" when the host can't keep up rather than
/// spiraling into catch-up debt.
pub fn run_realtime(
    engine: &mut SimulationEngine,
    duration_secs: f64,
    log: &mut EventLog,
) -> anyhow::Result<RunSummary> {
    let dt = engine.tick_interval();
    let mut summary = RunSummary::default();
    let mut next_tick_time = Instant::now();

    while engine.time().elapsed_secs < duration_secs {
        let events = engine.tick(dt);
        record(events, log, &mut summary)?;

        let speed = engine.speed_multiplier().max(0.001);
        let effective = Duration::from_secs_f64(dt / speed);
        next_tick_time += effective;
        let now = Instant::now();
        if next_tick_time > now {
            std::thread::sleep(next_tick_time - now);
        } else if now - next_tick_time > effective * 2 {
            next_tick_time = now;
        }
    }

    finish(engine, &mut summary);
    Ok(summary)
}

fn record(
    events: Vec<SimEvent>,
    log: &mut EventLog,
    summary: &mut RunSummary,
) -> anyhow::Result<()> {
    summary.ticks += 1;
    for event in events {
        log.log_event(&event)?;
        summary.events += 1;
    }
    Ok(())
}

fn finish(engine: &SimulationEngine, summary: &mut RunSummary) {
    let score = engine.score();
    summary.sim_time_secs = engine.time().elapsed_secs;
    summary.hostiles_neutralized = score.hostiles_neutralized;
    summary.interceptors_launched = score.interceptors_launched;
    summary.tracks_created = score.tracks_created;
    summary.false_alarms = score.false_alarms;
    info!(
        ticks = summary.ticks,
        events = summary.events,
        neutralized = summary.hostiles_neutralized,
        "run complete"
    );
}
