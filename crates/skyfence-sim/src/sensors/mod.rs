//! Synthetic sensors.
//!
//! Each sensor owns its scan cadence and per-target bookkeeping, exposes
//! `scan(time, targets, rng) -> Vec<SensorObservation>` and `reset()`, and
//! is deterministic given a seeded rng. Observations come back in time
//! order within a scan.

pub mod acoustic;
pub mod eo;
pub mod radar;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use skyfence_core::components::GroundTruth;
use skyfence_core::types::{Position, Velocity};

/// Read-only view of one hostile handed to the sensors each tick.
#[derive(Debug, Clone, Copy)]
pub struct SensorTarget<'a> {
    pub id: u32,
    pub position: Position,
    pub velocity: Velocity,
    pub is_neutralized: bool,
    pub truth: &'a GroundTruth,
}

/// Gaussian draw. Falls back to the mean if sigma is degenerate.
pub(crate) fn gauss<R: Rng>(rng: &mut R, mean: f64, sigma: f64) -> f64 {
    match Normal::new(mean, sigma) {
        Ok(dist) => dist.sample(rng),
        Err(_) => mean,
    }
}

/// Radial speed of `target` toward `observer` (m/s, positive = approaching).
pub(crate) fn radial_speed_toward(
    observer: &Position,
    position: &Position,
    velocity: &Velocity,
) -> f64 {
    let range = position.range_to(observer);
    if range < 1e-6 {
        return 0.0;
    }
    let ux = (observer.x - position.x) / range;
    let uy = (observer.y - position.y) / range;
    let uz = (observer.z - position.z) / range;
    velocity.x * ux + velocity.y * uy + velocity.z * uz
}
