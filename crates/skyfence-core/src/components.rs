//! ECS components for hecs entities.
//!
//! Components are plain data structs with no behavior.
//! Simulation logic lives in systems, not components.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::{Position, Velocity};

/// Marks an entity as a hostile airborne vehicle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Hostile;

/// Marks an entity as a friendly interceptor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Interceptor;

/// Kinematic limits for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionLimits {
    /// Absolute speed ceiling (m/s).
    pub max_speed: f64,
    /// Preferred transit speed (m/s).
    pub cruise_speed: f64,
    /// Acceleration limit (m/s²).
    pub acceleration: f64,
    /// Turn-rate limit (rad/s).
    pub turn_rate: f64,
    /// Climb-rate limit (m/s).
    pub climb_rate: f64,
    /// Pursuer range that triggers evasion (meters).
    pub evasion_trigger_distance: f64,
    /// Evasion aggressiveness in [0, 1], scales the evade speed target.
    pub evasion_maneuver_strength: f64,
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            max_speed: 25.0,
            cruise_speed: 15.0,
            acceleration: 6.0,
            turn_rate: 1.5,
            climb_rate: 5.0,
            evasion_trigger_distance: 50.0,
            evasion_maneuver_strength: 0.8,
        }
    }
}

/// Mutable per-hostile simulation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostileState {
    /// Unique vehicle id assigned at scenario load.
    pub id: u32,
    pub behavior: HostileBehavior,
    /// Orbit point for RECON behavior.
    pub target_point: Option<Position>,
    pub is_evading: bool,
    pub is_neutralized: bool,
    /// Sim time at which this hostile entered the world (seconds).
    pub spawn_time: f64,
}

/// Extended ground-truth attributes (what EO can ultimately reveal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostileAttributes {
    pub is_hostile: bool,
    pub drone_type: String,
    pub armed: bool,
    pub size_class: SizeClass,
    pub recommended_method: Option<InterceptMethod>,
}

/// Ground truth carried by a hostile — sensors sample from this, the
/// kernel never reads it for decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruth {
    pub label: TruthLabel,
    pub attrs: Option<HostileAttributes>,
}

/// Mutable per-interceptor simulation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptorStatus {
    /// Unique vehicle id assigned at scenario load.
    pub id: u32,
    pub state: InterceptorState,
    /// Hostile id currently assigned, if any.
    pub target_id: Option<u32>,
    /// Sim time of the most recent launch (seconds).
    pub launch_time: f64,
    /// Engagement method, or None for a recon-only sortie.
    pub method: Option<InterceptMethod>,
    /// Sim time the recon loiter began.
    pub recon_start: Option<f64>,
    /// Whether the visual-confirmation pass has completed.
    pub eo_confirmed: bool,
    /// Accumulated in-band jamming time (seconds).
    pub jam_duration: f64,
    /// Gun attempts made this engagement.
    pub gun_attempts: u32,
}

impl InterceptorStatus {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            state: InterceptorState::Idle,
            target_id: None,
            launch_time: 0.0,
            method: None,
            recon_start: None,
            eo_confirmed: false,
            jam_duration: 0.0,
            gun_attempts: 0,
        }
    }

    /// Clear all per-engagement counters (on launch and on return to base).
    pub fn clear_engagement_counters(&mut self) {
        self.recon_start = None;
        self.eo_confirmed = false;
        self.jam_duration = 0.0;
        self.gun_attempts = 0;
    }
}

/// Internal guidance-law state carried between ticks.
///
/// Angles are radians — internal to the guidance module, never crossing a
/// wire boundary (see the bearing convention on `Position::bearing_deg_to`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuidanceState {
    /// Previous horizontal line-of-sight angle (rad).
    pub prev_los: Option<f64>,
    /// Previous vertical line-of-sight angle (rad).
    pub prev_los_vert: Option<f64>,
    /// Last computed LOS angular rate (rad/s).
    pub last_los_rate: f64,
    /// Last effective closing speed (m/s).
    pub last_closing_speed: f64,
    /// Last commanded lateral acceleration (m/s²).
    pub last_commanded_accel: f64,
    /// Adaptive navigation constant (APN only; base N otherwise).
    pub adaptive_n: f64,
    /// Smoothed target acceleration estimate (APN only).
    pub last_target_accel: Velocity,
    /// Target velocity from the previous tick (for acceleration estimation).
    pub last_target_vel: Option<Velocity>,
    /// Range to target at the previous tick (meters).
    pub last_range: f64,
}

impl GuidanceState {
    /// Reset between engagements so stale LOS history never leaks into a
    /// new pursuit.
    pub fn reset(&mut self) {
        *self = GuidanceState::default();
    }
}

/// Guidance mode plus its internal state, attached to each interceptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuidanceUnit {
    pub mode: GuidanceMode,
    pub state: GuidanceState,
}
