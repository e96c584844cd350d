//! Hostile behavior finite state machine.
//!
//! Pure functions that compute behavior transitions and velocity commands
//! for hostile vehicles. The only nondeterminism is the EVADE climb jitter,
//! drawn from the rng threaded in by the caller.

use rand::Rng;

use skyfence_core::components::MotionLimits;
use skyfence_core::constants::*;
use skyfence_core::enums::HostileBehavior;
use skyfence_core::types::{Position, Velocity};

/// Input to the hostile FSM for a single vehicle.
pub struct HostileContext<'a> {
    pub id: u32,
    pub position: Position,
    pub velocity: Velocity,
    pub behavior: HostileBehavior,
    pub is_evading: bool,
    pub limits: &'a MotionLimits,
    /// Orbit point for RECON behavior; base used when absent.
    pub target_point: Option<Position>,
    pub base_pos: Position,
    /// Position and distance of the closest interceptor actively pursuing
    /// this hostile, if any.
    pub nearest_pursuer: Option<(Position, f64)>,
}

/// Output from the hostile FSM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostileUpdate {
    pub behavior: HostileBehavior,
    pub is_evading: bool,
    pub velocity: Velocity,
}

/// Evaluate the FSM for one hostile over `dt` seconds.
pub fn evaluate<R: Rng>(ctx: &HostileContext, dt: f64, rng: &mut R) -> HostileUpdate {
    let (behavior, is_evading) = next_behavior(ctx);

    let velocity = match behavior {
        HostileBehavior::Normal => normal_velocity(ctx, dt),
        HostileBehavior::Recon => recon_velocity(ctx),
        HostileBehavior::AttackRun => attack_run_velocity(ctx, dt),
        HostileBehavior::Evade => evade_velocity(ctx, dt, rng),
    };

    HostileUpdate {
        behavior,
        is_evading,
        velocity,
    }
}

/// Evasion trigger: enter EVADE when a pursuer closes inside the trigger
/// distance; revert to NORMAL once no pursuer remains. Keeps the invariant
/// `behavior == EVADE ⇔ is_evading`.
fn next_behavior(ctx: &HostileContext) -> (HostileBehavior, bool) {
    match ctx.nearest_pursuer {
        Some((_, dist)) if dist < ctx.limits.evasion_trigger_distance => {
            (HostileBehavior::Evade, true)
        }
        Some(_) if ctx.is_evading => (HostileBehavior::Evade, true),
        None if ctx.is_evading => (HostileBehavior::Normal, false),
        _ => (ctx.behavior, ctx.is_evading),
    }
}

/// NORMAL: cruise toward the base, climb rate decaying toward level flight.
fn normal_velocity(ctx: &HostileContext, dt: f64) -> Velocity {
    let (ux, uy) = horizontal_unit(&ctx.position, &ctx.base_pos);
    let speed = approach_speed(
        ctx.velocity.horizontal_speed(),
        ctx.limits.cruise_speed,
        ctx.limits.acceleration * dt,
    );
    let vz = decay_toward_zero(ctx.velocity.z, ctx.limits.climb_rate * dt);
    Velocity::new(ux * speed, uy * speed, vz)
}

/// RECON: transit to the orbit point at reduced speed, then circle it.
fn recon_velocity(ctx: &HostileContext) -> Velocity {
    let target = ctx.target_point.unwrap_or(ctx.base_pos);
    let dist = ctx.position.horizontal_range_to(&target);
    let speed = ctx.limits.cruise_speed * RECON_TRANSIT_SPEED_FACTOR;

    if dist > RECON_ORBIT_RADIUS + RECON_APPROACH_SLACK {
        let (ux, uy) = horizontal_unit(&ctx.position, &target);
        let vz = climb_toward(ctx.position.z, target.z, ctx.limits.climb_rate);
        return Velocity::new(ux * speed, uy * speed, vz);
    }

    // Circle: tangential motion at omega = v / r, with a radial correction
    // holding the orbit radius.
    let (rx, ry) = horizontal_unit(&target, &ctx.position);
    let (tx, ty) = (-ry, rx);
    let radial_error = dist - RECON_ORBIT_RADIUS;
    let correction = (-radial_error * 0.5).clamp(-speed * 0.5, speed * 0.5);
    let vz = climb_toward(ctx.position.z, target.z, ctx.limits.climb_rate);
    Velocity::new(tx * speed + rx * correction, ty * speed + ry * correction, vz)
}

/// ATTACK_RUN: sprint at the base, forcing a low approach altitude.
fn attack_run_velocity(ctx: &HostileContext, dt: f64) -> Velocity {
    let (ux, uy) = horizontal_unit(&ctx.position, &ctx.base_pos);
    let speed = approach_speed(
        ctx.velocity.horizontal_speed(),
        ctx.limits.max_speed,
        ctx.limits.acceleration * dt,
    );
    let vz = ((ATTACK_RUN_ALTITUDE - ctx.position.z) * 0.5)
        .clamp(-ATTACK_RUN_CLIMB_LIMIT, ATTACK_RUN_CLIMB_LIMIT);
    Velocity::new(ux * speed, uy * speed, vz)
}

/// EVADE: break away from the pursuer, rotated off-axis, at full evasive
/// power. The break side is a fixed per-vehicle parity so a given hostile
/// always jinks the same way; the climb direction is the random jitter.
fn evade_velocity<R: Rng>(ctx: &HostileContext, dt: f64, rng: &mut R) -> Velocity {
    let pursuer = match ctx.nearest_pursuer {
        Some((pos, _)) => pos,
        // Pursuer vanished mid-tick; flee the base as a stand-in.
        None => ctx.base_pos,
    };
    let (ax, ay) = horizontal_unit(&pursuer, &ctx.position);

    let sign = if ctx.id % 2 == 0 { 1.0 } else { -1.0 };
    let angle = (sign * EVADE_BREAK_ANGLE_DEG).to_radians();
    let (sin_a, cos_a) = angle.sin_cos();
    let ux = ax * cos_a + ay * sin_a;
    let uy = -ax * sin_a + ay * cos_a;

    let target_speed = ctx.limits.max_speed * ctx.limits.evasion_maneuver_strength;
    let speed = approach_speed(
        ctx.velocity.horizontal_speed(),
        target_speed,
        ctx.limits.acceleration * EVADE_ACCEL_FACTOR * dt,
    );
    let vz = if rng.gen_bool(0.5) {
        EVADE_CLIMB_RATE
    } else {
        -EVADE_CLIMB_RATE
    };
    Velocity::new(ux * speed, uy * speed, vz)
}

/// Move `current` toward `target` by at most `max_delta`.
fn approach_speed(current: f64, target: f64, max_delta: f64) -> f64 {
    let delta = (target - current).clamp(-max_delta, max_delta);
    (current + delta).max(0.0)
}

/// Linear decay of a climb rate toward zero.
fn decay_toward_zero(value: f64, max_delta: f64) -> f64 {
    if value.abs() <= max_delta {
        0.0
    } else {
        value - max_delta * value.signum()
    }
}

/// Proportional climb command toward a target altitude.
fn climb_toward(current_alt: f64, target_alt: f64, climb_limit: f64) -> f64 {
    ((target_alt - current_alt) * 0.5).clamp(-climb_limit, climb_limit)
}

/// Horizontal unit vector from `from` to `to`; North when degenerate.
fn horizontal_unit(from: &Position, to: &Position) -> (f64, f64) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < 1e-6 {
        (0.0, 1.0)
    } else {
        (dx / dist, dy / dist)
    }
}
