//! Guidance laws for interceptors.
//!
//! Three laws share one output shape so callers never branch on mode after
//! dispatch: pure pursuit, proportional navigation (PN), and augmented PN
//! with an adaptive navigation constant. Line-of-sight angles are radians
//! internal to this module; nothing angular leaves it.

use skyfence_core::components::GuidanceState;
use skyfence_core::constants::*;
use skyfence_core::enums::GuidanceMode;
use skyfence_core::types::{Position, Velocity};

/// Common inputs to every guidance law.
#[derive(Debug, Clone, Copy)]
pub struct GuidanceInputs {
    pub position: Position,
    pub velocity: Velocity,
    pub target_position: Position,
    pub target_velocity: Velocity,
    pub dt: f64,
    pub max_speed: f64,
    pub acceleration: f64,
}

/// Output of a guidance law: the commanded velocity for the next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceCommand {
    pub velocity: Velocity,
}

/// Dispatch on the configured guidance mode.
pub fn steer(
    mode: GuidanceMode,
    state: &mut GuidanceState,
    inputs: &GuidanceInputs,
) -> GuidanceCommand {
    match mode {
        GuidanceMode::PurePursuit => pure_pursuit(state, inputs),
        GuidanceMode::Pn => proportional_navigation(state, inputs, false),
        GuidanceMode::Apn => proportional_navigation(state, inputs, true),
    }
}

/// Pure pursuit: fly at the target's lead-predicted position.
fn pure_pursuit(state: &mut GuidanceState, inputs: &GuidanceInputs) -> GuidanceCommand {
    let lead = Position::new(
        inputs.target_position.x + inputs.target_velocity.x * PURSUIT_LEAD_TIME_SECS,
        inputs.target_position.y + inputs.target_velocity.y * PURSUIT_LEAD_TIME_SECS,
        inputs.target_position.z + inputs.target_velocity.z * PURSUIT_LEAD_TIME_SECS,
    );

    let dx = lead.x - inputs.position.x;
    let dy = lead.y - inputs.position.y;
    let dz = lead.z - inputs.position.z;
    let dist = (dx * dx + dy * dy + dz * dz).sqrt();

    let speed = approach(
        inputs.velocity.speed(),
        inputs.max_speed,
        inputs.acceleration * inputs.dt,
    );

    let velocity = if dist < 1.0 {
        Velocity::default()
    } else {
        Velocity::new(
            speed * dx / dist,
            speed * dy / dist,
            (speed * dz / dist).clamp(-GUIDANCE_CLIMB_LIMIT, GUIDANCE_CLIMB_LIMIT),
        )
    };

    state.last_range = dist;
    state.last_target_vel = Some(inputs.target_velocity);
    GuidanceCommand { velocity }
}

/// PN / APN: lateral acceleration proportional to closing speed and
/// line-of-sight rate, applied as a turn-rate command.
fn proportional_navigation(
    state: &mut GuidanceState,
    inputs: &GuidanceInputs,
    augmented: bool,
) -> GuidanceCommand {
    let dx = inputs.target_position.x - inputs.position.x;
    let dy = inputs.target_position.y - inputs.position.y;
    let dz = inputs.target_position.z - inputs.position.z;
    let horiz_range = (dx * dx + dy * dy).sqrt();
    let range = (horiz_range * horiz_range + dz * dz).sqrt();

    if range < 1.0 {
        // On top of the target; keep flying, the state machine resolves it.
        return GuidanceCommand {
            velocity: inputs.velocity,
        };
    }

    // Line-of-sight angles and rates (radians, module-internal).
    let los = dy.atan2(dx);
    let los_vert = dz.atan2(horiz_range.max(1.0));
    let rate_clamp = GUIDANCE_MAX_TURN_RATE / 2.0;
    let los_rate = match state.prev_los {
        Some(prev) => (wrap_rad(los - prev) / inputs.dt).clamp(-rate_clamp, rate_clamp),
        None => 0.0,
    };
    let los_rate_vert = match state.prev_los_vert {
        Some(prev) => (wrap_rad(los_vert - prev) / inputs.dt).clamp(-rate_clamp, rate_clamp),
        None => 0.0,
    };

    // Closing speed with the configured floor.
    let rel = Velocity::new(
        inputs.target_velocity.x - inputs.velocity.x,
        inputs.target_velocity.y - inputs.velocity.y,
        inputs.target_velocity.z - inputs.velocity.z,
    );
    let closing = -(rel.x * dx + rel.y * dy + rel.z * dz) / range;
    let closing_floor = GUIDANCE_MIN_CLOSING_SPEED * (range / 100.0).min(2.0);
    let closing_eff = closing.max(closing_floor).max(0.5 * inputs.max_speed);

    let n = if augmented {
        adaptive_navigation_constant(state, inputs, range, closing)
    } else {
        PN_NAVIGATION_CONSTANT
    };
    state.adaptive_n = n;

    let mut accel_cmd = n * closing_eff * los_rate;
    if augmented {
        let normal_accel = target_accel_normal_to_los(state, inputs, dx, dy, horiz_range);
        accel_cmd +=
            ((n - 1.0) / 2.0) * APN_TARGET_ACCEL_WEIGHT * normal_accel * los_rate.signum();
    }

    let horiz_speed = inputs.velocity.horizontal_speed();
    let turn_rate = (accel_cmd / horiz_speed.max(10.0))
        .clamp(-GUIDANCE_MAX_TURN_RATE, GUIDANCE_MAX_TURN_RATE);

    let heading = if horiz_speed > 0.1 {
        inputs.velocity.y.atan2(inputs.velocity.x)
    } else {
        los
    };
    let new_heading = heading + turn_rate * inputs.dt;

    let new_speed = approach(
        horiz_speed,
        inputs.max_speed,
        inputs.acceleration * inputs.dt,
    );

    // Vertical channel: altitude-error pursuit plus a PN correction.
    let vert_correction = n * closing_eff * los_rate_vert * inputs.dt;
    let climb = (dz.signum() * (dz.abs() * 0.5).min(10.0) + vert_correction)
        .clamp(-GUIDANCE_CLIMB_LIMIT, GUIDANCE_CLIMB_LIMIT);

    state.prev_los = Some(los);
    state.prev_los_vert = Some(los_vert);
    state.last_los_rate = los_rate;
    state.last_closing_speed = closing_eff;
    state.last_commanded_accel = accel_cmd;
    state.last_range = range;
    state.last_target_vel = Some(inputs.target_velocity);

    GuidanceCommand {
        velocity: Velocity::new(
            new_speed * new_heading.cos(),
            new_speed * new_heading.sin(),
            climb,
        ),
    }
}

/// APN's adaptive navigation constant: base gain plus bonuses for short
/// range and a maneuvering target, minus a penalty for very high closing
/// speed, bounded to the configured window.
fn adaptive_navigation_constant(
    state: &GuidanceState,
    _inputs: &GuidanceInputs,
    range: f64,
    closing: f64,
) -> f64 {
    let mut n = PN_NAVIGATION_CONSTANT;

    if range < 50.0 {
        n += 1.0;
    } else if range < 100.0 {
        n += 0.5;
    } else if range < 150.0 {
        n += 0.2;
    }

    let accel_mag = state.last_target_accel.speed();
    if accel_mag > 5.0 {
        n += 0.5;
    } else if accel_mag > 2.0 {
        n += 0.3;
    }

    if closing > 40.0 {
        n -= 0.3;
    } else if closing > 30.0 {
        n -= 0.1;
    }

    n.clamp(APN_MIN_N, APN_MAX_N)
}

/// Estimate target acceleration by smoothed first-difference and return
/// the magnitude of its component normal to the horizontal line of sight.
fn target_accel_normal_to_los(
    state: &mut GuidanceState,
    inputs: &GuidanceInputs,
    dx: f64,
    dy: f64,
    horiz_range: f64,
) -> f64 {
    let raw = match state.last_target_vel {
        Some(prev) if inputs.dt > 1e-9 => Velocity::new(
            (inputs.target_velocity.x - prev.x) / inputs.dt,
            (inputs.target_velocity.y - prev.y) / inputs.dt,
            (inputs.target_velocity.z - prev.z) / inputs.dt,
        ),
        _ => Velocity::default(),
    };

    let mut smoothed = Velocity::new(
        APN_ACCEL_SMOOTHING * raw.x + (1.0 - APN_ACCEL_SMOOTHING) * state.last_target_accel.x,
        APN_ACCEL_SMOOTHING * raw.y + (1.0 - APN_ACCEL_SMOOTHING) * state.last_target_accel.y,
        APN_ACCEL_SMOOTHING * raw.z + (1.0 - APN_ACCEL_SMOOTHING) * state.last_target_accel.z,
    );
    let mag = smoothed.speed();
    if mag > APN_ACCEL_CAP {
        let scale = APN_ACCEL_CAP / mag;
        smoothed = Velocity::new(smoothed.x * scale, smoothed.y * scale, smoothed.z * scale);
    }
    state.last_target_accel = smoothed;

    if horiz_range < 1e-6 {
        return 0.0;
    }
    let lx = dx / horiz_range;
    let ly = dy / horiz_range;
    let along = smoothed.x * lx + smoothed.y * ly;
    let nx = smoothed.x - along * lx;
    let ny = smoothed.y - along * ly;
    (nx * nx + ny * ny).sqrt()
}

/// Move `current` toward `target` by at most `max_delta`.
fn approach(current: f64, target: f64, max_delta: f64) -> f64 {
    let delta = (target - current).clamp(-max_delta, max_delta);
    (current + delta).max(0.0)
}

/// Normalize an angle into [-PI, PI].
fn wrap_rad(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(std::f64::consts::TAU);
    if wrapped > std::f64::consts::PI {
        wrapped - std::f64::consts::TAU
    } else {
        wrapped
    }
}
