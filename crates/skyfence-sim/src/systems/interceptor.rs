//! Interceptor state machine system.
//!
//! Drives each interceptor through SCRAMBLE → PURSUING → (RECON |
//! INTERCEPT_*) → RETURNING → IDLE, applying the configured guidance law
//! during pursuit and the method table at the endgame.

use std::collections::HashMap;

use hecs::World;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use skyfence_core::components::{
    GroundTruth, GuidanceUnit, Hostile, HostileState, Interceptor, InterceptorStatus,
};
use skyfence_core::constants::*;
use skyfence_core::enums::{
    InterceptFailure, InterceptMethod, InterceptOutcome, InterceptorState,
};
use skyfence_core::observation::SensorObservation;
use skyfence_core::types::{Position, Velocity};

use crate::guidance::{self, GuidanceInputs};
use crate::sensors::{eo::EoSensor, SensorTarget};

/// Terminal outcome of an interceptor-versus-target attempt this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptReport {
    pub interceptor_id: u32,
    pub target_id: u32,
    pub method: Option<InterceptMethod>,
    pub outcome: InterceptOutcome,
    pub detail: Option<InterceptFailure>,
}

/// Everything the interceptor system hands back to the scheduler.
#[derive(Debug, Default)]
pub struct InterceptorTickOutput {
    pub reports: Vec<InterceptReport>,
    /// Visual-confirmation observations emitted by recon passes; the
    /// scheduler feeds them through the EO detection channel.
    pub recon_observations: Vec<SensorObservation>,
}

struct HostileSnapshot {
    position: Position,
    velocity: Velocity,
    is_neutralized: bool,
    is_evading: bool,
    truth: GroundTruth,
}

/// Advance every interceptor by `dt`.
pub fn run(
    world: &mut World,
    base_pos: &Position,
    time: f64,
    dt: f64,
    eo: &EoSensor,
    rng: &mut ChaCha8Rng,
) -> InterceptorTickOutput {
    let hostiles: HashMap<u32, HostileSnapshot> = world
        .query::<(&Hostile, &HostileState, &GroundTruth, &Position, &Velocity)>()
        .iter()
        .map(|(_, (_, state, truth, pos, vel))| {
            (
                state.id,
                HostileSnapshot {
                    position: *pos,
                    velocity: *vel,
                    is_neutralized: state.is_neutralized,
                    is_evading: state.is_evading,
                    truth: truth.clone(),
                },
            )
        })
        .collect();

    let mut entities: Vec<(hecs::Entity, u32)> = world
        .query::<(&Interceptor, &InterceptorStatus)>()
        .iter()
        .map(|(entity, (_, status))| (entity, status.id))
        .collect();
    entities.sort_by_key(|(_, id)| *id);

    let mut output = InterceptorTickOutput::default();

    for (entity, _id) in entities {
        step_interceptor(
            world, entity, &hostiles, base_pos, time, dt, eo, rng, &mut output,
        );
    }

    output
}

#[allow(clippy::too_many_arguments)]
fn step_interceptor(
    world: &mut World,
    entity: hecs::Entity,
    hostiles: &HashMap<u32, HostileSnapshot>,
    base_pos: &Position,
    time: f64,
    dt: f64,
    eo: &EoSensor,
    rng: &mut ChaCha8Rng,
    output: &mut InterceptorTickOutput,
) {
    let (mut status, mut unit, position, velocity) = {
        let mut query = world
            .query_one::<(&InterceptorStatus, &GuidanceUnit, &Position, &Velocity)>(entity)
            .expect("interceptor entity alive");
        let (status, unit, pos, vel) = query.get().expect("interceptor components present");
        (status.clone(), unit.clone(), *pos, *vel)
    };

    let mut new_velocity = Velocity::default();

    match status.state {
        InterceptorState::Idle | InterceptorState::Neutralized => {}

        InterceptorState::Scramble => {
            new_velocity = Velocity::new(0.0, 0.0, INTERCEPTOR_CLIMB_RATE);
            if time - status.launch_time >= SCRAMBLE_DURATION_SECS {
                status.state = InterceptorState::Pursuing;
            }
        }

        InterceptorState::Pursuing => {
            match live_target(&status, hostiles) {
                None => {
                    abort(&mut status, InterceptFailure::TargetLost, output);
                    new_velocity = return_velocity(&position, base_pos);
                }
                Some(target) => {
                    if time - status.launch_time > MAX_PURSUIT_SECS {
                        abort(&mut status, InterceptFailure::Timeout, output);
                        new_velocity = return_velocity(&position, base_pos);
                    } else {
                        let dist = position.range_to(&target.position);
                        if status.method.is_none()
                            && dist < RECON_TRIGGER_RANGE
                            && !status.eo_confirmed
                        {
                            status.state = InterceptorState::Recon;
                            status.recon_start = Some(time);
                            new_velocity =
                                orbit_velocity(&position, &target.position, INTERCEPTOR_RECON_RADIUS);
                        } else if let Some(method) = status.method {
                            if dist <= method.profile().max_distance {
                                status.state = method.intercept_state();
                            }
                            new_velocity = pursue(
                                &mut unit, &position, &velocity, target, dt,
                                INTERCEPTOR_MAX_SPEED,
                            );
                        } else {
                            new_velocity = pursue(
                                &mut unit, &position, &velocity, target, dt,
                                INTERCEPTOR_MAX_SPEED,
                            );
                        }
                    }
                }
            }
        }

        InterceptorState::Recon => match live_target(&status, hostiles) {
            None => {
                abort(&mut status, InterceptFailure::TargetLost, output);
                new_velocity = return_velocity(&position, base_pos);
            }
            Some(target) => {
                new_velocity =
                    orbit_velocity(&position, &target.position, INTERCEPTOR_RECON_RADIUS);
                let loitered = time - status.recon_start.unwrap_or(time);
                if loitered >= INTERCEPTOR_RECON_DURATION_SECS {
                    status.eo_confirmed = true;
                    if let Some(target_id) = status.target_id {
                        let view = SensorTarget {
                            id: target_id,
                            position: target.position,
                            velocity: target.velocity,
                            is_neutralized: target.is_neutralized,
                            truth: &target.truth,
                        };
                        let base_range = base_pos.range_to(&target.position);
                        let mut obs = eo.observe(time, &view, base_range, false, rng);
                        // Close visual pass: far more certain than a
                        // stand-off EO detection.
                        obs.confidence = 0.95;
                        obs.class_confidence = Some(0.9);
                        output.recon_observations.push(obs);
                    }
                    status.state = if status.method.is_some() {
                        InterceptorState::Pursuing
                    } else {
                        InterceptorState::Returning
                    };
                }
            }
        },

        InterceptorState::InterceptRam => match live_target(&status, hostiles) {
            None => {
                abort(&mut status, InterceptFailure::TargetLost, output);
                new_velocity = return_velocity(&position, base_pos);
            }
            Some(target) => {
                new_velocity = pursue(
                    &mut unit, &position, &velocity, target, dt,
                    INTERCEPTOR_MAX_SPEED * RAM_SPEED_FACTOR,
                );
                let dist = position.range_to(&target.position);
                let profile = InterceptMethod::Ram.profile();
                if dist <= profile.max_distance {
                    let success = rng.gen_bool(success_rate(&profile, target.is_evading));
                    resolve(
                        &mut status,
                        success,
                        target.is_evading,
                        InterceptFailure::CollisionAvoided,
                        output,
                    );
                    new_velocity = return_velocity(&position, base_pos);
                }
            }
        },

        InterceptorState::InterceptGun => match live_target(&status, hostiles) {
            None => {
                abort(&mut status, InterceptFailure::TargetLost, output);
                new_velocity = return_velocity(&position, base_pos);
            }
            Some(target) => {
                let dist = position.range_to(&target.position);
                let profile = InterceptMethod::Gun.profile();
                if dist > profile.max_distance {
                    new_velocity = pursue(
                        &mut unit, &position, &velocity, target, dt, INTERCEPTOR_MAX_SPEED,
                    );
                } else if dist < profile.min_distance {
                    new_velocity = backoff_velocity(&position, &target.position);
                } else {
                    // In the firing band: shadow the target and shoot.
                    new_velocity = target.velocity;
                    status.gun_attempts += 1;
                    let p = success_rate(&profile, target.is_evading)
                        * dt
                        * GUN_ATTEMPT_RATE_SCALE;
                    if rng.gen_bool(p.clamp(0.0, 1.0)) {
                        resolve(
                            &mut status,
                            true,
                            target.is_evading,
                            InterceptFailure::GunMissed,
                            output,
                        );
                        new_velocity = return_velocity(&position, base_pos);
                    } else if status.gun_attempts >= GUN_ATTEMPTS_CAP {
                        resolve(
                            &mut status,
                            false,
                            target.is_evading,
                            InterceptFailure::GunMissed,
                            output,
                        );
                        new_velocity = return_velocity(&position, base_pos);
                    }
                }
            }
        },

        InterceptorState::InterceptNet => match live_target(&status, hostiles) {
            None => {
                abort(&mut status, InterceptFailure::TargetLost, output);
                new_velocity = return_velocity(&position, base_pos);
            }
            Some(target) => {
                new_velocity = pursue(
                    &mut unit, &position, &velocity, target, dt,
                    INTERCEPTOR_MAX_SPEED * NET_SPEED_FACTOR,
                );
                let dist = position.range_to(&target.position);
                let profile = InterceptMethod::Net.profile();
                if dist <= profile.max_distance {
                    let success = rng.gen_bool(success_rate(&profile, target.is_evading));
                    resolve(
                        &mut status,
                        success,
                        target.is_evading,
                        InterceptFailure::NetMissed,
                        output,
                    );
                    new_velocity = return_velocity(&position, base_pos);
                }
            }
        },

        InterceptorState::InterceptJam => match live_target(&status, hostiles) {
            None => {
                abort(&mut status, InterceptFailure::TargetLost, output);
                new_velocity = return_velocity(&position, base_pos);
            }
            Some(target) => {
                let dist = position.range_to(&target.position);
                let profile = InterceptMethod::Jam.profile();
                if dist > profile.max_distance {
                    new_velocity = pursue(
                        &mut unit, &position, &velocity, target, dt, INTERCEPTOR_MAX_SPEED,
                    );
                } else if dist < profile.min_distance {
                    new_velocity = backoff_velocity(&position, &target.position);
                } else {
                    new_velocity = target.velocity;
                    status.jam_duration += dt;
                    if status.jam_duration >= JAM_DURATION_REQUIRED_SECS {
                        let success = rng.gen_bool(success_rate(&profile, target.is_evading));
                        resolve(
                            &mut status,
                            success,
                            target.is_evading,
                            InterceptFailure::JamFailed,
                            output,
                        );
                        new_velocity = return_velocity(&position, base_pos);
                    }
                }
            }
        },

        InterceptorState::Returning => {
            let dist = position.range_to(base_pos);
            if dist < RETURN_SNAP_RANGE {
                status.state = InterceptorState::Idle;
                status.target_id = None;
                status.method = None;
                status.clear_engagement_counters();
                unit.state.reset();
                if let Ok(mut pos) = world.get::<&mut Position>(entity) {
                    *pos = *base_pos;
                }
            } else {
                new_velocity = return_velocity(&position, base_pos);
            }
        }
    }

    // Integrate and write back.
    if let Ok(mut vel) = world.get::<&mut Velocity>(entity) {
        *vel = new_velocity;
    }
    if status.state != InterceptorState::Idle {
        if let Ok(mut pos) = world.get::<&mut Position>(entity) {
            pos.x += new_velocity.x * dt;
            pos.y += new_velocity.y * dt;
            pos.z = (pos.z + new_velocity.z * dt).max(0.0);
        }
    }
    if let Ok(mut stored) = world.get::<&mut InterceptorStatus>(entity) {
        *stored = status;
    }
    if let Ok(mut stored) = world.get::<&mut GuidanceUnit>(entity) {
        *stored = unit;
    }
}

fn live_target<'a>(
    status: &InterceptorStatus,
    hostiles: &'a HashMap<u32, HostileSnapshot>,
) -> Option<&'a HostileSnapshot> {
    status
        .target_id
        .and_then(|id| hostiles.get(&id))
        .filter(|snap| !snap.is_neutralized)
}

fn success_rate(profile: &skyfence_core::enums::MethodProfile, target_evading: bool) -> f64 {
    let rate = if target_evading {
        profile.base_success_rate * (1.0 - profile.evade_penalty)
    } else {
        profile.base_success_rate
    };
    rate.clamp(0.0, 1.0)
}

/// Terminal resolution: record the report and turn for home.
fn resolve(
    status: &mut InterceptorStatus,
    success: bool,
    target_evading: bool,
    failure: InterceptFailure,
    output: &mut InterceptorTickOutput,
) {
    let (outcome, detail) = if success {
        (InterceptOutcome::Success, None)
    } else if target_evading {
        (InterceptOutcome::Evaded, Some(InterceptFailure::Evaded))
    } else {
        (InterceptOutcome::Miss, Some(failure))
    };
    output.reports.push(InterceptReport {
        interceptor_id: status.id,
        target_id: status.target_id.unwrap_or_default(),
        method: status.method,
        outcome,
        detail,
    });
    status.state = InterceptorState::Returning;
}

fn abort(
    status: &mut InterceptorStatus,
    detail: InterceptFailure,
    output: &mut InterceptorTickOutput,
) {
    output.reports.push(InterceptReport {
        interceptor_id: status.id,
        target_id: status.target_id.unwrap_or_default(),
        method: status.method,
        outcome: InterceptOutcome::Aborted,
        detail: Some(detail),
    });
    status.state = InterceptorState::Returning;
}

fn pursue(
    unit: &mut GuidanceUnit,
    position: &Position,
    velocity: &Velocity,
    target: &HostileSnapshot,
    dt: f64,
    max_speed: f64,
) -> Velocity {
    let cmd = guidance::steer(
        unit.mode,
        &mut unit.state,
        &GuidanceInputs {
            position: *position,
            velocity: *velocity,
            target_position: target.position,
            target_velocity: target.velocity,
            dt,
            max_speed,
            acceleration: INTERCEPTOR_ACCELERATION,
        },
    );
    cmd.velocity
}

/// Straight home at the return-leg speed fraction.
fn return_velocity(position: &Position, base_pos: &Position) -> Velocity {
    let dx = base_pos.x - position.x;
    let dy = base_pos.y - position.y;
    let dz = base_pos.z - position.z;
    let dist = (dx * dx + dy * dy + dz * dz).sqrt();
    if dist < 1.0 {
        return Velocity::default();
    }
    let speed = INTERCEPTOR_MAX_SPEED * RETURN_SPEED_FACTOR;
    Velocity::new(
        speed * dx / dist,
        speed * dy / dist,
        (speed * dz / dist).clamp(-INTERCEPTOR_CLIMB_RATE, INTERCEPTOR_CLIMB_RATE),
    )
}

/// Open range from a too-close target at half speed.
fn backoff_velocity(position: &Position, target: &Position) -> Velocity {
    let dx = position.x - target.x;
    let dy = position.y - target.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < 1.0 {
        return Velocity::new(0.0, INTERCEPTOR_MAX_SPEED * 0.5, 0.0);
    }
    let speed = INTERCEPTOR_MAX_SPEED * 0.5;
    Velocity::new(speed * dx / dist, speed * dy / dist, 0.0)
}

/// Tangential orbit around the target at the recon radius.
fn orbit_velocity(position: &Position, center: &Position, radius: f64) -> Velocity {
    let dist = position.horizontal_range_to(center);
    let speed = INTERCEPTOR_CRUISE_SPEED;
    if dist > radius + 30.0 {
        // Close to the ring first.
        let dx = center.x - position.x;
        let dy = center.y - position.y;
        let climb = ((center.z - position.z) * 0.5)
            .clamp(-INTERCEPTOR_CLIMB_RATE, INTERCEPTOR_CLIMB_RATE);
        return Velocity::new(speed * dx / dist, speed * dy / dist, climb);
    }
    let rx = if dist < 1.0 { 1.0 } else { (position.x - center.x) / dist };
    let ry = if dist < 1.0 { 0.0 } else { (position.y - center.y) / dist };
    let correction = (-(dist - radius) * 0.5).clamp(-speed * 0.5, speed * 0.5);
    let climb =
        ((center.z - position.z) * 0.5).clamp(-INTERCEPTOR_CLIMB_RATE, INTERCEPTOR_CLIMB_RATE);
    Velocity::new(
        -ry * speed + rx * correction,
        rx * speed + ry * correction,
        climb,
    )
}
