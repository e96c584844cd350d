//! Hostile motion system: runs the behavior FSM for every hostile and
//! integrates positions.

use hecs::World;
use rand_chacha::ChaCha8Rng;

use skyfence_core::components::{Hostile, HostileState, Interceptor, InterceptorStatus, MotionLimits};
use skyfence_core::constants::MIN_HOSTILE_ALTITUDE;
use skyfence_core::enums::InterceptorState;
use skyfence_core::types::{Position, Velocity};

use skyfence_hostile_ai::fsm::{self, HostileContext};

/// Advance every hostile by `dt`. Neutralized hostiles are frozen.
pub fn run(world: &mut World, base_pos: &Position, dt: f64, rng: &mut ChaCha8Rng) {
    // Snapshot active pursuers: only interceptors in the PURSUING state
    // trigger evasion, and only against their own target.
    let pursuers: Vec<(u32, Position)> = {
        let mut list = Vec::new();
        for (_entity, (_marker, status, pos)) in world
            .query::<(&Interceptor, &InterceptorStatus, &Position)>()
            .iter()
        {
            if status.state == InterceptorState::Pursuing {
                if let Some(target) = status.target_id {
                    list.push((target, *pos));
                }
            }
        }
        list
    };

    let mut entities: Vec<(hecs::Entity, u32)> = world
        .query::<(&Hostile, &HostileState)>()
        .iter()
        .map(|(entity, (_, state))| (entity, state.id))
        .collect();
    entities.sort_by_key(|(_, id)| *id);

    for (entity, id) in entities {
        let (position, velocity, limits, behavior, is_evading, target_point, neutralized) = {
            let mut query = world
                .query_one::<(&Position, &Velocity, &MotionLimits, &HostileState)>(entity)
                .expect("hostile entity alive");
            let (pos, vel, limits, state) = query.get().expect("hostile components present");
            (
                *pos,
                *vel,
                *limits,
                state.behavior,
                state.is_evading,
                state.target_point,
                state.is_neutralized,
            )
        };

        if neutralized {
            continue;
        }

        // Closest interceptor pursuing this hostile wins the tie-break.
        let nearest_pursuer = pursuers
            .iter()
            .filter(|(target, _)| *target == id)
            .map(|(_, pos)| (*pos, position.range_to(pos)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let ctx = HostileContext {
            id,
            position,
            velocity,
            behavior,
            is_evading,
            limits: &limits,
            target_point,
            base_pos: *base_pos,
            nearest_pursuer,
        };
        let update = fsm::evaluate(&ctx, dt, rng);

        if let Ok(mut state) = world.get::<&mut HostileState>(entity) {
            state.behavior = update.behavior;
            state.is_evading = update.is_evading;
        }
        if let Ok(mut vel) = world.get::<&mut Velocity>(entity) {
            *vel = update.velocity;
        }
        if let Ok(mut pos) = world.get::<&mut Position>(entity) {
            pos.x += update.velocity.x * dt;
            pos.y += update.velocity.y * dt;
            pos.z = (pos.z + update.velocity.z * dt).max(MIN_HOSTILE_ALTITUDE);
        }
    }
}
