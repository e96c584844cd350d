//! Entity spawn factories: build the hecs world from a decoded scenario.

use std::collections::HashMap;

use hecs::{Entity, World};

use skyfence_core::components::{
    GroundTruth, GuidanceUnit, Hostile, HostileAttributes, HostileState, Interceptor,
    InterceptorStatus, MotionLimits,
};
use skyfence_core::enums::{GuidanceMode, InterceptMethod, SizeClass};
use skyfence_core::scenario::{DroneSpec, ScenarioSpec};
use skyfence_core::types::{Position, Velocity};

use skyfence_hostile_ai::profiles;

/// Spawn all scenario entities. Returns the id → entity maps the engine
/// keeps as the authoritative lookups.
pub fn build_world(
    world: &mut World,
    spec: &ScenarioSpec,
    base_pos: &Position,
    guidance_mode: GuidanceMode,
) -> (HashMap<u32, Entity>, HashMap<u32, Entity>) {
    let mut hostiles = HashMap::new();
    for (index, drone) in spec.drones.iter().enumerate() {
        let id = index as u32 + 1;
        let entity = spawn_hostile(world, id, drone);
        hostiles.insert(id, entity);
    }

    let mut interceptors = HashMap::new();
    for index in 0..spec.interceptor_count {
        let id = index + 1;
        let entity = spawn_interceptor(world, id, base_pos, guidance_mode);
        interceptors.insert(id, entity);
    }

    (hostiles, interceptors)
}

pub fn spawn_hostile(world: &mut World, id: u32, drone: &DroneSpec) -> Entity {
    let limits = drone
        .config
        .unwrap_or_else(|| profiles::limits_for_type(&drone.drone_type, drone.size_class));

    let truth = GroundTruth {
        label: drone.true_label,
        attrs: Some(HostileAttributes {
            is_hostile: drone.is_hostile,
            drone_type: drone.drone_type.clone(),
            armed: drone.armed,
            size_class: drone.size_class,
            recommended_method: Some(recommended_method(drone.size_class)),
        }),
    };

    world.spawn((
        Hostile,
        drone.position,
        drone.velocity,
        limits,
        HostileState {
            id,
            behavior: drone.behavior,
            target_point: drone.target_position,
            is_evading: false,
            is_neutralized: false,
            spawn_time: 0.0,
        },
        truth,
    ))
}

pub fn spawn_interceptor(
    world: &mut World,
    id: u32,
    base_pos: &Position,
    guidance_mode: GuidanceMode,
) -> Entity {
    world.spawn((
        Interceptor,
        *base_pos,
        Velocity::default(),
        InterceptorStatus::new(id),
        GuidanceUnit {
            mode: guidance_mode,
            state: Default::default(),
        },
    ))
}

/// Doctrine default: small airframes are netted, medium rammed, large
/// engaged from the gun band.
fn recommended_method(size_class: SizeClass) -> InterceptMethod {
    match size_class {
        SizeClass::Small => InterceptMethod::Net,
        SizeClass::Medium => InterceptMethod::Ram,
        SizeClass::Large => InterceptMethod::Gun,
    }
}
