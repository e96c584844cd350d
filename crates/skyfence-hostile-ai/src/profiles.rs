//! Airframe-specific motion profiles.
//!
//! Maps the free-form `drone_type` strings used by scenario files onto
//! concrete motion limits, falling back on size class for unknown types.

use skyfence_core::components::MotionLimits;
use skyfence_core::enums::SizeClass;

/// Motion limits for a scenario drone type.
pub fn limits_for_type(drone_type: &str, size_class: SizeClass) -> MotionLimits {
    match drone_type {
        "quad_attack" => MotionLimits {
            max_speed: 28.0,
            cruise_speed: 16.0,
            acceleration: 8.0,
            turn_rate: 2.0,
            climb_rate: 6.0,
            evasion_trigger_distance: 50.0,
            evasion_maneuver_strength: 0.85,
        },
        "quad_camera" => MotionLimits {
            max_speed: 18.0,
            cruise_speed: 10.0,
            acceleration: 4.0,
            turn_rate: 1.5,
            climb_rate: 4.0,
            evasion_trigger_distance: 40.0,
            evasion_maneuver_strength: 0.5,
        },
        "fpv_racer" => MotionLimits {
            max_speed: 45.0,
            cruise_speed: 25.0,
            acceleration: 15.0,
            turn_rate: 3.5,
            climb_rate: 10.0,
            evasion_trigger_distance: 60.0,
            evasion_maneuver_strength: 0.95,
        },
        "fixed_wing_survey" => MotionLimits {
            max_speed: 30.0,
            cruise_speed: 22.0,
            acceleration: 3.0,
            turn_rate: 0.8,
            climb_rate: 5.0,
            evasion_trigger_distance: 80.0,
            evasion_maneuver_strength: 0.4,
        },
        "heavy_lifter" => MotionLimits {
            max_speed: 15.0,
            cruise_speed: 9.0,
            acceleration: 2.5,
            turn_rate: 0.7,
            climb_rate: 3.0,
            evasion_trigger_distance: 40.0,
            evasion_maneuver_strength: 0.3,
        },
        _ => limits_for_size(size_class),
    }
}

/// Fallback limits keyed by airframe size.
pub fn limits_for_size(size_class: SizeClass) -> MotionLimits {
    match size_class {
        SizeClass::Small => MotionLimits::default(),
        SizeClass::Medium => MotionLimits {
            max_speed: 22.0,
            cruise_speed: 14.0,
            acceleration: 4.0,
            turn_rate: 1.2,
            climb_rate: 4.0,
            evasion_trigger_distance: 50.0,
            evasion_maneuver_strength: 0.6,
        },
        SizeClass::Large => MotionLimits {
            max_speed: 16.0,
            cruise_speed: 10.0,
            acceleration: 2.5,
            turn_rate: 0.8,
            climb_rate: 3.0,
            evasion_trigger_distance: 45.0,
            evasion_maneuver_strength: 0.35,
        },
    }
}
