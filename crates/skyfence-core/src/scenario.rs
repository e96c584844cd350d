//! Scenario schema and built-in presets.
//!
//! Scenario files are JSON decoded by the host into `ScenarioSpec` before
//! being handed to the kernel. The presets below cover demo and test use
//! without touching the filesystem.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::components::MotionLimits;
use crate::config::{AcousticConfig, RadarConfig};
use crate::enums::{HostileBehavior, SizeClass, TruthLabel};
use crate::types::{Position, Velocity};

/// One hostile vehicle in a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneSpec {
    pub position: Position,
    pub velocity: Velocity,
    #[serde(default)]
    pub behavior: HostileBehavior,
    pub is_hostile: bool,
    #[serde(default)]
    pub true_label: TruthLabel,
    pub drone_type: String,
    pub armed: bool,
    #[serde(default)]
    pub size_class: SizeClass,
    /// Motion-limit overrides; defaults are derived from `drone_type`.
    #[serde(default)]
    pub config: Option<MotionLimits>,
    /// Orbit point for RECON behavior.
    #[serde(default)]
    pub target_position: Option<Position>,
}

/// A fully decoded scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub id: u64,
    pub name: String,
    pub seed: u64,
    pub drones: Vec<DroneSpec>,
    pub interceptor_count: u32,
    #[serde(default)]
    pub radar_config: RadarConfig,
    #[serde(default)]
    pub acoustic_config: AcousticConfig,
    /// Informational behavior mix recorded by the generator.
    #[serde(default)]
    pub behavior_distribution: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl ScenarioSpec {
    /// Look up a built-in preset by name or numeric id.
    pub fn preset(name: &str) -> Option<ScenarioSpec> {
        match name {
            "baseline_raid" | "1" => Some(Self::baseline_raid()),
            "mixed_traffic" | "2" => Some(Self::mixed_traffic()),
            "saturation" | "3" => Some(Self::saturation()),
            _ => None,
        }
    }

    /// Two armed hostiles inbound from the north-east, one interceptor.
    pub fn baseline_raid() -> ScenarioSpec {
        ScenarioSpec {
            id: 1,
            name: "baseline_raid".into(),
            seed: 12345,
            drones: vec![
                hostile_drone(Position::new(300.0, 300.0, 80.0), Velocity::new(-12.0, -12.0, 0.0)),
                hostile_drone(Position::new(450.0, 150.0, 60.0), Velocity::new(-14.0, -5.0, 0.0)),
            ],
            interceptor_count: 1,
            radar_config: RadarConfig::default(),
            acoustic_config: AcousticConfig::default(),
            behavior_distribution: None,
            metadata: None,
        }
    }

    /// One hostile mixed in with civil traffic — exercises classification.
    pub fn mixed_traffic() -> ScenarioSpec {
        ScenarioSpec {
            id: 2,
            name: "mixed_traffic".into(),
            seed: 24680,
            drones: vec![
                hostile_drone(Position::new(350.0, -200.0, 70.0), Velocity::new(-13.0, 8.0, 0.0)),
                DroneSpec {
                    position: Position::new(-250.0, 100.0, 90.0),
                    velocity: Velocity::new(8.0, -3.0, 0.0),
                    behavior: HostileBehavior::Normal,
                    is_hostile: false,
                    true_label: TruthLabel::Civil,
                    drone_type: "quad_camera".into(),
                    armed: false,
                    size_class: SizeClass::Small,
                    config: None,
                    target_position: None,
                },
                DroneSpec {
                    position: Position::new(200.0, 250.0, 110.0),
                    velocity: Velocity::new(-6.0, -7.0, 0.0),
                    behavior: HostileBehavior::Recon,
                    is_hostile: false,
                    true_label: TruthLabel::Unknown,
                    drone_type: "fixed_wing_survey".into(),
                    armed: false,
                    size_class: SizeClass::Medium,
                    config: None,
                    target_position: Some(Position::new(100.0, 100.0, 100.0)),
                },
            ],
            interceptor_count: 2,
            radar_config: RadarConfig::default(),
            acoustic_config: AcousticConfig::default(),
            behavior_distribution: None,
            metadata: None,
        }
    }

    /// Four simultaneous attackers against two interceptors.
    pub fn saturation() -> ScenarioSpec {
        let mut drones = vec![
            hostile_drone(Position::new(400.0, 0.0, 60.0), Velocity::new(-16.0, 0.0, 0.0)),
            hostile_drone(Position::new(0.0, 420.0, 70.0), Velocity::new(0.0, -15.0, 0.0)),
            hostile_drone(Position::new(-380.0, 120.0, 50.0), Velocity::new(14.0, -4.0, 0.0)),
        ];
        drones.push(DroneSpec {
            behavior: HostileBehavior::AttackRun,
            ..hostile_drone(Position::new(280.0, -280.0, 90.0), Velocity::new(-13.0, 13.0, 0.0))
        });
        ScenarioSpec {
            id: 3,
            name: "saturation".into(),
            seed: 13579,
            drones,
            interceptor_count: 2,
            radar_config: RadarConfig::default(),
            acoustic_config: AcousticConfig::default(),
            behavior_distribution: None,
            metadata: None,
        }
    }
}

fn hostile_drone(position: Position, velocity: Velocity) -> DroneSpec {
    DroneSpec {
        position,
        velocity,
        behavior: HostileBehavior::Normal,
        is_hostile: true,
        true_label: TruthLabel::Hostile,
        drone_type: "quad_attack".into(),
        armed: true,
        size_class: SizeClass::Small,
        config: None,
        target_position: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_json_round_trip() {
        let spec = ScenarioSpec::baseline_raid();
        let json = serde_json::to_string(&spec).unwrap();
        let back: ScenarioSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }

    #[test]
    fn test_scenario_decodes_minimal_drone() {
        let json = r#"{
            "id": 9, "name": "min", "seed": 1,
            "drones": [{
                "position": {"x": 100.0, "y": 0.0, "z": 50.0},
                "velocity": {"x": -5.0, "y": 0.0, "z": 0.0},
                "is_hostile": true,
                "drone_type": "quad_attack",
                "armed": false
            }],
            "interceptor_count": 1
        }"#;
        let spec: ScenarioSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.drones.len(), 1);
        assert_eq!(spec.drones[0].behavior, HostileBehavior::Normal);
        assert_eq!(spec.drones[0].true_label, TruthLabel::Unknown);
        assert_eq!(spec.radar_config, RadarConfig::default());
    }

    #[test]
    fn test_presets_resolve_by_name_and_id() {
        assert!(ScenarioSpec::preset("baseline_raid").is_some());
        assert!(ScenarioSpec::preset("2").is_some());
        assert!(ScenarioSpec::preset("nonexistent").is_none());
    }
}
