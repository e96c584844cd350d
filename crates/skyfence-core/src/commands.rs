//! Inbound control commands.
//!
//! Commands arrive from the transport layer already decoded and are queued
//! for processing at the next tick boundary. Validation failures surface as
//! a `CommandError` value and a `command_rejected` event — never a panic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enums::{EngagementCommandState, InterceptMethod};

/// Simulation-control sub-action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Pause,
    Reset,
    SetSpeed,
}

/// Scenario reference: numeric id or name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScenarioRef {
    Number(u64),
    Name(String),
}

/// All inbound commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    SimulationControl {
        action: ControlAction,
        #[serde(default)]
        speed_multiplier: Option<f64>,
        #[serde(default)]
        scenario_id: Option<ScenarioRef>,
    },
    EngageCommand {
        drone_id: u32,
        method: InterceptMethod,
        #[serde(default)]
        interceptor_id: Option<u32>,
    },
    EngagementStateCommand {
        drone_id: u32,
        state: EngagementCommandState,
    },
    LaunchInterceptor {
        interceptor_id: u32,
        target_id: u32,
    },
    /// Opaque to the kernel; forwarded to the event log.
    ManualAction {
        action: String,
        #[serde(default)]
        target_id: Option<u32>,
        #[serde(default)]
        details: Option<serde_json::Value>,
    },
}

/// Why a command was refused. No state is mutated on any of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown drone id {0}")]
    UnknownDrone(u32),
    #[error("unknown interceptor id {0}")]
    UnknownInterceptor(u32),
    #[error("interceptor {0} is not idle")]
    InterceptorBusy(u32),
    #[error("no idle interceptor available")]
    NoIdleInterceptor,
    #[error("drone {0} is already neutralized")]
    TargetNeutralized(u32),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
    #[error("speed multiplier {0} out of range")]
    InvalidSpeed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let json = r#"{"type":"engage_command","drone_id":3,"method":"NET","interceptor_id":null}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            cmd,
            Command::EngageCommand {
                drone_id: 3,
                method: InterceptMethod::Net,
                interceptor_id: None,
            }
        );
    }

    #[test]
    fn test_simulation_control_with_scenario_name() {
        let json =
            r#"{"type":"simulation_control","action":"start","speed_multiplier":null,"scenario_id":"baseline_raid"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        match cmd {
            Command::SimulationControl {
                action, scenario_id, ..
            } => {
                assert_eq!(action, ControlAction::Start);
                assert_eq!(scenario_id, Some(ScenarioRef::Name("baseline_raid".into())));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_numeric_scenario_ref() {
        let json = r#"{"type":"simulation_control","action":"reset","speed_multiplier":null,"scenario_id":2}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        match cmd {
            Command::SimulationControl { scenario_id, .. } => {
                assert_eq!(scenario_id, Some(ScenarioRef::Number(2)));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
