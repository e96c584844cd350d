//! Outbound events emitted by the simulation kernel.
//!
//! Every event carries a `timestamp` in sim-time seconds. Within one tick
//! all timestamps are equal and never precede those of earlier ticks.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::observation::SensorObservation;
use crate::track::FusedTrack;
use crate::types::{Position, Velocity};

/// Running score kept by the engine and reported in status events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub hostiles_neutralized: u32,
    pub interceptors_launched: u32,
    pub intercepts_attempted: u32,
    pub tracks_created: u32,
    pub tracks_dropped: u32,
    pub false_alarms: u32,
}

/// All events crossing the outbound boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    DroneStateUpdate {
        timestamp: f64,
        drone_id: u32,
        position: Position,
        velocity: Velocity,
        behavior: HostileBehavior,
        is_evading: bool,
        is_neutralized: bool,
    },
    InterceptorUpdate {
        timestamp: f64,
        interceptor_id: u32,
        position: Position,
        velocity: Velocity,
        state: InterceptorState,
        target_id: Option<u32>,
        method: Option<InterceptMethod>,
    },
    InterceptResult {
        timestamp: f64,
        interceptor_id: u32,
        target_id: u32,
        result: InterceptOutcome,
        detail: Option<InterceptFailure>,
        method: Option<InterceptMethod>,
    },
    SimulationStatus {
        timestamp: f64,
        tick: u64,
        running: bool,
        speed_multiplier: f64,
        hostile_count: u32,
        interceptor_count: u32,
        track_count: u32,
        active_engagements: u32,
        score: ScoreSummary,
    },
    RadarDetection {
        timestamp: f64,
        observation: SensorObservation,
    },
    AudioDetection {
        timestamp: f64,
        observation: SensorObservation,
    },
    EoDetection {
        timestamp: f64,
        observation: SensorObservation,
    },
    FusedTrackUpdate {
        timestamp: f64,
        track: FusedTrack,
    },
    TrackCreated {
        timestamp: f64,
        track_id: u32,
        drone_id: Option<u32>,
        existence_prob: f64,
    },
    TrackDropped {
        timestamp: f64,
        track_id: u32,
        drone_id: Option<u32>,
        reason: DropReason,
        lifetime_secs: f64,
        final_existence: f64,
    },
    /// Opaque operator action, forwarded to the event log untouched.
    ManualAction {
        timestamp: f64,
        action: String,
        target_id: Option<u32>,
        details: Option<serde_json::Value>,
    },
    /// Error reply for a command the kernel refused.
    CommandRejected {
        timestamp: f64,
        reason: String,
    },
}

impl SimEvent {
    pub fn timestamp(&self) -> f64 {
        match self {
            SimEvent::DroneStateUpdate { timestamp, .. }
            | SimEvent::InterceptorUpdate { timestamp, .. }
            | SimEvent::InterceptResult { timestamp, .. }
            | SimEvent::SimulationStatus { timestamp, .. }
            | SimEvent::RadarDetection { timestamp, .. }
            | SimEvent::AudioDetection { timestamp, .. }
            | SimEvent::EoDetection { timestamp, .. }
            | SimEvent::FusedTrackUpdate { timestamp, .. }
            | SimEvent::TrackCreated { timestamp, .. }
            | SimEvent::TrackDropped { timestamp, .. }
            | SimEvent::ManualAction { timestamp, .. }
            | SimEvent::CommandRejected { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_tags() {
        let ev = SimEvent::TrackDropped {
            timestamp: 1.5,
            track_id: 3,
            drone_id: Some(7),
            reason: DropReason::LowExistence,
            lifetime_secs: 4.2,
            final_existence: 0.08,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"track_dropped\""));
        assert!(json.contains("\"reason\":\"low_existence\""));
    }

    #[test]
    fn test_event_round_trip() {
        let ev = SimEvent::InterceptResult {
            timestamp: 12.0,
            interceptor_id: 1,
            target_id: 4,
            result: InterceptOutcome::Evaded,
            detail: Some(InterceptFailure::Evaded),
            method: Some(InterceptMethod::Net),
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: SimEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(ev, back);
    }
}
