//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Hostile flight behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostileBehavior {
    /// Cruise toward the base at cruise speed.
    #[default]
    Normal,
    /// Orbit a designated point.
    Recon,
    /// Sprint toward the base at max speed, low altitude.
    AttackRun,
    /// Break away from a pursuing interceptor.
    Evade,
}

/// Interceptor state machine states.
///
/// `STANDBY` and the legacy `LAUNCHING` are accepted on the wire as aliases
/// of `IDLE` and `SCRAMBLE` respectively; they are never emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterceptorState {
    #[default]
    #[serde(alias = "STANDBY")]
    Idle,
    #[serde(alias = "LAUNCHING")]
    Scramble,
    Pursuing,
    Recon,
    InterceptRam,
    InterceptGun,
    InterceptNet,
    InterceptJam,
    Returning,
    Neutralized,
}

impl InterceptorState {
    /// Whether this state represents an active chase against a target.
    pub fn is_pursuit(&self) -> bool {
        matches!(
            self,
            InterceptorState::Pursuing
                | InterceptorState::InterceptRam
                | InterceptorState::InterceptGun
                | InterceptorState::InterceptNet
                | InterceptorState::InterceptJam
        )
    }
}

/// Interception method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterceptMethod {
    Ram,
    Gun,
    Net,
    Jam,
}

/// Engagement envelope and success parameters for an intercept method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodProfile {
    pub min_distance: f64,
    pub max_distance: f64,
    pub base_success_rate: f64,
    pub speed_factor: f64,
    pub evade_penalty: f64,
}

impl InterceptMethod {
    /// The fixed method table driving intercept success and state gates.
    pub const fn profile(self) -> MethodProfile {
        match self {
            InterceptMethod::Ram => MethodProfile {
                min_distance: 0.0,
                max_distance: 30.0,
                base_success_rate: 0.70,
                speed_factor: 0.30,
                evade_penalty: 0.40,
            },
            InterceptMethod::Gun => MethodProfile {
                min_distance: 100.0,
                max_distance: 400.0,
                base_success_rate: 0.50,
                speed_factor: 0.20,
                evade_penalty: 0.30,
            },
            InterceptMethod::Net => MethodProfile {
                min_distance: 0.0,
                max_distance: 80.0,
                base_success_rate: 0.80,
                speed_factor: 0.40,
                evade_penalty: 0.50,
            },
            InterceptMethod::Jam => MethodProfile {
                min_distance: 50.0,
                max_distance: 300.0,
                base_success_rate: 0.60,
                speed_factor: 0.10,
                evade_penalty: 0.10,
            },
        }
    }

    /// The state the interceptor enters when it closes to engagement range.
    pub fn intercept_state(self) -> InterceptorState {
        match self {
            InterceptMethod::Ram => InterceptorState::InterceptRam,
            InterceptMethod::Gun => InterceptorState::InterceptGun,
            InterceptMethod::Net => InterceptorState::InterceptNet,
            InterceptMethod::Jam => InterceptorState::InterceptJam,
        }
    }
}

/// Ground-truth label carried by a hostile vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TruthLabel {
    Hostile,
    Civil,
    #[default]
    Unknown,
}

/// Track classification as reported by sensors and fusion.
///
/// `NEUTRAL` appears in one legacy log stream and is accepted as an alias
/// of `CIVIL`; the internal label set is exactly these four.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Hostile,
    Friendly,
    #[serde(alias = "NEUTRAL")]
    Civil,
    #[default]
    Unknown,
}

/// Which sensor (or the fusion layer itself) produced a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorKind {
    #[default]
    Radar,
    Acoustic,
    Eo,
}

/// Source attribution for a track's classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationSource {
    Radar,
    Acoustic,
    Eo,
    #[default]
    Fused,
}

/// Airframe size class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizeClass {
    #[default]
    Small,
    Medium,
    Large,
}

/// Acoustic activity state inferred from motion relative to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityState {
    Takeoff,
    Approach,
    Depart,
    Loiter,
    Hover,
    Idle,
}

/// Categorical threat level derived from the numeric threat score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    #[default]
    Info,
    Caution,
    Danger,
    Critical,
}

impl ThreatLevel {
    /// CRITICAL ≥ 80, DANGER ≥ 60, CAUTION ≥ 35, else INFO.
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 80 => ThreatLevel::Critical,
            s if s >= 60 => ThreatLevel::Danger,
            s if s >= 35 => ThreatLevel::Caution,
            _ => ThreatLevel::Info,
        }
    }
}

/// Behavior assessment derived from a track's motion relative to the base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehaviorAssessment {
    Approaching,
    Circling,
    Hovering,
    Departing,
    #[default]
    Unknown,
}

/// Guidance law selection for interceptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuidanceMode {
    PurePursuit,
    #[default]
    Pn,
    Apn,
}

/// Engagement decision policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagePolicy {
    /// Distance-only gate with a fixed commit probability.
    Baseline,
    /// Threat + classification + sensor-quality driven.
    #[default]
    Fusion,
}

/// Per-track engagement lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementState {
    #[default]
    Idle,
    Tracking,
    EngagePending,
    Engaging,
    Completed,
    Aborted,
}

/// Final disposition of an engagement record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementResult {
    Success,
    Fail,
    Aborted,
    #[default]
    Pending,
}

/// Operator-commanded per-target engagement posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngagementCommandState {
    Ignore,
    Track,
    EngagePrep,
    Engage,
}

/// Outcome of a single interceptor-versus-target attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterceptOutcome {
    Success,
    Miss,
    Evaded,
    Aborted,
}

/// Detailed failure mode of an unsuccessful intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptFailure {
    TargetLost,
    Evaded,
    CollisionAvoided,
    GunMissed,
    NetMissed,
    JamFailed,
    Timeout,
}

/// Why a fused track was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    LowExistence,
    Timeout,
    Neutralized,
}

/// Why an engagement was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbortReason {
    TargetLost,
    LowExistence,
    LowThreat,
    ReclassifiedCivil,
    OutOfRange,
    ManualAbort,
}

/// Track state estimator variant behind the fusion contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    #[default]
    WeightedMean,
    Ekf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_level_boundaries() {
        assert_eq!(ThreatLevel::from_score(80), ThreatLevel::Critical);
        assert_eq!(ThreatLevel::from_score(79), ThreatLevel::Danger);
        assert_eq!(ThreatLevel::from_score(60), ThreatLevel::Danger);
        assert_eq!(ThreatLevel::from_score(59), ThreatLevel::Caution);
        assert_eq!(ThreatLevel::from_score(35), ThreatLevel::Caution);
        assert_eq!(ThreatLevel::from_score(34), ThreatLevel::Info);
        assert_eq!(ThreatLevel::from_score(0), ThreatLevel::Info);
    }

    #[test]
    fn test_method_table_values() {
        let ram = InterceptMethod::Ram.profile();
        assert_eq!(ram.max_distance, 30.0);
        assert_eq!(ram.base_success_rate, 0.70);
        let gun = InterceptMethod::Gun.profile();
        assert_eq!(gun.min_distance, 100.0);
        assert_eq!(gun.max_distance, 400.0);
        let jam = InterceptMethod::Jam.profile();
        assert_eq!(jam.evade_penalty, 0.10);
    }

    #[test]
    fn test_launching_alias_deserializes_to_scramble() {
        let state: InterceptorState = serde_json::from_str("\"LAUNCHING\"").unwrap();
        assert_eq!(state, InterceptorState::Scramble);
        let state: InterceptorState = serde_json::from_str("\"STANDBY\"").unwrap();
        assert_eq!(state, InterceptorState::Idle);
    }

    #[test]
    fn test_neutral_alias_deserializes_to_civil() {
        let class: Classification = serde_json::from_str("\"NEUTRAL\"").unwrap();
        assert_eq!(class, Classification::Civil);
    }

    #[test]
    fn test_wire_names_are_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&HostileBehavior::AttackRun).unwrap(),
            "\"ATTACK_RUN\""
        );
        assert_eq!(
            serde_json::to_string(&InterceptorState::InterceptRam).unwrap(),
            "\"INTERCEPT_RAM\""
        );
        assert_eq!(
            serde_json::to_string(&GuidanceMode::PurePursuit).unwrap(),
            "\"PURE_PURSUIT\""
        );
    }
}
