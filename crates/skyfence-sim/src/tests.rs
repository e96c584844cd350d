//! Engine-level tests: determinism, lifecycle round-trips, and the
//! end-to-end engagement scenarios.

use skyfence_core::commands::{Command, ControlAction};
use skyfence_core::components::MotionLimits;
use skyfence_core::config::KernelConfig;
use skyfence_core::enums::{
    Classification, HostileBehavior, InterceptFailure, InterceptMethod, InterceptOutcome,
    InterceptorState, SensorKind, SizeClass, ThreatLevel, TruthLabel,
};
use skyfence_core::events::SimEvent;
use skyfence_core::observation::{ObservationMeta, SensorObservation};
use skyfence_core::scenario::{DroneSpec, ScenarioSpec};
use skyfence_core::types::{Position, Velocity};

use crate::engine::{SimConfig, SimulationEngine};

const DT: f64 = 0.1;

fn drone(
    position: Position,
    velocity: Velocity,
    label: TruthLabel,
    armed: bool,
    drone_type: &str,
) -> DroneSpec {
    DroneSpec {
        position,
        velocity,
        behavior: HostileBehavior::Normal,
        is_hostile: label == TruthLabel::Hostile,
        true_label: label,
        drone_type: drone_type.into(),
        armed,
        size_class: SizeClass::Small,
        config: None,
        target_position: None,
    }
}

fn scenario(seed: u64, drones: Vec<DroneSpec>, interceptor_count: u32) -> ScenarioSpec {
    ScenarioSpec {
        id: 99,
        name: "test".into(),
        seed,
        drones,
        interceptor_count,
        radar_config: Default::default(),
        acoustic_config: Default::default(),
        behavior_distribution: None,
        metadata: None,
    }
}

/// Engine with all sensors and auto-engage switched off; tests opt back in.
fn quiet_engine(mut spec: ScenarioSpec) -> SimulationEngine {
    spec.radar_config.enabled = false;
    spec.acoustic_config.enabled = false;
    let mut kernel = KernelConfig::default();
    kernel.eo.enabled = false;
    kernel.auto_engage = false;
    let mut engine = SimulationEngine::new(SimConfig { seed: spec.seed, kernel });
    engine.load_scenario(spec);
    engine.start();
    engine
}

// ---- Determinism ----

#[test]
fn test_determinism_same_seed() {
    let run = || {
        let mut engine = SimulationEngine::new(SimConfig::default());
        engine.load_scenario(ScenarioSpec::baseline_raid());
        engine.start();
        let mut log = String::new();
        for _ in 0..150 {
            for event in engine.tick(DT) {
                log.push_str(&serde_json::to_string(&event).unwrap());
                log.push('\n');
            }
        }
        log
    };
    assert_eq!(run(), run(), "event stream diverged for identical seeds");
}

#[test]
fn test_determinism_different_seeds() {
    let run = |seed: u64| {
        let mut spec = ScenarioSpec::baseline_raid();
        spec.seed = seed;
        let mut engine = SimulationEngine::new(SimConfig::default());
        engine.load_scenario(spec);
        engine.start();
        let mut log = String::new();
        for _ in 0..150 {
            for event in engine.tick(DT) {
                log.push_str(&serde_json::to_string(&event).unwrap());
                log.push('\n');
            }
        }
        log
    };
    assert_ne!(run(1), run(2), "different seeds should diverge");
}

// ---- Lifecycle ----

#[test]
fn test_scenario_reset_round_trip() {
    let spec = ScenarioSpec::baseline_raid();

    let mut fresh = SimulationEngine::new(SimConfig::default());
    fresh.load_scenario(spec.clone());

    let mut used = SimulationEngine::new(SimConfig::default());
    used.load_scenario(spec.clone());
    used.start();
    for _ in 0..50 {
        used.tick(DT);
    }
    used.reset();

    assert_eq!(used.time().tick, 0);
    assert!(!used.is_running());
    assert_eq!(used.fusion().track_count(), 0);
    for id in 1..=spec.drones.len() as u32 {
        let a = fresh.hostile_state(id).unwrap();
        let b = used.hostile_state(id).unwrap();
        assert_eq!(a.behavior, b.behavior);
        assert!(!b.is_neutralized && !b.is_evading);
    }
    // Re-running after reset replays the same trace as a fresh engine.
    fresh.start();
    used.start();
    for _ in 0..30 {
        let a = fresh.tick(DT);
        let b = used.tick(DT);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}

#[test]
fn test_pause_blocks_time() {
    let mut engine = quiet_engine(scenario(
        1,
        vec![drone(
            Position::new(0.0, 300.0, 80.0),
            Velocity::new(0.0, -15.0, 0.0),
            TruthLabel::Hostile,
            true,
            "quad_attack",
        )],
        0,
    ));
    engine.tick(DT);
    let before = engine.time();
    engine.queue_command(Command::SimulationControl {
        action: ControlAction::Pause,
        speed_multiplier: None,
        scenario_id: None,
    });
    engine.tick(DT);
    engine.tick(DT);
    assert_eq!(engine.time().tick, before.tick);

    engine.queue_command(Command::SimulationControl {
        action: ControlAction::Start,
        speed_multiplier: None,
        scenario_id: None,
    });
    engine.tick(DT);
    assert_eq!(engine.time().tick, before.tick + 1);
}

#[test]
fn test_status_event_cadence() {
    let mut engine = quiet_engine(scenario(
        1,
        vec![drone(
            Position::new(0.0, 500.0, 80.0),
            Velocity::new(0.0, 0.0, 0.0),
            TruthLabel::Hostile,
            true,
            "quad_attack",
        )],
        0,
    ));
    let mut status_times = Vec::new();
    for _ in 0..120 {
        for event in engine.tick(DT) {
            if let SimEvent::SimulationStatus { timestamp, .. } = event {
                status_times.push(timestamp);
            }
        }
    }
    // 12 seconds of sim time: status at 5s and 10s.
    assert_eq!(status_times.len(), 2);
    assert!((status_times[0] - 5.0).abs() < 1e-6);
    assert!((status_times[1] - 10.0).abs() < 1e-6);
}

#[test]
fn test_speed_multiplier_set_and_clamped() {
    let mut engine = quiet_engine(scenario(1, vec![], 0));
    engine.queue_command(Command::SimulationControl {
        action: ControlAction::SetSpeed,
        speed_multiplier: Some(8.0),
        scenario_id: None,
    });
    engine.tick(DT);
    assert_eq!(engine.speed_multiplier(), 8.0);

    engine.queue_command(Command::SimulationControl {
        action: ControlAction::SetSpeed,
        speed_multiplier: Some(1e9),
        scenario_id: None,
    });
    engine.tick(DT);
    assert_eq!(
        engine.speed_multiplier(),
        skyfence_core::constants::SPEED_MULTIPLIER_MAX
    );
}

#[test]
fn test_invalid_commands_rejected_without_state_change() {
    let mut engine = quiet_engine(scenario(
        1,
        vec![drone(
            Position::new(0.0, 300.0, 80.0),
            Velocity::new(0.0, -15.0, 0.0),
            TruthLabel::Hostile,
            true,
            "quad_attack",
        )],
        1,
    ));

    // Unknown drone id.
    engine.queue_command(Command::EngageCommand {
        drone_id: 42,
        method: InterceptMethod::Ram,
        interceptor_id: None,
    });
    let events = engine.tick(DT);
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::CommandRejected { .. })));
    assert_eq!(
        engine.interceptor_status(1).unwrap().state,
        InterceptorState::Idle,
        "a rejected command must not move the interceptor"
    );

    // Busy interceptor.
    engine.queue_command(Command::EngageCommand {
        drone_id: 1,
        method: InterceptMethod::Ram,
        interceptor_id: Some(1),
    });
    engine.tick(DT);
    engine.queue_command(Command::EngageCommand {
        drone_id: 1,
        method: InterceptMethod::Net,
        interceptor_id: Some(1),
    });
    let events = engine.tick(DT);
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::CommandRejected { .. })));

    // Missing speed multiplier.
    engine.queue_command(Command::SimulationControl {
        action: ControlAction::SetSpeed,
        speed_multiplier: None,
        scenario_id: None,
    });
    let events = engine.tick(DT);
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::CommandRejected { .. })));
}

#[test]
fn test_neutralize_is_idempotent() {
    let mut engine = quiet_engine(scenario(
        1,
        vec![drone(
            Position::new(0.0, 300.0, 80.0),
            Velocity::new(0.0, -15.0, 0.0),
            TruthLabel::Hostile,
            true,
            "quad_attack",
        )],
        0,
    ));
    engine.neutralize_hostile(1);
    let once = engine.hostile_state(1).unwrap();
    engine.neutralize_hostile(1);
    let twice = engine.hostile_state(1).unwrap();
    assert!(once.is_neutralized);
    assert_eq!(once.is_neutralized, twice.is_neutralized);

    // Motion stays frozen.
    let before = engine.tick(DT);
    let _ = before;
    let state = engine.hostile_state(1).unwrap();
    assert!(state.is_neutralized);
}

#[test]
fn test_returning_interceptor_snaps_to_idle() {
    let mut engine = quiet_engine(scenario(1, vec![], 1));
    engine.force_interceptor_state(
        1,
        InterceptorState::Returning,
        None,
        Position::new(15.0, 0.0, 10.0),
        None,
    );
    engine.tick(DT);
    let status = engine.interceptor_status(1).unwrap();
    assert_eq!(status.state, InterceptorState::Idle);
    assert_eq!(status.target_id, None);
    assert_eq!(status.gun_attempts, 0);
    assert_eq!(status.jam_duration, 0.0);
}

// ---- Invariant sweep ----

#[test]
fn test_track_invariants_hold_over_long_run() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    engine.load_scenario(ScenarioSpec::saturation());
    engine.start();

    for _ in 0..300 {
        engine.tick(DT);
        for track in engine.fusion().tracks() {
            assert!(
                (0.05..=0.99).contains(&track.existence_prob),
                "existence out of bounds: {}",
                track.existence_prob
            );
            assert!(track.threat_score <= 100);
            assert!((0.0..=1.0).contains(&track.quality));
            if let Some(drone_id) = track.drone_id {
                let looked_up = engine.fusion().track_by_drone(drone_id).unwrap();
                assert_eq!(looked_up.track_id, track.track_id, "lookup out of sync");
            }
        }
        assert!(
            engine.engagement_manager().engaging_track_ids().len()
                <= engine.engagement_manager().config().max_concurrent_engagements,
            "concurrency cap violated"
        );
    }
}

// ---- End-to-end scenarios ----

/// An approaching hostile is flagged DANGER within three seconds on radar
/// alone.
#[test]
fn test_approaching_hostile_flagged_danger() {
    let mut spec = scenario(
        12345,
        vec![drone(
            Position::new(300.0, 300.0, 80.0),
            Velocity::new(-15.0, -15.0, 0.0),
            TruthLabel::Hostile,
            true,
            "quad_attack",
        )],
        0,
    );
    spec.acoustic_config.enabled = false;
    let mut kernel = KernelConfig::default();
    kernel.eo.enabled = false;
    kernel.auto_engage = false;
    let mut engine = SimulationEngine::new(SimConfig { seed: 12345, kernel });
    engine.load_scenario(spec);
    engine.start();

    for _ in 0..30 {
        engine.tick(DT);
    }

    assert_eq!(engine.fusion().track_count(), 1, "exactly one track");
    let track = engine.fusion().track_by_drone(1).expect("hostile tracked");
    assert!(track.existence_prob > 0.7, "existence {}", track.existence_prob);
    assert!(track.threat_score >= 60, "threat {}", track.threat_score);
    assert_eq!(track.threat_level, ThreatLevel::Danger);
}

/// A civil aircraft confirmed by EO is never left in an ENGAGING state and
/// ends up classified CIVIL with high confidence.
#[test]
fn test_civil_with_eo_confirmation_not_engaged() {
    let mut spec = scenario(
        12345,
        vec![drone(
            Position::new(200.0, 0.0, 60.0),
            Velocity::new(-10.0, 0.0, 0.0),
            TruthLabel::Civil,
            false,
            "quad_camera",
        )],
        1,
    );
    spec.acoustic_config.enabled = false;
    let mut engine = SimulationEngine::new(SimConfig {
        seed: 12345,
        kernel: KernelConfig::default(),
    });
    engine.load_scenario(spec);
    engine.start();

    for _ in 0..60 {
        engine.tick(DT);
    }

    assert!(
        engine.engagement_manager().engaging_track_ids().is_empty(),
        "no engagement may remain active against the civil target"
    );
    let track = engine.fusion().track_by_drone(1).expect("civil tracked");
    assert_eq!(track.classification.classification, Classification::Civil);
    assert!(
        track.classification.confidence >= 0.75,
        "confidence {}",
        track.classification.confidence
    );
}

/// RAM intercepts succeed at roughly the method table's base rate.
#[test]
fn test_ram_intercept_success_rate() {
    let mut successes = 0u32;
    let mut ram_state_seen = false;
    let seeds = 100u64;

    for seed in 0..seeds {
        let mut engine = quiet_engine(scenario(
            seed,
            vec![drone(
                Position::new(200.0, 0.0, 80.0),
                Velocity::new(0.0, 0.0, 0.0),
                TruthLabel::Hostile,
                true,
                "quad_attack",
            )],
            1,
        ));
        engine.queue_command(Command::EngageCommand {
            drone_id: 1,
            method: InterceptMethod::Ram,
            interceptor_id: None,
        });

        'ticks: for _ in 0..400 {
            let events = engine.tick(DT);
            if engine.interceptor_status(1).unwrap().state == InterceptorState::InterceptRam {
                ram_state_seen = true;
            }
            for event in events {
                if let SimEvent::InterceptResult { result, .. } = event {
                    match result {
                        InterceptOutcome::Success => {
                            successes += 1;
                            break 'ticks;
                        }
                        InterceptOutcome::Miss | InterceptOutcome::Evaded => break 'ticks,
                        InterceptOutcome::Aborted => break 'ticks,
                    }
                }
            }
        }
    }

    assert!(ram_state_seen, "INTERCEPT_RAM must be observable");
    let rate = successes as f64 / seeds as f64;
    assert!(
        (0.55..=0.85).contains(&rate),
        "RAM success rate {rate} outside [0.55, 0.85]"
    );
}

/// Jamming needs sustained in-band dwell; no success can land before the
/// scramble window plus the required dwell.
#[test]
fn test_jam_requires_sustained_proximity() {
    let mut engine = quiet_engine(scenario(
        7,
        vec![drone(
            Position::new(150.0, 150.0, 60.0),
            Velocity::new(-10.0, -10.0, 0.0),
            TruthLabel::Hostile,
            true,
            "quad_attack",
        )],
        1,
    ));
    engine.queue_command(Command::EngageCommand {
        drone_id: 1,
        method: InterceptMethod::Jam,
        interceptor_id: None,
    });

    let mut last_jam = 0.0;
    let mut terminal: Option<(f64, InterceptOutcome, Option<InterceptFailure>)> = None;

    'ticks: for _ in 0..200 {
        let events = engine.tick(DT);
        let status = engine.interceptor_status(1).unwrap();
        if status.state == InterceptorState::InterceptJam {
            assert!(
                status.jam_duration >= last_jam,
                "jam duration must grow monotonically in band"
            );
            last_jam = status.jam_duration;
        }
        for event in events {
            if let SimEvent::InterceptResult {
                timestamp,
                result,
                detail,
                ..
            } = event
            {
                terminal = Some((timestamp, result, detail));
                break 'ticks;
            }
        }
    }

    let (timestamp, result, detail) = terminal.expect("jam attempt must resolve");
    let earliest = skyfence_core::constants::SCRAMBLE_DURATION_SECS
        + skyfence_core::constants::JAM_DURATION_REQUIRED_SECS;
    assert!(
        timestamp >= earliest,
        "jam resolved at {timestamp:.1}s, before {earliest:.1}s"
    );
    // The dwell counter survives until the interceptor is home again.
    assert!(
        engine.interceptor_status(1).unwrap().jam_duration
            >= skyfence_core::constants::JAM_DURATION_REQUIRED_SECS - 1e-9
    );
    match result {
        InterceptOutcome::Success => assert_eq!(detail, None),
        InterceptOutcome::Miss => assert_eq!(detail, Some(InterceptFailure::JamFailed)),
        other => panic!("unexpected jam outcome {other:?}"),
    }
}

/// Evasion flips on when a pursuer closes inside the trigger distance and
/// off once the pursuer is gone.
#[test]
fn test_evasion_flips_on_proximity_and_off_on_withdrawal() {
    let mut engine = quiet_engine(scenario(
        3,
        vec![drone(
            Position::new(100.0, 0.0, 80.0),
            Velocity::new(-15.0, 0.0, 0.0),
            TruthLabel::Hostile,
            true,
            "quad_attack",
        )],
        1,
    ));
    engine.force_interceptor_state(
        1,
        InterceptorState::Pursuing,
        Some(1),
        Position::new(60.0, 0.0, 80.0),
        Some(InterceptMethod::Ram),
    );

    let mut evading_within = None;
    for tick in 1..=3 {
        engine.tick(DT);
        let state = engine.hostile_state(1).unwrap();
        if state.is_evading {
            assert_eq!(state.behavior, HostileBehavior::Evade);
            evading_within = Some(tick);
            break;
        }
    }
    assert!(evading_within.is_some(), "evasion must engage within 3 ticks");

    engine.remove_interceptor(1);

    let mut reverted_within = None;
    for tick in 1..=3 {
        engine.tick(DT);
        let state = engine.hostile_state(1).unwrap();
        if !state.is_evading {
            assert_eq!(state.behavior, HostileBehavior::Normal);
            reverted_within = Some(tick);
            break;
        }
    }
    assert!(reverted_within.is_some(), "evasion must clear within 3 ticks");
}

/// A radar false alarm creates a short-lived track that dies without
/// reinforcement.
#[test]
fn test_false_alarm_track_drops_quickly() {
    let mut engine = quiet_engine(scenario(5, vec![], 0));

    let obs = SensorObservation {
        sensor: SensorKind::Radar,
        time: 0.0,
        drone_id: Some(9001),
        bearing_deg: Some(45.0),
        range: Some(400.0),
        altitude: Some(60.0),
        confidence: 0.3,
        classification: None,
        class_confidence: None,
        meta: ObservationMeta {
            is_false_alarm: true,
            ..ObservationMeta::default()
        },
    };
    let outcome = engine.fusion_mut().ingest(&obs, 0.0);
    assert!(outcome.created);
    assert!(engine.fusion().track(outcome.track_id).unwrap().existence_prob <= 0.5);

    let mut dropped = None;
    for _ in 0..10 {
        for event in engine.tick(DT) {
            if let SimEvent::TrackDropped {
                track_id, reason, ..
            } = event
            {
                if track_id == outcome.track_id {
                    dropped = Some(reason);
                }
            }
        }
    }
    let reason = dropped.expect("false-alarm track must drop within 10 ticks");
    assert!(matches!(
        reason,
        skyfence_core::enums::DropReason::LowExistence
            | skyfence_core::enums::DropReason::Timeout
    ));
}

/// The RAM envelope boundary: eligible at exactly max_distance, not one
/// meter beyond.
#[test]
fn test_ram_envelope_boundary() {
    let frozen = MotionLimits {
        max_speed: 0.0,
        cruise_speed: 0.0,
        acceleration: 0.0,
        turn_rate: 0.0,
        climb_rate: 0.0,
        evasion_trigger_distance: 0.0,
        evasion_maneuver_strength: 0.0,
    };

    let mut at_limit = drone(
        Position::new(130.0, 0.0, 30.0),
        Velocity::default(),
        TruthLabel::Hostile,
        true,
        "quad_attack",
    );
    at_limit.config = Some(frozen);
    let mut engine = quiet_engine(scenario(2, vec![at_limit], 1));
    engine.force_interceptor_state(
        1,
        InterceptorState::Pursuing,
        Some(1),
        Position::new(100.0, 0.0, 30.0),
        Some(InterceptMethod::Ram),
    );
    engine.tick(DT);
    assert_eq!(
        engine.interceptor_status(1).unwrap().state,
        InterceptorState::InterceptRam,
        "exactly max_distance is in the envelope"
    );

    let mut beyond = drone(
        Position::new(131.0, 0.0, 30.0),
        Velocity::default(),
        TruthLabel::Hostile,
        true,
        "quad_attack",
    );
    beyond.config = Some(frozen);
    let mut engine = quiet_engine(scenario(2, vec![beyond], 1));
    engine.force_interceptor_state(
        1,
        InterceptorState::Pursuing,
        Some(1),
        Position::new(100.0, 0.0, 30.0),
        Some(InterceptMethod::Ram),
    );
    engine.tick(DT);
    assert_eq!(
        engine.interceptor_status(1).unwrap().state,
        InterceptorState::Pursuing,
        "one meter beyond stays out of the envelope"
    );
}

/// Manual engage launches an interceptor through SCRAMBLE.
#[test]
fn test_manual_engage_scrambles_interceptor() {
    let mut engine = quiet_engine(scenario(
        11,
        vec![drone(
            Position::new(0.0, 300.0, 80.0),
            Velocity::new(0.0, -15.0, 0.0),
            TruthLabel::Hostile,
            true,
            "quad_attack",
        )],
        1,
    ));
    engine.queue_command(Command::EngageCommand {
        drone_id: 1,
        method: InterceptMethod::Net,
        interceptor_id: None,
    });
    engine.tick(DT);
    let status = engine.interceptor_status(1).unwrap();
    assert_eq!(status.state, InterceptorState::Scramble);
    assert_eq!(status.target_id, Some(1));
    assert_eq!(status.method, Some(InterceptMethod::Net));

    // After the scramble window the interceptor transitions to pursuit.
    for _ in 0..25 {
        engine.tick(DT);
    }
    let status = engine.interceptor_status(1).unwrap();
    assert!(
        status.state == InterceptorState::Pursuing
            || status.state == InterceptorState::InterceptNet,
        "expected pursuit after scramble, got {:?}",
        status.state
    );
}

/// A recon-only sortie confirms visually and emits an EO observation.
#[test]
fn test_recon_sortie_confirms_and_returns() {
    let hostile_pos = Position::new(120.0, 0.0, 60.0);
    let frozen = MotionLimits {
        max_speed: 0.0,
        cruise_speed: 0.0,
        acceleration: 0.0,
        turn_rate: 0.0,
        climb_rate: 0.0,
        evasion_trigger_distance: 0.0,
        evasion_maneuver_strength: 0.0,
    };
    let mut target = drone(
        hostile_pos,
        Velocity::default(),
        TruthLabel::Hostile,
        true,
        "quad_attack",
    );
    target.config = Some(frozen);

    let mut engine = quiet_engine(scenario(21, vec![target], 1));
    engine.queue_command(Command::LaunchInterceptor {
        interceptor_id: 1,
        target_id: 1,
    });

    let mut saw_recon = false;
    let mut eo_confirmation = None;
    for _ in 0..300 {
        let events = engine.tick(DT);
        let status = engine.interceptor_status(1).unwrap();
        if status.state == InterceptorState::Recon {
            saw_recon = true;
        }
        for event in events {
            if let SimEvent::EoDetection { observation, .. } = event {
                eo_confirmation = Some(observation);
            }
        }
        if status.state == InterceptorState::Idle && saw_recon {
            break;
        }
    }

    assert!(saw_recon, "method-less sortie must loiter in RECON");
    let obs = eo_confirmation.expect("recon must emit an EO confirmation");
    assert_eq!(obs.sensor, SensorKind::Eo);
    assert_eq!(obs.drone_id, Some(1));
    assert!(obs.confidence >= 0.9);
    assert!(obs.classification.is_some());
    let status = engine.interceptor_status(1).unwrap();
    assert!(status.eo_confirmed || status.state == InterceptorState::Idle);
}
