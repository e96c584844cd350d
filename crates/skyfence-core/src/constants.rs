//! Simulation constants and tuning parameters.

/// Simulation tick rate (Hz).
pub const TICK_RATE: u32 = 10;

/// Seconds per tick at the nominal rate.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

/// Minimum hostile altitude (meters). Hostiles never descend below this.
pub const MIN_HOSTILE_ALTITUDE: f64 = 10.0;

// --- Hostile behavior ---

/// Recon orbit radius around the designated point (meters).
pub const RECON_ORBIT_RADIUS: f64 = 100.0;

/// Extra slack beyond the orbit radius before a recon hostile starts circling.
pub const RECON_APPROACH_SLACK: f64 = 50.0;

/// Cruise-speed fraction used while transiting to a recon point.
pub const RECON_TRANSIT_SPEED_FACTOR: f64 = 0.7;

/// Target altitude during an attack run (meters).
pub const ATTACK_RUN_ALTITUDE: f64 = 50.0;

/// Climb-rate clamp during an attack run (m/s).
pub const ATTACK_RUN_CLIMB_LIMIT: f64 = 10.0;

/// Evasion break angle off the escape vector (degrees).
pub const EVADE_BREAK_ANGLE_DEG: f64 = 45.0;

/// Climb-rate magnitude while evading (m/s, sign randomized).
pub const EVADE_CLIMB_RATE: f64 = 5.0;

/// Acceleration multiplier while evading.
pub const EVADE_ACCEL_FACTOR: f64 = 2.0;

// --- Interceptor ---

/// Lift-off window before an interceptor starts pursuing (seconds).
pub const SCRAMBLE_DURATION_SECS: f64 = 2.0;

/// Range at which a method-less interceptor breaks off for visual
/// confirmation (meters).
pub const RECON_TRIGGER_RANGE: f64 = 150.0;

/// Interceptor recon orbit radius (meters).
pub const INTERCEPTOR_RECON_RADIUS: f64 = 120.0;

/// Minimum loiter time before the recon pass confirms (seconds).
pub const INTERCEPTOR_RECON_DURATION_SECS: f64 = 3.0;

/// Range at which a returning interceptor snaps to base and goes idle (meters).
pub const RETURN_SNAP_RANGE: f64 = 20.0;

/// Max-speed fraction on the return leg.
pub const RETURN_SPEED_FACTOR: f64 = 0.7;

/// Max-speed multiplier during a ram attack.
pub const RAM_SPEED_FACTOR: f64 = 1.2;

/// Max-speed fraction on a net approach.
pub const NET_SPEED_FACTOR: f64 = 0.8;

/// Gun attempts before the interceptor gives up.
pub const GUN_ATTEMPTS_CAP: u32 = 5;

/// Per-tick gun success scaling: p = method_rate * dt * this.
pub const GUN_ATTEMPT_RATE_SCALE: f64 = 2.0;

/// Jamming dwell required before the success draw (seconds).
pub const JAM_DURATION_REQUIRED_SECS: f64 = 5.0;

/// Pursuit wall after which the interceptor aborts with `timeout` (seconds).
pub const MAX_PURSUIT_SECS: f64 = 120.0;

// --- Interceptor performance ---

/// Interceptor speed ceiling (m/s).
pub const INTERCEPTOR_MAX_SPEED: f64 = 40.0;

/// Interceptor transit speed (m/s).
pub const INTERCEPTOR_CRUISE_SPEED: f64 = 30.0;

/// Interceptor acceleration limit (m/s²).
pub const INTERCEPTOR_ACCELERATION: f64 = 12.0;

/// Interceptor climb-rate limit (m/s).
pub const INTERCEPTOR_CLIMB_RATE: f64 = 15.0;

// --- Guidance ---

/// Target lead time for pure pursuit (seconds).
pub const PURSUIT_LEAD_TIME_SECS: f64 = 1.0;

/// Base navigation constant for PN.
pub const PN_NAVIGATION_CONSTANT: f64 = 3.0;

/// Adaptive navigation constant bounds for APN.
pub const APN_MIN_N: f64 = 2.0;
pub const APN_MAX_N: f64 = 6.0;

/// Maximum commanded turn rate (rad/s).
pub const GUIDANCE_MAX_TURN_RATE: f64 = 2.5;

/// Closing-speed floor used by PN (m/s).
pub const GUIDANCE_MIN_CLOSING_SPEED: f64 = 20.0;

/// Climb-rate clamp applied by every guidance law (m/s).
pub const GUIDANCE_CLIMB_LIMIT: f64 = 15.0;

/// Exponential smoothing factor for the APN target-acceleration estimate.
pub const APN_ACCEL_SMOOTHING: f64 = 0.3;

/// Estimated target acceleration magnitude cap (m/s²).
pub const APN_ACCEL_CAP: f64 = 15.0;

/// Weight on the target-acceleration augmentation term.
pub const APN_TARGET_ACCEL_WEIGHT: f64 = 0.5;

// --- Fusion ---

/// Existence probability clamp.
pub const EXISTENCE_MIN: f64 = 0.05;
pub const EXISTENCE_MAX: f64 = 0.99;

/// Existence below which a track is dropped.
pub const EXISTENCE_DROP_THRESHOLD: f64 = 0.1;

/// Existence decay per second with no supporting observations.
pub const EXISTENCE_DECAY_PER_SEC: f64 = 0.05;

/// Track drop timeout: seconds since last update.
pub const TRACK_TIMEOUT_SECS: f64 = 5.0;

/// Euclidean association gate (meters).
pub const MATCH_GATE_METERS: f64 = 60.0;

/// Bearing-only association gate (degrees).
pub const MATCH_GATE_BEARING_DEG: f64 = 25.0;

/// Scale converting a bearing difference (deg) into distance units for
/// bearing-only matching.
pub const BEARING_MATCH_SCALE: f64 = 10.0;

/// Per-sensor existence rates.
pub const EXISTENCE_RATE_RADAR: f64 = 0.55;
pub const EXISTENCE_RATE_ACOUSTIC: f64 = 0.4;
pub const EXISTENCE_RATE_EO: f64 = 0.7;

/// Multi-sensor synergy multipliers (≥2 sensors, all 3 sensors).
pub const SYNERGY_TWO_SENSORS: f64 = 1.2;
pub const SYNERGY_THREE_SENSORS: f64 = 1.3;

/// Existence bonus when EO reports HOSTILE with class confidence > 0.7.
pub const EO_HOSTILE_EXISTENCE_BONUS: f64 = 0.2;

/// Velocity blend factor toward the observed displacement.
pub const VELOCITY_BLEND_ALPHA: f64 = 0.3;

/// Position blend factor for bearing-only (acoustic) updates.
pub const BEARING_ONLY_BLEND: f64 = 0.3;

/// Minimum inter-observation gap before velocity is re-estimated (seconds).
pub const VELOCITY_ESTIMATE_MIN_DT: f64 = 0.05;

/// Assumed range when a track is created from a bearing-only observation
/// (meters).
pub const BEARING_ONLY_INITIAL_RANGE: f64 = 200.0;

/// Bounded position history length per track.
pub const TRACK_HISTORY_LEN: usize = 50;

/// EKF validity limits.
pub const EKF_MAX_PREDICTION_COUNT: u32 = 20;
pub const EKF_MAX_POSITION_VARIANCE: f64 = 100.0;

// --- Threat scoring ---

/// Speed thresholds feeding the threat-score speed bonus (m/s). Set well
/// above quadcopter cruise so only sprint-class targets trigger them.
pub const THREAT_SPEED_HIGH: f64 = 35.0;
pub const THREAT_SPEED_MID: f64 = 28.0;

/// Ticks of score history used for the dynamic derivative term.
pub const THREAT_DERIVATIVE_WINDOW: usize = 3;

/// Forward-prediction horizon for the dynamic trajectory term (seconds).
pub const THREAT_PREDICTION_HORIZON_SECS: f64 = 5.0;

/// Visibility duration before the persistence bonus starts (seconds).
pub const THREAT_PERSISTENCE_THRESHOLD_SECS: f64 = 10.0;

/// Seconds of additional visibility to reach the full persistence bonus.
pub const THREAT_PERSISTENCE_RAMP_SECS: f64 = 20.0;

// --- Engagement ---

/// FUSION policy thresholds.
pub const THREAT_ENGAGE_THRESHOLD: u32 = 70;
pub const EXIST_PROB_THRESHOLD: f64 = 0.7;
pub const MAX_ENGAGE_RANGE: f64 = 400.0;
pub const CIVIL_EXCLUDE_CONFIDENCE: f64 = 0.75;
pub const EXIST_PROB_ABORT_THRESHOLD: f64 = 0.3;
pub const THREAT_ABORT_THRESHOLD: u32 = 40;
pub const MIN_DECISION_INTERVAL_SECS: f64 = 2.0;
pub const MAX_CONCURRENT_ENGAGEMENTS: usize = 3;
pub const EVALUATION_INTERVAL_SECS: f64 = 0.5;

/// Abort range multiplier: abort when distance exceeds 1.5 × MAX_ENGAGE_RANGE.
pub const ABORT_RANGE_FACTOR: f64 = 1.5;

/// BASELINE policy parameters.
pub const BASELINE_ENGAGE_DISTANCE: f64 = 300.0;
pub const BASELINE_ENGAGE_PROBABILITY: f64 = 0.8;

// --- Scheduler ---

/// Sim-time cadence of `simulation_status` events (seconds).
pub const STATUS_EMIT_INTERVAL_SECS: f64 = 5.0;

/// Speed multiplier clamp.
pub const SPEED_MULTIPLIER_MIN: f64 = 0.1;
pub const SPEED_MULTIPLIER_MAX: f64 = 64.0;

// --- Ids ---

/// Synthetic ids for radar false alarms start here so they can never
/// collide with scenario drone ids.
pub const FALSE_ALARM_ID_BASE: u32 = 9000;
