//! Simulation engine — the kernel of the system.
//!
//! `SimulationEngine` owns the hecs world, the id → entity lookups, the
//! sensors, the fusion center and the engagement manager. Completely
//! headless: commands are queued in, `tick(dt)` advances everything in a
//! fixed order and returns the events emitted during that tick. The host
//! decides the wall-clock pacing.

use std::collections::{HashMap, VecDeque};

use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use skyfence_core::commands::{Command, CommandError, ControlAction, ScenarioRef};
use skyfence_core::components::{
    GroundTruth, GuidanceUnit, Hostile, HostileState, InterceptorStatus,
};
use skyfence_core::config::KernelConfig;
use skyfence_core::constants::*;
use skyfence_core::enums::{
    AbortReason, InterceptMethod, InterceptOutcome, InterceptorState, SensorKind,
};
use skyfence_core::events::{ScoreSummary, SimEvent};
use skyfence_core::observation::SensorObservation;
use skyfence_core::scenario::ScenarioSpec;
use skyfence_core::track::FusedTrack;
use skyfence_core::types::{Position, SimTime, Velocity};

use crate::engagement::EngagementManager;
use crate::fusion::FusionCenter;
use crate::sensors::{acoustic::AcousticSensor, eo::EoSensor, radar::RadarSensor, SensorTarget};
use crate::systems;
use crate::systems::interceptor::InterceptReport;
use crate::threat::{self, DynamicScorer};
use crate::world_setup;

/// Configuration for a new simulation instance.
#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    /// RNG seed used until a scenario (with its own seed) is loaded.
    pub seed: u64,
    pub kernel: KernelConfig,
}

/// The simulation engine. Owns all kernel state.
pub struct SimulationEngine {
    world: World,
    time: SimTime,
    running: bool,
    speed_multiplier: f64,
    base_pos: Position,
    hostiles: HashMap<u32, Entity>,
    interceptors: HashMap<u32, Entity>,
    radar: RadarSensor,
    acoustic: AcousticSensor,
    eo: EoSensor,
    fusion: FusionCenter,
    threat_scorer: DynamicScorer,
    engagement: EngagementManager,
    rng: ChaCha8Rng,
    command_queue: VecDeque<Command>,
    events: Vec<SimEvent>,
    score: ScoreSummary,
    scenario: Option<ScenarioSpec>,
    config: KernelConfig,
    next_status_time: f64,
}

impl SimulationEngine {
    pub fn new(config: SimConfig) -> Self {
        let base_pos = Position::default();
        let kernel = config.kernel;
        Self {
            world: World::new(),
            time: SimTime::default(),
            running: false,
            speed_multiplier: 1.0,
            base_pos,
            hostiles: HashMap::new(),
            interceptors: HashMap::new(),
            radar: RadarSensor::new(Default::default(), base_pos),
            acoustic: AcousticSensor::new(Default::default(), base_pos),
            eo: EoSensor::new(kernel.eo.clone(), base_pos),
            fusion: FusionCenter::new(kernel.fusion.clone(), base_pos),
            threat_scorer: DynamicScorer::new(),
            engagement: EngagementManager::new(kernel.engagement.clone()),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            command_queue: VecDeque::new(),
            events: Vec::new(),
            score: ScoreSummary::default(),
            scenario: None,
            config: kernel,
            next_status_time: STATUS_EMIT_INTERVAL_SECS,
        }
    }

    // --- Control surface ---

    /// Load a fully decoded scenario and rebuild the world from it.
    pub fn load_scenario(&mut self, spec: ScenarioSpec) {
        info!(scenario = %spec.name, seed = spec.seed, "loading scenario");
        self.scenario = Some(spec);
        self.install_scenario();
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Synchronous: no tick runs after this returns.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Pause, discard all in-flight state, and restore the loaded
    /// scenario's initial world. Active engagements abort with
    /// MANUAL_ABORT first.
    pub fn reset(&mut self) {
        let now = self.time.elapsed_secs;
        self.engagement.abort_all(AbortReason::ManualAbort, now);
        self.running = false;
        self.install_scenario();
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f64) {
        self.speed_multiplier = multiplier.clamp(SPEED_MULTIPLIER_MIN, SPEED_MULTIPLIER_MAX);
    }

    /// Queue a command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: Command) {
        self.command_queue.push_back(command);
    }

    // --- Accessors ---

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn tick_interval(&self) -> f64 {
        self.config.tick_interval
    }

    pub fn base_pos(&self) -> Position {
        self.base_pos
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn fusion(&self) -> &FusionCenter {
        &self.fusion
    }

    pub fn engagement_manager(&self) -> &EngagementManager {
        &self.engagement
    }

    pub fn score(&self) -> &ScoreSummary {
        &self.score
    }

    pub fn hostile_state(&self, drone_id: u32) -> Option<HostileState> {
        let entity = *self.hostiles.get(&drone_id)?;
        self.world
            .get::<&HostileState>(entity)
            .ok()
            .map(|state| HostileState::clone(&state))
    }

    pub fn interceptor_status(&self, interceptor_id: u32) -> Option<InterceptorStatus> {
        let entity = *self.interceptors.get(&interceptor_id)?;
        self.world
            .get::<&InterceptorStatus>(entity)
            .ok()
            .map(|status| InterceptorStatus::clone(&status))
    }

    // --- Tick ---

    /// Advance the simulation by `dt` seconds and return the events
    /// emitted during the tick. When paused, only queued commands are
    /// processed.
    pub fn tick(&mut self, dt: f64) -> Vec<SimEvent> {
        self.process_commands();

        if self.running {
            self.time.advance(dt);
            let now = self.time.elapsed_secs;

            systems::hostile_motion::run(&mut self.world, &self.base_pos, dt, &mut self.rng);
            self.sync_evasion_flags();

            let intercept_out = systems::interceptor::run(
                &mut self.world,
                &self.base_pos,
                now,
                dt,
                &self.eo,
                &mut self.rng,
            );
            self.apply_intercept_reports(&intercept_out.reports, now);

            self.run_sensors(now, intercept_out.recon_observations);

            let drops = self.fusion.decay(now);
            for drop in drops {
                self.threat_scorer.clear(drop.track_id);
                self.score.tracks_dropped += 1;
                self.events.push(SimEvent::TrackDropped {
                    timestamp: now,
                    track_id: drop.track_id,
                    drone_id: drop.drone_id,
                    reason: drop.reason,
                    lifetime_secs: drop.lifetime_secs,
                    final_existence: drop.final_existence,
                });
            }

            self.update_threat_scores(now);

            if self.config.auto_engage {
                self.run_engagement(now);
            }
            self.check_aborts(now);

            self.emit_vehicle_updates(now);

            if now + 1e-9 >= self.next_status_time {
                self.emit_status(now);
                self.next_status_time += STATUS_EMIT_INTERVAL_SECS;
            }
        }

        std::mem::take(&mut self.events)
    }

    // --- Scenario install ---

    fn install_scenario(&mut self) {
        self.world = World::new();
        self.hostiles.clear();
        self.interceptors.clear();
        self.time = SimTime::default();
        self.score = ScoreSummary::default();
        self.threat_scorer.reset();
        self.engagement = EngagementManager::new(self.config.engagement.clone());
        self.fusion = FusionCenter::new(self.config.fusion.clone(), self.base_pos);
        self.eo = EoSensor::new(self.config.eo.clone(), self.base_pos);
        self.next_status_time = STATUS_EMIT_INTERVAL_SECS;

        match &self.scenario {
            Some(spec) => {
                self.rng = ChaCha8Rng::seed_from_u64(spec.seed);
                self.radar = RadarSensor::new(spec.radar_config.clone(), self.base_pos);
                self.acoustic = AcousticSensor::new(spec.acoustic_config.clone(), self.base_pos);
                let (hostiles, interceptors) = world_setup::build_world(
                    &mut self.world,
                    spec,
                    &self.base_pos,
                    self.config.guidance_mode,
                );
                self.hostiles = hostiles;
                self.interceptors = interceptors;
            }
            None => {
                self.radar = RadarSensor::new(Default::default(), self.base_pos);
                self.acoustic = AcousticSensor::new(Default::default(), self.base_pos);
            }
        }
    }

    // --- Command handling ---

    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            if let Err(err) = self.handle_command(command) {
                warn!(%err, "command rejected");
                self.events.push(SimEvent::CommandRejected {
                    timestamp: self.time.elapsed_secs,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Result<(), CommandError> {
        let now = self.time.elapsed_secs;
        match command {
            Command::SimulationControl {
                action,
                speed_multiplier,
                scenario_id,
            } => match action {
                ControlAction::Start => {
                    if let Some(reference) = scenario_id {
                        let spec = resolve_scenario(&reference)?;
                        self.load_scenario(spec);
                    }
                    self.start();
                    Ok(())
                }
                ControlAction::Pause => {
                    self.pause();
                    Ok(())
                }
                ControlAction::Reset => {
                    self.reset();
                    Ok(())
                }
                ControlAction::SetSpeed => match speed_multiplier {
                    Some(multiplier) if multiplier.is_finite() && multiplier > 0.0 => {
                        self.set_speed_multiplier(multiplier);
                        Ok(())
                    }
                    Some(bad) => Err(CommandError::InvalidSpeed(format!("{bad}"))),
                    None => Err(CommandError::MissingField("speed_multiplier")),
                },
            },

            Command::EngageCommand {
                drone_id,
                method,
                interceptor_id,
            } => {
                let hostile = self
                    .hostile_state(drone_id)
                    .ok_or(CommandError::UnknownDrone(drone_id))?;
                if hostile.is_neutralized {
                    return Err(CommandError::TargetNeutralized(drone_id));
                }
                let interceptor_id = self.pick_interceptor(interceptor_id)?;
                self.launch(interceptor_id, drone_id, Some(method), now)?;
                self.record_manual_engagement(drone_id, interceptor_id, now);
                Ok(())
            }

            Command::EngagementStateCommand { drone_id, state } => {
                if !self.hostiles.contains_key(&drone_id)
                    && self.fusion.track_by_drone(drone_id).is_none()
                {
                    return Err(CommandError::UnknownDrone(drone_id));
                }
                self.engagement.set_manual_state(drone_id, state);
                Ok(())
            }

            Command::LaunchInterceptor {
                interceptor_id,
                target_id,
            } => {
                if !self.hostiles.contains_key(&target_id) {
                    return Err(CommandError::UnknownDrone(target_id));
                }
                self.interceptor_status(interceptor_id)
                    .ok_or(CommandError::UnknownInterceptor(interceptor_id))?;
                self.launch(interceptor_id, target_id, None, now)
            }

            Command::ManualAction {
                action,
                target_id,
                details,
            } => {
                self.events.push(SimEvent::ManualAction {
                    timestamp: now,
                    action,
                    target_id,
                    details,
                });
                Ok(())
            }
        }
    }

    fn pick_interceptor(&self, requested: Option<u32>) -> Result<u32, CommandError> {
        match requested {
            Some(id) => {
                let status = self
                    .interceptor_status(id)
                    .ok_or(CommandError::UnknownInterceptor(id))?;
                if status.state != InterceptorState::Idle {
                    return Err(CommandError::InterceptorBusy(id));
                }
                Ok(id)
            }
            None => self
                .first_idle_interceptor()
                .ok_or(CommandError::NoIdleInterceptor),
        }
    }

    fn first_idle_interceptor(&self) -> Option<u32> {
        let mut ids: Vec<u32> = self.interceptors.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().find(|id| {
            self.interceptor_status(*id)
                .map(|status| status.state == InterceptorState::Idle)
                .unwrap_or(false)
        })
    }

    fn launch(
        &mut self,
        interceptor_id: u32,
        target_id: u32,
        method: Option<InterceptMethod>,
        now: f64,
    ) -> Result<(), CommandError> {
        let entity = *self
            .interceptors
            .get(&interceptor_id)
            .ok_or(CommandError::UnknownInterceptor(interceptor_id))?;

        {
            let mut status = self
                .world
                .get::<&mut InterceptorStatus>(entity)
                .map_err(|_| CommandError::UnknownInterceptor(interceptor_id))?;
            if status.state != InterceptorState::Idle {
                return Err(CommandError::InterceptorBusy(interceptor_id));
            }
            status.state = InterceptorState::Scramble;
            status.target_id = Some(target_id);
            status.launch_time = now;
            status.method = method;
            status.clear_engagement_counters();
        }
        if let Ok(mut unit) = self.world.get::<&mut GuidanceUnit>(entity) {
            unit.state.reset();
        }
        info!(interceptor_id, target_id, ?method, "interceptor launched");
        Ok(())
    }

    fn record_manual_engagement(&mut self, drone_id: u32, interceptor_id: u32, now: f64) {
        if let Some(track) = self.fusion.track_by_drone(drone_id) {
            self.engagement
                .start_engagement(track, interceptor_id, "manual engage", &self.base_pos, now);
        }
    }

    // --- Tick phases ---

    fn sync_evasion_flags(&mut self) {
        let mut flags: Vec<(u32, bool)> = Vec::new();
        for (_entity, (_marker, state)) in self.world.query::<(&Hostile, &HostileState)>().iter() {
            flags.push((state.id, state.is_evading));
        }
        for (id, evading) in flags {
            self.fusion.set_track_evading(id, evading);
        }
    }

    fn apply_intercept_reports(&mut self, reports: &[InterceptReport], now: f64) {
        for report in reports {
            match report.outcome {
                InterceptOutcome::Success => {
                    self.score.intercepts_attempted += 1;
                    self.score.hostiles_neutralized += 1;
                    self.neutralize_hostile(report.target_id);
                    self.fusion.set_track_neutralized(report.target_id, true);
                    if let Some(track_id) = self.track_id_for_drone(report.target_id) {
                        self.engagement.complete_engagement(track_id, true, now);
                    }
                }
                InterceptOutcome::Miss | InterceptOutcome::Evaded => {
                    self.score.intercepts_attempted += 1;
                    if let Some(track_id) = self.track_id_for_drone(report.target_id) {
                        self.engagement.complete_engagement(track_id, false, now);
                    }
                }
                InterceptOutcome::Aborted => {
                    if let Some(track_id) = self.track_id_for_drone(report.target_id) {
                        self.engagement
                            .abort_engagement(track_id, AbortReason::TargetLost, now);
                    }
                }
            }

            self.events.push(SimEvent::InterceptResult {
                timestamp: now,
                interceptor_id: report.interceptor_id,
                target_id: report.target_id,
                result: report.outcome,
                detail: report.detail,
                method: report.method,
            });
        }
    }

    pub(crate) fn neutralize_hostile(&mut self, drone_id: u32) {
        if let Some(entity) = self.hostiles.get(&drone_id) {
            if let Ok(mut state) = self.world.get::<&mut HostileState>(*entity) {
                if state.is_neutralized {
                    return;
                }
                state.is_neutralized = true;
                state.is_evading = false;
            }
            if let Ok(mut vel) = self.world.get::<&mut Velocity>(*entity) {
                *vel = Velocity::default();
            }
        }
    }

    fn track_id_for_drone(&self, drone_id: u32) -> Option<u32> {
        self.fusion.track_by_drone(drone_id).map(|t| t.track_id)
    }

    fn run_sensors(&mut self, now: f64, recon_observations: Vec<SensorObservation>) {
        // Owned snapshot of every hostile, id-sorted so sensor rng draws
        // are ordered deterministically.
        let mut snapshot: Vec<(u32, Position, Velocity, bool, GroundTruth)> = self
            .world
            .query::<(&Hostile, &HostileState, &GroundTruth, &Position, &Velocity)>()
            .iter()
            .map(|(_, (_, state, truth, pos, vel))| {
                (state.id, *pos, *vel, state.is_neutralized, truth.clone())
            })
            .collect();
        snapshot.sort_by_key(|(id, ..)| *id);

        let targets: Vec<SensorTarget<'_>> = snapshot
            .iter()
            .map(|(id, pos, vel, neutralized, truth)| SensorTarget {
                id: *id,
                position: *pos,
                velocity: *vel,
                is_neutralized: *neutralized,
                truth,
            })
            .collect();

        let mut observations = self.radar.scan(now, &targets, &mut self.rng);
        observations.extend(self.acoustic.scan(now, &targets, &mut self.rng));
        observations.extend(self.eo.scan(now, &targets, &mut self.rng));
        observations.extend(recon_observations);

        for obs in observations {
            self.events.push(match obs.sensor {
                SensorKind::Radar => SimEvent::RadarDetection {
                    timestamp: now,
                    observation: obs.clone(),
                },
                SensorKind::Acoustic => SimEvent::AudioDetection {
                    timestamp: now,
                    observation: obs.clone(),
                },
                SensorKind::Eo => SimEvent::EoDetection {
                    timestamp: now,
                    observation: obs.clone(),
                },
            });

            if obs.meta.is_false_alarm {
                self.score.false_alarms += 1;
                continue;
            }

            let outcome = self.fusion.ingest(&obs, now);
            if outcome.created {
                self.score.tracks_created += 1;
                if let Some(track) = self.fusion.track(outcome.track_id) {
                    self.events.push(SimEvent::TrackCreated {
                        timestamp: now,
                        track_id: track.track_id,
                        drone_id: track.drone_id,
                        existence_prob: track.existence_prob,
                    });
                }
            }
            if let Some(track) = self.fusion.track(outcome.track_id) {
                self.events.push(SimEvent::FusedTrackUpdate {
                    timestamp: now,
                    track: track.clone(),
                });
            }
        }
    }

    fn update_threat_scores(&mut self, now: f64) {
        for track_id in self.fusion.track_ids() {
            let Some(track) = self.fusion.track(track_id) else {
                continue;
            };
            let score = if self.config.dynamic_threat_scoring {
                self.threat_scorer.score(track, &self.base_pos, now)
            } else {
                threat::static_score(track, &self.base_pos)
            };
            let level = skyfence_core::enums::ThreatLevel::from_score(score);
            self.fusion.set_threat(track_id, score, level);
        }
    }

    fn run_engagement(&mut self, now: f64) {
        let ids = self.fusion.track_ids();
        let tracks: Vec<&FusedTrack> = ids.iter().filter_map(|id| self.fusion.track(*id)).collect();
        let decisions = self
            .engagement
            .evaluate(&tracks, now, &self.base_pos, &mut self.rng);

        for decision in decisions {
            let Some(interceptor_id) = self.first_idle_interceptor() else {
                self.engagement.release_pending(decision.track_id);
                continue;
            };
            if self
                .launch(interceptor_id, decision.drone_id, Some(decision.method), now)
                .is_err()
            {
                self.engagement.release_pending(decision.track_id);
                continue;
            }
            self.score.interceptors_launched += 1;
            if let Some(track) = self.fusion.track(decision.track_id) {
                self.engagement.start_engagement(
                    track,
                    interceptor_id,
                    &decision.reason,
                    &self.base_pos,
                    now,
                );
            }
        }
    }

    fn check_aborts(&mut self, now: f64) {
        for track_id in self.engagement.engaging_track_ids() {
            let track = self.fusion.track(track_id);
            let Some(reason) = self
                .engagement
                .check_abort_conditions(track_id, track, &self.base_pos)
            else {
                continue;
            };

            let interceptor_id = self
                .engagement
                .record(track_id)
                .and_then(|r| r.interceptor_id);
            self.engagement.abort_engagement(track_id, reason, now);

            if let Some(interceptor_id) = interceptor_id {
                self.recall_interceptor(interceptor_id, now);
            }
        }
    }

    /// Order an interceptor home mid-engagement.
    fn recall_interceptor(&mut self, interceptor_id: u32, now: f64) {
        let Some(entity) = self.interceptors.get(&interceptor_id).copied() else {
            return;
        };
        let (target_id, method) = {
            let Ok(mut status) = self.world.get::<&mut InterceptorStatus>(entity) else {
                return;
            };
            if !status.state.is_pursuit() && status.state != InterceptorState::Recon {
                return;
            }
            let info = (status.target_id, status.method);
            status.state = InterceptorState::Returning;
            info
        };
        self.events.push(SimEvent::InterceptResult {
            timestamp: now,
            interceptor_id,
            target_id: target_id.unwrap_or_default(),
            result: InterceptOutcome::Aborted,
            detail: None,
            method,
        });
    }

    fn emit_vehicle_updates(&mut self, now: f64) {
        let mut hostile_ids: Vec<u32> = self.hostiles.keys().copied().collect();
        hostile_ids.sort_unstable();
        for id in hostile_ids {
            let entity = self.hostiles[&id];
            let Ok(mut query) = self
                .world
                .query_one::<(&HostileState, &Position, &Velocity)>(entity)
            else {
                continue;
            };
            if let Some((state, pos, vel)) = query.get() {
                self.events.push(SimEvent::DroneStateUpdate {
                    timestamp: now,
                    drone_id: id,
                    position: *pos,
                    velocity: *vel,
                    behavior: state.behavior,
                    is_evading: state.is_evading,
                    is_neutralized: state.is_neutralized,
                });
            }
        }

        let mut interceptor_ids: Vec<u32> = self.interceptors.keys().copied().collect();
        interceptor_ids.sort_unstable();
        for id in interceptor_ids {
            let entity = self.interceptors[&id];
            let Ok(mut query) = self
                .world
                .query_one::<(&InterceptorStatus, &Position, &Velocity)>(entity)
            else {
                continue;
            };
            if let Some((status, pos, vel)) = query.get() {
                self.events.push(SimEvent::InterceptorUpdate {
                    timestamp: now,
                    interceptor_id: id,
                    position: *pos,
                    velocity: *vel,
                    state: status.state,
                    target_id: status.target_id,
                    method: status.method,
                });
            }
        }
    }

    fn emit_status(&mut self, now: f64) {
        let hostile_count = self
            .hostiles
            .keys()
            .filter(|id| {
                self.hostile_state(**id)
                    .map(|s| !s.is_neutralized)
                    .unwrap_or(false)
            })
            .count() as u32;
        self.events.push(SimEvent::SimulationStatus {
            timestamp: now,
            tick: self.time.tick,
            running: self.running,
            speed_multiplier: self.speed_multiplier,
            hostile_count,
            interceptor_count: self.interceptors.len() as u32,
            track_count: self.fusion.track_count() as u32,
            active_engagements: self.engagement.active_count() as u32,
            score: self.score.clone(),
        });
    }

    // --- Test hooks ---

    #[cfg(test)]
    pub(crate) fn fusion_mut(&mut self) -> &mut FusionCenter {
        &mut self.fusion
    }

    #[cfg(test)]
    pub(crate) fn force_interceptor_state(
        &mut self,
        interceptor_id: u32,
        state: InterceptorState,
        target_id: Option<u32>,
        position: Position,
        method: Option<InterceptMethod>,
    ) {
        let entity = self.interceptors[&interceptor_id];
        if let Ok(mut status) = self.world.get::<&mut InterceptorStatus>(entity) {
            status.state = state;
            status.target_id = target_id;
            status.method = method;
        }
        if let Ok(mut pos) = self.world.get::<&mut Position>(entity) {
            *pos = position;
        }
    }

    #[cfg(test)]
    pub(crate) fn remove_interceptor(&mut self, interceptor_id: u32) {
        if let Some(entity) = self.interceptors.remove(&interceptor_id) {
            let _ = self.world.despawn(entity);
        }
    }
}

fn resolve_scenario(reference: &ScenarioRef) -> Result<ScenarioSpec, CommandError> {
    let key = match reference {
        ScenarioRef::Number(n) => n.to_string(),
        ScenarioRef::Name(name) => name.clone(),
    };
    ScenarioSpec::preset(&key).ok_or(CommandError::UnknownScenario(key))
}
