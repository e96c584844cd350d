//! Multi-sensor track fusion.
//!
//! `FusionCenter` owns the track table and the hostile-id ↔ track-id
//! lookup. Observations flow in through `ingest`, existence decays and
//! stale tracks drop through `decay`. The position/velocity estimator is
//! selectable: a weighted-mean blender (default) or the EKF in `ekf.rs`,
//! both behind the same contract.

pub mod ekf;

use std::collections::HashMap;

use tracing::debug;

use skyfence_core::config::FusionConfig;
use skyfence_core::constants::*;
use skyfence_core::enums::{
    Classification, ClassificationSource, DropReason, EstimatorKind, SensorKind, ThreatLevel,
};
use skyfence_core::observation::SensorObservation;
use skyfence_core::track::FusedTrack;
use skyfence_core::types::{bearing_diff_deg, Position};

use ekf::EkfState;

/// Result of ingesting one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub track_id: u32,
    pub created: bool,
}

/// A track dropped during decay.
#[derive(Debug, Clone, PartialEq)]
pub struct DropEvent {
    pub track_id: u32,
    pub drone_id: Option<u32>,
    pub reason: DropReason,
    pub lifetime_secs: f64,
    pub final_existence: f64,
}

pub struct FusionCenter {
    config: FusionConfig,
    base_pos: Position,
    tracks: HashMap<u32, FusedTrack>,
    by_drone: HashMap<u32, u32>,
    next_track_id: u32,
    last_decay: f64,
    filters: HashMap<u32, EkfState>,
    /// Last (sensor, time) ingested per track, for idempotence.
    last_ingest: HashMap<u32, (SensorKind, f64)>,
}

impl FusionCenter {
    pub fn new(config: FusionConfig, base_pos: Position) -> Self {
        Self {
            config,
            base_pos,
            tracks: HashMap::new(),
            by_drone: HashMap::new(),
            next_track_id: 1,
            last_decay: 0.0,
            filters: HashMap::new(),
            last_ingest: HashMap::new(),
        }
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.by_drone.clear();
        self.filters.clear();
        self.last_ingest.clear();
        self.next_track_id = 1;
        self.last_decay = 0.0;
    }

    // --- Accessors ---

    pub fn tracks(&self) -> impl Iterator<Item = &FusedTrack> {
        self.tracks.values()
    }

    pub fn track(&self, track_id: u32) -> Option<&FusedTrack> {
        self.tracks.get(&track_id)
    }

    pub fn track_by_drone(&self, drone_id: u32) -> Option<&FusedTrack> {
        self.by_drone
            .get(&drone_id)
            .and_then(|id| self.tracks.get(id))
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Track ids in ascending order, for deterministic iteration.
    pub fn track_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.tracks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    // --- Kernel-facing mutators ---

    pub fn set_track_neutralized(&mut self, drone_id: u32, neutralized: bool) -> bool {
        if let Some(track_id) = self.by_drone.get(&drone_id) {
            if let Some(track) = self.tracks.get_mut(track_id) {
                track.is_neutralized = neutralized;
                return true;
            }
        }
        false
    }

    pub fn set_track_evading(&mut self, drone_id: u32, evading: bool) -> bool {
        if let Some(track_id) = self.by_drone.get(&drone_id) {
            if let Some(track) = self.tracks.get_mut(track_id) {
                track.is_evading = evading;
                return true;
            }
        }
        false
    }

    /// Write back a threat assessment computed by the scoring layer.
    pub fn set_threat(&mut self, track_id: u32, score: u32, level: ThreatLevel) {
        if let Some(track) = self.tracks.get_mut(&track_id) {
            track.threat_score = score;
            track.threat_level = level;
        }
    }

    // --- Ingest ---

    /// Fold one observation into the track table.
    ///
    /// Idempotent per (track, sensor, observation time): replaying the
    /// same measurement is a no-op.
    pub fn ingest(&mut self, obs: &SensorObservation, time: f64) -> IngestOutcome {
        debug_assert!(
            (0.0..=1.0).contains(&obs.confidence),
            "observation confidence out of range: {}",
            obs.confidence
        );
        let matched = self.match_track(obs);

        let track_id = match matched {
            Some(id) => id,
            None => return self.create_track(obs, time),
        };

        if self.last_ingest.get(&track_id) == Some(&(obs.sensor, obs.time)) {
            return IngestOutcome {
                track_id,
                created: false,
            };
        }
        self.last_ingest.insert(track_id, (obs.sensor, obs.time));

        self.update_existence(track_id, obs);
        self.update_kinematics(track_id, obs, time);
        self.update_classification(track_id, obs);
        self.update_sensor_status(track_id, obs, time);
        self.refresh_quality(track_id);

        let track = self.tracks.get_mut(&track_id).expect("track just updated");
        track.updated_at = time;
        track.missed_updates = 0;

        IngestOutcome {
            track_id,
            created: false,
        }
    }

    /// Associate an observation with an existing track: hostile-id lookup
    /// first, nearest gated candidate otherwise.
    fn match_track(&self, obs: &SensorObservation) -> Option<u32> {
        if let Some(drone_id) = obs.drone_id {
            if let Some(track_id) = self.by_drone.get(&drone_id) {
                return Some(*track_id);
            }
        }

        let mut best: Option<(u32, f64)> = None;
        for id in self.track_ids() {
            let track = &self.tracks[&id];
            let distance = if obs.has_position() {
                let pos = self.observation_position(obs, track);
                track.position.horizontal_range_to(&pos)
            } else if let Some(bearing) = obs.bearing_deg {
                let track_bearing = self.base_pos.bearing_deg_to(&track.position);
                bearing_diff_deg(bearing, track_bearing) * BEARING_MATCH_SCALE
            } else {
                continue;
            };

            let gate = if obs.has_position() {
                MATCH_GATE_METERS
            } else {
                MATCH_GATE_BEARING_DEG * BEARING_MATCH_SCALE
            };
            if distance > gate {
                continue;
            }
            match best {
                Some((_, best_d)) if best_d <= distance => {}
                _ => best = Some((id, distance)),
            }
        }
        best.map(|(id, _)| id)
    }

    fn create_track(&mut self, obs: &SensorObservation, time: f64) -> IngestOutcome {
        let track_id = self.next_track_id;
        self.next_track_id += 1;

        let position = if obs.has_position() {
            let bearing = obs.bearing_deg.expect("has_position checked");
            let range = obs.range.expect("has_position checked");
            let altitude = obs.altitude.unwrap_or(self.base_pos.z);
            let horiz = ekf::horizontal_component(range, altitude - self.base_pos.z);
            self.base_pos.offset_polar_deg(bearing, horiz, altitude)
        } else if let Some(bearing) = obs.bearing_deg {
            self.base_pos.offset_polar_deg(
                bearing,
                BEARING_ONLY_INITIAL_RANGE,
                self.base_pos.z + 50.0,
            )
        } else {
            self.base_pos
        };

        let mut track = FusedTrack::new(track_id, position, time);
        track.existence_prob = (self.weight(obs.sensor) * obs.confidence * self.rate(obs.sensor))
            .clamp(EXISTENCE_MIN, 0.5);
        track.drone_id = obs.drone_id;

        if self.config.estimator == EstimatorKind::Ekf {
            if let Some(filter) = EkfState::from_observation(obs, &self.base_pos) {
                self.filters.insert(track_id, filter);
            }
        }

        if let Some(drone_id) = obs.drone_id {
            self.by_drone.entry(drone_id).or_insert(track_id);
        }

        self.tracks.insert(track_id, track);
        self.last_ingest.insert(track_id, (obs.sensor, obs.time));
        self.update_classification(track_id, obs);
        self.update_sensor_status(track_id, obs, time);
        self.refresh_quality(track_id);

        IngestOutcome {
            track_id,
            created: true,
        }
    }

    /// Existence delta: sensor weight times (2·confidence − 1), scaled by
    /// the per-sensor rate and the multi-sensor synergy, plus the EO
    /// hostile-confirmation bonus.
    fn update_existence(&mut self, track_id: u32, obs: &SensorObservation) {
        let weight = self.weight(obs.sensor);
        let base_rate = self.rate(obs.sensor);
        let track = self.tracks.get_mut(&track_id).expect("matched track");

        let rate = match track.sensors.seen_count() {
            3 => base_rate * SYNERGY_THREE_SENSORS,
            2 => base_rate * SYNERGY_TWO_SENSORS,
            _ => base_rate,
        };

        let mut delta = weight * (2.0 * obs.confidence - 1.0) * rate;
        if obs.sensor == SensorKind::Eo
            && obs.classification == Some(Classification::Hostile)
            && obs.class_confidence.unwrap_or(0.0) > 0.7
        {
            delta += EO_HOSTILE_EXISTENCE_BONUS;
        }

        track.existence_prob =
            (track.existence_prob + delta).clamp(EXISTENCE_MIN, EXISTENCE_MAX);
    }

    fn update_kinematics(&mut self, track_id: u32, obs: &SensorObservation, time: f64) {
        if self.config.estimator == EstimatorKind::Ekf {
            self.update_kinematics_ekf(track_id, obs, time);
            return;
        }

        let base_pos = self.base_pos;
        let position_weight = self.position_weight(obs.sensor);
        let track = self.tracks.get_mut(&track_id).expect("matched track");

        if obs.has_position() {
            let bearing = obs.bearing_deg.expect("has_position checked");
            let range = obs.range.expect("has_position checked");
            let altitude = obs.altitude.unwrap_or(track.position.z);
            let horiz = ekf::horizontal_component(range, altitude - base_pos.z);
            let obs_pos = base_pos.offset_polar_deg(bearing, horiz, altitude);

            let old = track.position;
            let new_pos = Position::new(
                old.x + (obs_pos.x - old.x) * position_weight,
                old.y + (obs_pos.y - old.y) * position_weight,
                old.z + (obs_pos.z - old.z) * position_weight,
            );

            let dt = time - track.updated_at;
            if dt > VELOCITY_ESTIMATE_MIN_DT {
                let est_x = (new_pos.x - old.x) / dt;
                let est_y = (new_pos.y - old.y) / dt;
                let est_z = (new_pos.z - old.z) / dt;
                track.velocity.x += (est_x - track.velocity.x) * VELOCITY_BLEND_ALPHA;
                track.velocity.y += (est_y - track.velocity.y) * VELOCITY_BLEND_ALPHA;
                track.velocity.z += (est_z - track.velocity.z) * VELOCITY_BLEND_ALPHA;
            }

            if let Some(radial) = obs.meta.radial_velocity {
                // An approaching target's velocity points back along the
                // bearing unit vector.
                let rad = bearing.to_radians();
                let vx = -radial * rad.sin();
                let vy = -radial * rad.cos();
                track.velocity.x += (vx - track.velocity.x) * VELOCITY_BLEND_ALPHA;
                track.velocity.y += (vy - track.velocity.y) * VELOCITY_BLEND_ALPHA;
            }

            track.prev_position = old;
            track.position = new_pos;
            track.push_history(new_pos);
        } else if let Some(bearing) = obs.bearing_deg {
            // Bearing-only: swing the track onto the observed bearing at
            // its current range. Degraded but still useful.
            debug!(track_id, bearing, "bearing-only update");
            let range = base_pos.horizontal_range_to(&track.position).max(1.0);
            let target = base_pos.offset_polar_deg(bearing, range, track.position.z);
            let old = track.position;
            track.position = Position::new(
                old.x + (target.x - old.x) * BEARING_ONLY_BLEND,
                old.y + (target.y - old.y) * BEARING_ONLY_BLEND,
                old.z,
            );
            track.prev_position = old;
            track.push_history(track.position);
        }
    }

    fn update_kinematics_ekf(&mut self, track_id: u32, obs: &SensorObservation, time: f64) {
        let base_pos = self.base_pos;
        let track = self.tracks.get_mut(&track_id).expect("matched track");

        let filter = self.filters.entry(track_id).or_insert_with(|| {
            EkfState::from_observation(obs, &base_pos).unwrap_or_else(|| {
                let mut seed = obs.clone();
                seed.bearing_deg = Some(base_pos.bearing_deg_to(&track.position));
                seed.range = Some(base_pos.range_to(&track.position).max(1.0));
                seed.altitude = Some(track.position.z);
                EkfState::from_observation(&seed, &base_pos).expect("seeded observation localizes")
            })
        });

        let dt = time - track.updated_at;
        if dt > 1e-9 {
            filter.predict(dt);
        }
        filter.update(obs, &base_pos);

        track.prev_position = track.position;
        track.position = filter.position();
        track.velocity = filter.velocity();
        track.acceleration = Some(filter.acceleration());
        track.prediction_count = filter.prediction_count;
        track.push_history(track.position);
    }

    /// Classification arbitration. EO reports drive the label: a repeat of
    /// the held label reinforces it, a contradiction wins only when it is
    /// at least as confident as the current hypothesis, and an UNKNOWN
    /// report never displaces a definite label. Radar reinforces
    /// confidence without touching the label; acoustic stays out of it.
    fn update_classification(&mut self, track_id: u32, obs: &SensorObservation) {
        let track = self.tracks.get_mut(&track_id).expect("matched track");
        match obs.sensor {
            SensorKind::Eo => {
                let Some(class) = obs.classification else {
                    return;
                };
                let new_conf = obs.class_confidence.unwrap_or(0.5);
                let info = &mut track.classification;

                if class == info.classification {
                    info.confidence = (info.confidence.max(new_conf) + 0.1).min(0.95);
                    info.source = ClassificationSource::Eo;
                } else if class == Classification::Unknown {
                    info.confidence = (info.confidence - 0.05).max(0.3);
                    return;
                } else if info.classification == Classification::Unknown
                    || new_conf >= info.confidence
                {
                    info.classification = class;
                    info.confidence = new_conf;
                    info.source = ClassificationSource::Eo;
                } else {
                    // A weaker contradiction erodes the held hypothesis.
                    info.confidence = (info.confidence - 0.15).max(0.3);
                    return;
                }

                if obs.meta.armed.is_some() {
                    info.armed = obs.meta.armed;
                }
                if obs.meta.size_class.is_some() {
                    info.size_class = obs.meta.size_class;
                }
                if obs.meta.drone_type.is_some() {
                    info.drone_type = obs.meta.drone_type.clone();
                }
            }
            SensorKind::Radar => {
                track.classification.confidence =
                    (track.classification.confidence + 0.05 * obs.confidence).min(0.95);
            }
            SensorKind::Acoustic => {}
        }
    }

    fn update_sensor_status(&mut self, track_id: u32, obs: &SensorObservation, time: f64) {
        let track = self.tracks.get_mut(&track_id).expect("matched track");
        let sighting = track.sensors.sighting_mut(obs.sensor);
        sighting.seen = true;
        sighting.last_seen = time;

        if track.drone_id.is_none() {
            if let Some(drone_id) = obs.drone_id {
                if let std::collections::hash_map::Entry::Vacant(e) = self.by_drone.entry(drone_id)
                {
                    e.insert(track_id);
                    track.drone_id = Some(drone_id);
                } else {
                    debug!(drone_id, track_id, "drone id already owned by another track");
                }
            }
        }
    }

    fn refresh_quality(&mut self, track_id: u32) {
        let track = self.tracks.get_mut(&track_id).expect("matched track");
        let sensor_term = 0.2 * (track.sensors.seen_count() as f64 / 3.0);
        let existence_term = 0.3 * track.existence_prob;
        let class_term = 0.3 * track.classification.confidence;
        let staleness_term = 0.2 / (1.0 + 0.1 * track.missed_updates as f64);
        track.quality = (sensor_term + existence_term + class_term + staleness_term).clamp(0.0, 1.0);
    }

    // --- Decay ---

    /// Progress existence decay and drop stale tracks.
    pub fn decay(&mut self, time: f64) -> Vec<DropEvent> {
        let dt = (time - self.last_decay).max(0.0);
        let decay_rate = self.config.decay_rate;
        let use_ekf = self.config.estimator == EstimatorKind::Ekf;

        for id in self.track_ids() {
            // Tracks refreshed since the previous decay pass were already
            // moved by their observations.
            let stale = self
                .tracks
                .get(&id)
                .is_some_and(|track| track.updated_at + 1e-9 < time);
            if !stale {
                continue;
            }

            let predicted = if use_ekf {
                self.filters.get_mut(&id).map(|filter| {
                    filter.predict(dt);
                    (filter.position(), filter.velocity(), filter.prediction_count)
                })
            } else {
                None
            };

            let track = self.tracks.get_mut(&id).expect("iterating own keys");
            track.existence_prob =
                (track.existence_prob - decay_rate * dt).clamp(EXISTENCE_MIN, EXISTENCE_MAX);
            track.missed_updates += 1;

            match predicted {
                Some((pos, vel, count)) => {
                    track.prev_position = track.position;
                    track.position = pos;
                    track.velocity = vel;
                    track.prediction_count = count;
                }
                None => {
                    // Dead-reckon from the fused velocity.
                    track.prev_position = track.position;
                    track.position.x += track.velocity.x * dt;
                    track.position.y += track.velocity.y * dt;
                    track.position.z += track.velocity.z * dt;
                }
            }
            self.refresh_quality(id);
        }

        // Invalid filters fall back to re-initialization on the next
        // observation; the track survives on dead reckoning.
        self.filters.retain(|_, filter| filter.is_valid());

        let dropped = self.drop_stale(time);
        self.last_decay = time;
        dropped
    }

    fn drop_stale(&mut self, time: f64) -> Vec<DropEvent> {
        let mut dropped = Vec::new();
        for id in self.track_ids() {
            let track = self.tracks.get(&id).expect("iterating own keys");
            let reason = if track.is_neutralized {
                Some(DropReason::Neutralized)
            } else if track.existence_prob < EXISTENCE_DROP_THRESHOLD {
                Some(DropReason::LowExistence)
            } else if time - track.updated_at > self.config.track_timeout {
                Some(DropReason::Timeout)
            } else {
                None
            };

            if let Some(reason) = reason {
                let track = self.tracks.remove(&id).expect("present");
                if let Some(drone_id) = track.drone_id {
                    self.by_drone.remove(&drone_id);
                }
                self.filters.remove(&id);
                self.last_ingest.remove(&id);
                dropped.push(DropEvent {
                    track_id: id,
                    drone_id: track.drone_id,
                    reason,
                    lifetime_secs: track.lifetime(time),
                    final_existence: track.existence_prob,
                });
            }
        }
        dropped
    }

    // --- Config lookups ---

    fn weight(&self, kind: SensorKind) -> f64 {
        match kind {
            SensorKind::Radar => self.config.radar_weight,
            SensorKind::Acoustic => self.config.acoustic_weight,
            SensorKind::Eo => self.config.eo_weight,
        }
    }

    fn rate(&self, kind: SensorKind) -> f64 {
        match kind {
            SensorKind::Radar => EXISTENCE_RATE_RADAR,
            SensorKind::Acoustic => EXISTENCE_RATE_ACOUSTIC,
            SensorKind::Eo => EXISTENCE_RATE_EO,
        }
    }

    fn position_weight(&self, kind: SensorKind) -> f64 {
        match kind {
            SensorKind::Radar => self.config.radar_position_weight,
            SensorKind::Acoustic => self.config.acoustic_position_weight,
            SensorKind::Eo => self.config.eo_position_weight,
        }
    }

    fn observation_position(&self, obs: &SensorObservation, track: &FusedTrack) -> Position {
        let bearing = obs.bearing_deg.unwrap_or(0.0);
        let range = obs.range.unwrap_or(0.0);
        let altitude = obs.altitude.unwrap_or(track.position.z);
        let horiz = ekf::horizontal_component(range, altitude - self.base_pos.z);
        self.base_pos.offset_polar_deg(bearing, horiz, altitude)
    }
}
