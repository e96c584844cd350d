//! Fused track model maintained by the fusion center.

use serde::{Deserialize, Serialize};

use crate::constants::TRACK_HISTORY_LEN;
use crate::enums::{
    Classification, ClassificationSource, SensorKind, SizeClass, ThreatLevel,
};
use crate::types::{Position, Velocity};

/// Per-sensor sighting record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSighting {
    pub seen: bool,
    /// Sim time of the last observation from this sensor (seconds).
    pub last_seen: f64,
}

/// Which sensors have contributed to a track, and when.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorStatus {
    pub radar: SensorSighting,
    pub acoustic: SensorSighting,
    pub eo: SensorSighting,
}

impl SensorStatus {
    pub fn sighting_mut(&mut self, kind: SensorKind) -> &mut SensorSighting {
        match kind {
            SensorKind::Radar => &mut self.radar,
            SensorKind::Acoustic => &mut self.acoustic,
            SensorKind::Eo => &mut self.eo,
        }
    }

    /// Number of distinct sensors that have seen this track.
    pub fn seen_count(&self) -> u32 {
        [self.radar.seen, self.acoustic.seen, self.eo.seen]
            .iter()
            .filter(|s| **s)
            .count() as u32
    }
}

/// Arbitrated classification attached to a track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationInfo {
    pub classification: Classification,
    pub confidence: f64,
    pub source: ClassificationSource,
    /// `None` until some sensor reports armament either way.
    pub armed: Option<bool>,
    pub size_class: Option<SizeClass>,
    pub drone_type: Option<String>,
}

/// A consolidated track built from one or more sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedTrack {
    pub track_id: u32,
    /// Matched hostile id, if any observation carried one.
    pub drone_id: Option<u32>,
    pub position: Position,
    pub prev_position: Position,
    pub velocity: Velocity,
    /// Belief this track is a real vehicle, clamped to [0.05, 0.99].
    pub existence_prob: f64,
    pub created_at: f64,
    pub updated_at: f64,
    pub sensors: SensorStatus,
    pub classification: ClassificationInfo,
    /// Threat score in [0, 100].
    pub threat_score: u32,
    pub threat_level: ThreatLevel,
    /// Bounded recent-position history, newest last.
    pub history: Vec<Position>,
    /// Track quality in [0, 1].
    pub quality: f64,
    /// Consecutive decay passes without a supporting observation.
    pub missed_updates: u32,
    pub is_evading: bool,
    pub is_neutralized: bool,
    /// Acceleration estimate (EKF estimator only).
    pub acceleration: Option<Velocity>,
    /// Consecutive predict-only filter steps (EKF estimator only).
    pub prediction_count: u32,
}

impl FusedTrack {
    pub fn new(track_id: u32, position: Position, created_at: f64) -> Self {
        Self {
            track_id,
            drone_id: None,
            position,
            prev_position: position,
            velocity: Velocity::default(),
            existence_prob: 0.0,
            created_at,
            updated_at: created_at,
            sensors: SensorStatus::default(),
            classification: ClassificationInfo::default(),
            threat_score: 0,
            threat_level: ThreatLevel::Info,
            history: vec![position],
            quality: 0.0,
            missed_updates: 0,
            is_evading: false,
            is_neutralized: false,
            acceleration: None,
            prediction_count: 0,
        }
    }

    /// Append to the bounded position history.
    pub fn push_history(&mut self, pos: Position) {
        self.history.push(pos);
        if self.history.len() > TRACK_HISTORY_LEN {
            let excess = self.history.len() - TRACK_HISTORY_LEN;
            self.history.drain(..excess);
        }
    }

    /// Age since creation (seconds).
    pub fn lifetime(&self, now: f64) -> f64 {
        (now - self.created_at).max(0.0)
    }
}
