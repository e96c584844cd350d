//! Threat scoring: a static additive score over track state, and an
//! optional dynamic scorer layering ETA, score-derivative, trajectory and
//! persistence terms on top.

use std::collections::{HashMap, VecDeque};

use skyfence_core::constants::*;
use skyfence_core::enums::{BehaviorAssessment, Classification, ThreatLevel};
use skyfence_core::track::FusedTrack;
use skyfence_core::types::Position;

/// Classify a track's motion relative to the base.
pub fn assess_behavior(track: &FusedTrack, base: &Position) -> BehaviorAssessment {
    let speed = track.velocity.speed();
    if speed < 1.0 {
        return BehaviorAssessment::Hovering;
    }

    let range = base.range_to(&track.position);
    if range < 1.0 {
        return BehaviorAssessment::Approaching;
    }
    let ux = (base.x - track.position.x) / range;
    let uy = (base.y - track.position.y) / range;
    let uz = (base.z - track.position.z) / range;
    let closing = track.velocity.x * ux + track.velocity.y * uy + track.velocity.z * uz;

    if closing > 0.3 * speed {
        BehaviorAssessment::Approaching
    } else if closing < -0.3 * speed {
        BehaviorAssessment::Departing
    } else if track.velocity.horizontal_speed() > 2.0 {
        BehaviorAssessment::Circling
    } else {
        BehaviorAssessment::Unknown
    }
}

/// Static threat score in [0, 100].
pub fn static_score(track: &FusedTrack, base: &Position) -> u32 {
    let mut score: f64 = 0.0;

    score += match track.existence_prob {
        p if p > 0.9 => 35.0,
        p if p > 0.7 => 25.0,
        p if p > 0.5 => 12.0,
        _ => 5.0,
    };

    let class = track.classification.classification;
    let class_conf = track.classification.confidence;
    score += match class {
        Classification::Hostile => 50.0 * class_conf,
        Classification::Unknown => 8.0,
        Classification::Civil => -40.0 * class_conf,
        Classification::Friendly => -60.0 * class_conf,
    };

    let distance = base.range_to(&track.position);
    score += match distance {
        d if d < 80.0 => 25.0,
        d if d < 150.0 => 18.0,
        d if d < 250.0 => 10.0,
        d if d < 400.0 => 5.0,
        _ => 0.0,
    };

    let behavior = assess_behavior(track, base);
    score += match behavior {
        BehaviorAssessment::Approaching => 25.0,
        BehaviorAssessment::Circling => 15.0,
        BehaviorAssessment::Hovering => 12.0,
        BehaviorAssessment::Departing => -5.0,
        BehaviorAssessment::Unknown => 8.0,
    };

    score += match track.classification.armed {
        Some(true) => 20.0,
        None if class == Classification::Hostile => 10.0,
        Some(false) => -5.0,
        None => 0.0,
    };

    let eo_seen = track.sensors.eo.seen;
    if eo_seen && class == Classification::Hostile {
        score += 10.0 * class_conf;
    } else if eo_seen && class == Classification::Civil {
        score -= 15.0 * class_conf;
    } else if !eo_seen && class == Classification::Unknown {
        score += 5.0;
    }

    if behavior == BehaviorAssessment::Approaching {
        let speed = track.velocity.speed();
        if speed > THREAT_SPEED_HIGH {
            score += 8.0;
        } else if speed > THREAT_SPEED_MID {
            score += 5.0;
        }
    }

    if track.is_evading {
        score += 5.0;
    }

    score.round().clamp(0.0, 100.0) as u32
}

struct ScoreHistory {
    /// Recent static scores, newest last, bounded to the derivative window.
    scores: VecDeque<f64>,
}

/// Dynamic threat scorer: keeps per-track histories, cleared on drop.
#[derive(Default)]
pub struct DynamicScorer {
    histories: HashMap<u32, ScoreHistory>,
}

impl DynamicScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dynamic score for one track this tick.
    pub fn score(&mut self, track: &FusedTrack, base: &Position, time: f64) -> u32 {
        let base_score = static_score(track, base) as f64;
        let mut score = base_score;

        score += eta_points(track, base);
        score += self.derivative_points(track.track_id, base_score);
        score += trajectory_points(track, base);
        score += persistence_points(track, time);

        score.round().clamp(0.0, 100.0) as u32
    }

    /// Running mean of the last score deltas, clamped to ±10.
    fn derivative_points(&mut self, track_id: u32, score: f64) -> f64 {
        let history = self
            .histories
            .entry(track_id)
            .or_insert_with(|| ScoreHistory {
                scores: VecDeque::new(),
            });
        history.scores.push_back(score);
        while history.scores.len() > THREAT_DERIVATIVE_WINDOW + 1 {
            history.scores.pop_front();
        }
        if history.scores.len() < 2 {
            return 0.0;
        }
        let deltas: Vec<f64> = history
            .scores
            .iter()
            .zip(history.scores.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect();
        let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
        mean.clamp(-10.0, 10.0)
    }

    /// Forget a dropped track's history.
    pub fn clear(&mut self, track_id: u32) {
        self.histories.remove(&track_id);
    }

    pub fn reset(&mut self) {
        self.histories.clear();
    }
}

/// Estimated time to the base, binned to 0–30 points.
fn eta_points(track: &FusedTrack, base: &Position) -> f64 {
    let range = base.range_to(&track.position);
    if range < 1.0 {
        return 30.0;
    }
    let ux = (base.x - track.position.x) / range;
    let uy = (base.y - track.position.y) / range;
    let uz = (base.z - track.position.z) / range;
    let closing = track.velocity.x * ux + track.velocity.y * uy + track.velocity.z * uz;
    if closing < 0.5 {
        return 0.0;
    }
    match range / closing {
        eta if eta < 5.0 => 30.0,
        eta if eta < 10.0 => 25.0,
        eta if eta < 20.0 => 18.0,
        eta if eta < 30.0 => 12.0,
        eta if eta < 60.0 => 6.0,
        _ => 0.0,
    }
}

/// How much the 5-second dead-reckoned prediction closes the range.
fn trajectory_points(track: &FusedTrack, base: &Position) -> f64 {
    let predicted = Position::new(
        track.position.x + track.velocity.x * THREAT_PREDICTION_HORIZON_SECS,
        track.position.y + track.velocity.y * THREAT_PREDICTION_HORIZON_SECS,
        track.position.z + track.velocity.z * THREAT_PREDICTION_HORIZON_SECS,
    );
    let closes = base.range_to(&track.position) - base.range_to(&predicted);
    match closes {
        c if c >= 100.0 => 15.0,
        c if c >= 50.0 => 10.0,
        c if c >= 20.0 => 5.0,
        c if c > -10.0 => 0.0,
        _ => -5.0,
    }
}

/// Bonus once a track has stayed visible beyond the threshold.
fn persistence_points(track: &FusedTrack, time: f64) -> f64 {
    let visible = track.lifetime(time);
    if visible <= THREAT_PERSISTENCE_THRESHOLD_SECS {
        return 0.0;
    }
    ((visible - THREAT_PERSISTENCE_THRESHOLD_SECS) / THREAT_PERSISTENCE_RAMP_SECS * 10.0)
        .clamp(0.0, 10.0)
}

/// Convenience: score plus derived level.
pub fn assess(track: &FusedTrack, base: &Position) -> (u32, ThreatLevel) {
    let score = static_score(track, base);
    (score, ThreatLevel::from_score(score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfence_core::enums::ClassificationSource;
    use skyfence_core::types::Velocity;

    fn track_at(range_north: f64, velocity: Velocity) -> FusedTrack {
        let mut track = FusedTrack::new(1, Position::new(0.0, range_north, 60.0), 0.0);
        track.velocity = velocity;
        track.existence_prob = 0.95;
        track
    }

    #[test]
    fn test_behavior_assessment() {
        let base = Position::default();
        let approaching = track_at(300.0, Velocity::new(0.0, -15.0, 0.0));
        assert_eq!(assess_behavior(&approaching, &base), BehaviorAssessment::Approaching);

        let departing = track_at(300.0, Velocity::new(0.0, 15.0, 0.0));
        assert_eq!(assess_behavior(&departing, &base), BehaviorAssessment::Departing);

        let circling = track_at(300.0, Velocity::new(15.0, 0.0, 0.0));
        assert_eq!(assess_behavior(&circling, &base), BehaviorAssessment::Circling);

        let hovering = track_at(300.0, Velocity::new(0.2, 0.0, 0.0));
        assert_eq!(assess_behavior(&hovering, &base), BehaviorAssessment::Hovering);
    }

    #[test]
    fn test_hostile_scores_higher_than_civil() {
        let base = Position::default();
        let mut hostile = track_at(200.0, Velocity::new(0.0, -15.0, 0.0));
        hostile.classification.classification = Classification::Hostile;
        hostile.classification.confidence = 0.8;
        hostile.classification.source = ClassificationSource::Eo;
        hostile.sensors.eo.seen = true;

        let mut civil = track_at(200.0, Velocity::new(0.0, -15.0, 0.0));
        civil.classification.classification = Classification::Civil;
        civil.classification.confidence = 0.8;
        civil.sensors.eo.seen = true;

        let hostile_score = static_score(&hostile, &base);
        let civil_score = static_score(&civil, &base);
        assert!(hostile_score > civil_score + 40);
    }

    #[test]
    fn test_score_bounds() {
        let base = Position::default();
        let mut worst = track_at(50.0, Velocity::new(0.0, -30.0, 0.0));
        worst.classification.classification = Classification::Hostile;
        worst.classification.confidence = 1.0;
        worst.classification.armed = Some(true);
        worst.sensors.eo.seen = true;
        worst.is_evading = true;
        assert_eq!(static_score(&worst, &base), 100);

        let mut best = track_at(500.0, Velocity::new(0.0, 15.0, 0.0));
        best.existence_prob = 0.1;
        best.classification.classification = Classification::Friendly;
        best.classification.confidence = 1.0;
        assert_eq!(static_score(&best, &base), 0);
    }

    #[test]
    fn test_threat_level_derivation_at_boundaries() {
        for (score, level) in [
            (80, ThreatLevel::Critical),
            (79, ThreatLevel::Danger),
            (60, ThreatLevel::Danger),
            (59, ThreatLevel::Caution),
            (35, ThreatLevel::Caution),
            (34, ThreatLevel::Info),
        ] {
            assert_eq!(ThreatLevel::from_score(score), level);
        }
    }

    #[test]
    fn test_eta_points_binning() {
        let base = Position::default();
        // 100m out closing at 25 m/s: ETA 4s.
        let fast = track_at(100.0, Velocity::new(0.0, -25.0, 0.0));
        assert_eq!(eta_points(&fast, &base), 30.0);
        // 300m out closing at 6 m/s: ETA 50s.
        let slow = track_at(300.0, Velocity::new(0.0, -6.0, 0.0));
        assert_eq!(eta_points(&slow, &base), 6.0);
        // Departing: no ETA points.
        let departing = track_at(300.0, Velocity::new(0.0, 10.0, 0.0));
        assert_eq!(eta_points(&departing, &base), 0.0);
    }

    #[test]
    fn test_trajectory_points() {
        let base = Position::default();
        let inbound = track_at(300.0, Velocity::new(0.0, -25.0, 0.0));
        assert_eq!(trajectory_points(&inbound, &base), 15.0);
        let outbound = track_at(300.0, Velocity::new(0.0, 25.0, 0.0));
        assert_eq!(trajectory_points(&outbound, &base), -5.0);
    }

    #[test]
    fn test_dynamic_scorer_derivative_and_persistence() {
        let base = Position::default();
        let mut scorer = DynamicScorer::new();

        let mut track = track_at(400.0, Velocity::new(0.0, -20.0, 0.0));
        let mut last = 0;
        for i in 0..5 {
            let t = i as f64 * 0.1;
            track.position.y -= 2.0;
            last = scorer.score(&track, &base, t);
        }
        assert!(last > 0);

        // A long-lived track picks up the persistence bonus.
        let young = scorer.score(&track, &base, 5.0);
        let old = scorer.score(&track, &base, 40.0);
        assert!(old >= young, "persistence should never lower the score");

        scorer.clear(track.track_id);
        assert!(scorer.histories.is_empty());
    }

    #[test]
    fn test_dynamic_score_bounded() {
        let base = Position::default();
        let mut scorer = DynamicScorer::new();
        let mut track = track_at(60.0, Velocity::new(0.0, -30.0, 0.0));
        track.classification.classification = Classification::Hostile;
        track.classification.confidence = 1.0;
        track.classification.armed = Some(true);
        track.sensors.eo.seen = true;
        track.is_evading = true;
        let score = scorer.score(&track, &base, 60.0);
        assert_eq!(score, 100);
    }
}
