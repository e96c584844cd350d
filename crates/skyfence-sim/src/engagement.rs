//! Engagement manager: decides which tracks to commit an interceptor to
//! and aborts engagements that no longer justify their cost.
//!
//! Two policies share the control flow: BASELINE commits to anything close
//! enough with a fixed probability, FUSION gates on existence, threat and
//! classification and orders candidates by priority.

use std::collections::HashMap;

use rand::Rng;
use tracing::info;

use skyfence_core::config::EngagementConfig;
use skyfence_core::constants::ABORT_RANGE_FACTOR;
use skyfence_core::enums::{
    AbortReason, BehaviorAssessment, Classification, EngagePolicy, EngagementCommandState,
    EngagementResult, EngagementState, InterceptMethod, SizeClass,
};
use skyfence_core::track::FusedTrack;
use skyfence_core::types::Position;

use crate::threat::assess_behavior;

/// Per-track engagement record, retained through COMPLETED/ABORTED.
#[derive(Debug, Clone)]
pub struct EngagementRecord {
    pub track_id: u32,
    pub drone_id: Option<u32>,
    pub state: EngagementState,
    pub last_decision_time: f64,
    pub engage_start: Option<f64>,
    pub interceptor_id: Option<u32>,
    pub engage_reason: String,
    pub abort_reason: Option<AbortReason>,
    pub result: EngagementResult,
    pub first_detect_time: f64,
    /// When the threat score first crossed the engage threshold.
    pub threat_crossed_at: Option<f64>,
    pub threat_at_engage: u32,
    pub existence_at_engage: f64,
    pub distance_at_engage: f64,
}

impl EngagementRecord {
    fn new(track: &FusedTrack) -> Self {
        Self {
            track_id: track.track_id,
            drone_id: track.drone_id,
            state: EngagementState::Tracking,
            last_decision_time: f64::MIN,
            engage_start: None,
            interceptor_id: None,
            engage_reason: String::new(),
            abort_reason: None,
            result: EngagementResult::Pending,
            first_detect_time: track.created_at,
            threat_crossed_at: None,
            threat_at_engage: 0,
            existence_at_engage: 0.0,
            distance_at_engage: 0.0,
        }
    }
}

/// A commit decision produced by `evaluate`.
#[derive(Debug, Clone)]
pub struct Decision {
    pub track_id: u32,
    pub drone_id: u32,
    pub method: InterceptMethod,
    pub reason: String,
}

pub struct EngagementManager {
    config: EngagementConfig,
    records: HashMap<u32, EngagementRecord>,
    /// Operator overrides keyed by drone id.
    manual_states: HashMap<u32, EngagementCommandState>,
    last_evaluation: f64,
}

impl EngagementManager {
    pub fn new(config: EngagementConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
            manual_states: HashMap::new(),
            last_evaluation: f64::MIN,
        }
    }

    pub fn config(&self) -> &EngagementConfig {
        &self.config
    }

    pub fn records(&self) -> impl Iterator<Item = &EngagementRecord> {
        self.records.values()
    }

    pub fn record(&self, track_id: u32) -> Option<&EngagementRecord> {
        self.records.get(&track_id)
    }

    /// Records currently committed (ENGAGE_PENDING or ENGAGING).
    pub fn active_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| {
                matches!(
                    r.state,
                    EngagementState::EngagePending | EngagementState::Engaging
                )
            })
            .count()
    }

    /// Track ids of records in ENGAGING state.
    pub fn engaging_track_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .records
            .values()
            .filter(|r| r.state == EngagementState::Engaging)
            .map(|r| r.track_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn set_manual_state(&mut self, drone_id: u32, state: EngagementCommandState) {
        self.manual_states.insert(drone_id, state);
    }

    /// Evaluate all tracks and produce engagement decisions.
    pub fn evaluate<R: Rng>(
        &mut self,
        tracks: &[&FusedTrack],
        time: f64,
        base_pos: &Position,
        rng: &mut R,
    ) -> Vec<Decision> {
        // Bookkeeping runs every tick so records exist even between
        // evaluation windows.
        for track in tracks {
            let record = self
                .records
                .entry(track.track_id)
                .or_insert_with(|| EngagementRecord::new(track));
            if record.drone_id.is_none() {
                record.drone_id = track.drone_id;
            }
            if record.threat_crossed_at.is_none()
                && track.threat_score >= self.config.threat_engage_threshold
            {
                record.threat_crossed_at = Some(time);
            }
            if record.state == EngagementState::Idle {
                record.state = EngagementState::Tracking;
            }
        }

        if time - self.last_evaluation < self.config.evaluation_interval {
            return Vec::new();
        }
        self.last_evaluation = time;

        let slots = self
            .config
            .max_concurrent_engagements
            .saturating_sub(self.active_count());
        if slots == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<&FusedTrack> = tracks
            .iter()
            .copied()
            .filter(|track| self.is_candidate(track, time, base_pos, rng))
            .collect();

        match self.config.policy {
            EngagePolicy::Fusion => {
                candidates.sort_by(|a, b| {
                    b.threat_score
                        .cmp(&a.threat_score)
                        .then_with(|| {
                            base_pos
                                .range_to(&a.position)
                                .total_cmp(&base_pos.range_to(&b.position))
                        })
                        .then_with(|| {
                            let a_app =
                                assess_behavior(a, base_pos) == BehaviorAssessment::Approaching;
                            let b_app =
                                assess_behavior(b, base_pos) == BehaviorAssessment::Approaching;
                            b_app.cmp(&a_app)
                        })
                });
            }
            EngagePolicy::Baseline => {
                candidates.sort_by(|a, b| {
                    base_pos
                        .range_to(&a.position)
                        .total_cmp(&base_pos.range_to(&b.position))
                });
            }
        }

        let mut decisions = Vec::new();
        for track in candidates.into_iter().take(slots) {
            let Some(drone_id) = track.drone_id else {
                continue;
            };
            let record = self.records.get_mut(&track.track_id).expect("seeded above");
            record.last_decision_time = time;
            record.state = EngagementState::EngagePending;

            let method = select_method(track);
            let reason = match self.config.policy {
                EngagePolicy::Fusion => format!(
                    "threat {} existence {:.2} range {:.0}m",
                    track.threat_score,
                    track.existence_prob,
                    base_pos.range_to(&track.position)
                ),
                EngagePolicy::Baseline => {
                    format!("baseline range {:.0}m", base_pos.range_to(&track.position))
                }
            };
            record.engage_reason = reason.clone();

            decisions.push(Decision {
                track_id: track.track_id,
                drone_id,
                method,
                reason,
            });
        }
        decisions
    }

    fn is_candidate<R: Rng>(
        &self,
        track: &FusedTrack,
        time: f64,
        base_pos: &Position,
        rng: &mut R,
    ) -> bool {
        if track.is_neutralized || track.drone_id.is_none() {
            return false;
        }

        if let Some(record) = self.records.get(&track.track_id) {
            if matches!(
                record.state,
                EngagementState::EngagePending | EngagementState::Engaging
            ) {
                return false;
            }
            if time - record.last_decision_time < self.config.min_decision_interval {
                return false;
            }
        }

        match track.drone_id.and_then(|id| self.manual_states.get(&id)) {
            Some(EngagementCommandState::Ignore) => return false,
            Some(EngagementCommandState::Engage) => return true,
            _ => {}
        }

        let distance = base_pos.range_to(&track.position);
        match self.config.policy {
            EngagePolicy::Fusion => {
                if track.existence_prob < self.config.exist_prob_threshold {
                    return false;
                }
                if track.threat_score < self.config.threat_engage_threshold {
                    return false;
                }
                if distance > self.config.max_engage_range {
                    return false;
                }
                let class = &track.classification;
                if class.classification == Classification::Civil
                    && class.confidence >= self.config.civil_exclude_confidence
                {
                    return false;
                }
                if class.classification == Classification::Friendly {
                    return false;
                }
                true
            }
            EngagePolicy::Baseline => {
                distance <= self.config.baseline_engage_distance
                    && rng.gen_bool(self.config.baseline_engage_probability)
            }
        }
    }

    /// Commit a track: an interceptor has been assigned and launched.
    pub fn start_engagement(
        &mut self,
        track: &FusedTrack,
        interceptor_id: u32,
        reason: &str,
        base_pos: &Position,
        time: f64,
    ) {
        let record = self
            .records
            .entry(track.track_id)
            .or_insert_with(|| EngagementRecord::new(track));
        record.state = EngagementState::Engaging;
        record.result = EngagementResult::Pending;
        record.interceptor_id = Some(interceptor_id);
        record.engage_start = Some(time);
        record.engage_reason = reason.to_string();
        record.threat_at_engage = track.threat_score;
        record.existence_at_engage = track.existence_prob;
        record.distance_at_engage = base_pos.range_to(&track.position);
        info!(
            track_id = track.track_id,
            interceptor_id, reason, "engagement started"
        );
    }

    /// FUSION-policy abort conditions. `track` is None when fusion has
    /// already dropped it.
    pub fn check_abort_conditions(
        &self,
        track_id: u32,
        track: Option<&FusedTrack>,
        base_pos: &Position,
    ) -> Option<AbortReason> {
        let record = self.records.get(&track_id)?;
        if record.state != EngagementState::Engaging {
            return None;
        }
        if self.config.policy != EngagePolicy::Fusion {
            return None;
        }

        let Some(track) = track else {
            return Some(AbortReason::TargetLost);
        };
        if track.existence_prob < self.config.exist_prob_abort_threshold {
            return Some(AbortReason::LowExistence);
        }
        if track.threat_score < self.config.threat_abort_threshold {
            return Some(AbortReason::LowThreat);
        }
        if track.classification.classification == Classification::Civil
            && track.classification.confidence >= self.config.civil_exclude_confidence
        {
            return Some(AbortReason::ReclassifiedCivil);
        }
        if base_pos.range_to(&track.position) > ABORT_RANGE_FACTOR * self.config.max_engage_range {
            return Some(AbortReason::OutOfRange);
        }
        None
    }

    /// Undo a pending decision when no interceptor could be assigned.
    pub fn release_pending(&mut self, track_id: u32) {
        if let Some(record) = self.records.get_mut(&track_id) {
            if record.state == EngagementState::EngagePending {
                record.state = EngagementState::Tracking;
            }
        }
    }

    pub fn abort_engagement(&mut self, track_id: u32, reason: AbortReason, time: f64) {
        if let Some(record) = self.records.get_mut(&track_id) {
            record.state = EngagementState::Aborted;
            record.result = EngagementResult::Aborted;
            record.abort_reason = Some(reason);
            record.last_decision_time = time;
            info!(track_id, ?reason, "engagement aborted");
        }
    }

    pub fn complete_engagement(&mut self, track_id: u32, success: bool, time: f64) {
        if let Some(record) = self.records.get_mut(&track_id) {
            record.state = EngagementState::Completed;
            record.result = if success {
                EngagementResult::Success
            } else {
                EngagementResult::Fail
            };
            record.last_decision_time = time;
            info!(track_id, success, "engagement complete");
        }
    }

    /// Abort every active engagement (scenario reset).
    pub fn abort_all(&mut self, reason: AbortReason, time: f64) -> Vec<u32> {
        let active: Vec<u32> = self
            .records
            .values()
            .filter(|r| {
                matches!(
                    r.state,
                    EngagementState::EngagePending | EngagementState::Engaging
                )
            })
            .map(|r| r.track_id)
            .collect();
        for track_id in &active {
            self.abort_engagement(*track_id, reason, time);
        }
        active
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.manual_states.clear();
        self.last_evaluation = f64::MIN;
    }
}

/// Choose an intercept method from what fusion knows about the target.
fn select_method(track: &FusedTrack) -> InterceptMethod {
    if track.classification.armed == Some(true) {
        // Keep standoff distance from armed targets.
        InterceptMethod::Gun
    } else if track.classification.size_class == Some(SizeClass::Small) {
        InterceptMethod::Net
    } else {
        InterceptMethod::Ram
    }
}
