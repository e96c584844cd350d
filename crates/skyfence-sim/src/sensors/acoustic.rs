//! Acoustic array: activity-state classification, a range-degraded
//! detection probability, and delayed delivery of observations to model
//! acoustic processing latency.

use std::collections::HashSet;

use rand::Rng;

use skyfence_core::config::AcousticConfig;
use skyfence_core::enums::{ActivityState, SensorKind};
use skyfence_core::observation::{ObservationMeta, SensorObservation};
use skyfence_core::types::{wrap_bearing_deg, Position};

use super::{gauss, radial_speed_toward, SensorTarget};

pub struct AcousticSensor {
    config: AcousticConfig,
    base_pos: Position,
    last_scan: Option<f64>,
    /// Observations awaiting delivery, keyed by delivery time.
    pending: Vec<(f64, SensorObservation)>,
    seen: HashSet<u32>,
}

impl AcousticSensor {
    pub fn new(config: AcousticConfig, base_pos: Position) -> Self {
        Self {
            config,
            base_pos,
            last_scan: None,
            pending: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn reset(&mut self) {
        self.last_scan = None;
        self.pending.clear();
        self.seen.clear();
    }

    /// Deliver due observations and, on the scan cadence, schedule new ones.
    pub fn scan<R: Rng>(
        &mut self,
        time: f64,
        targets: &[SensorTarget<'_>],
        rng: &mut R,
    ) -> Vec<SensorObservation> {
        if !self.config.enabled {
            return Vec::new();
        }

        let mut delivered = self.drain_due(time);

        let due = match self.last_scan {
            Some(last) => time - last >= self.config.scan_interval,
            None => true,
        };
        if !due {
            return delivered;
        }
        self.last_scan = Some(time);

        for target in targets {
            if target.is_neutralized {
                continue;
            }
            let range = self.base_pos.range_to(&target.position);
            if range > self.config.max_range {
                continue;
            }

            let activity = self.classify_activity(target);
            let p_detect = self.detection_probability(range, activity);
            if !rng.gen_bool(p_detect.clamp(0.0, 1.0)) {
                continue;
            }

            let delay = gauss(
                rng,
                self.config.detection_delay_mean,
                self.config.detection_delay_std,
            )
            .max(0.0);
            let delivery_time = time + delay;

            let bearing = wrap_bearing_deg(
                self.base_pos.bearing_deg_to(&target.position)
                    + gauss(rng, 0.0, self.config.bearing_noise_sigma_deg),
            );
            let noisy_range =
                (range + gauss(rng, 0.0, self.config.range_noise_sigma)).max(1.0);
            let confidence =
                (0.9 - 0.5 * range / self.config.max_range).clamp(0.2, 0.9);
            let first = self.seen.insert(target.id);

            self.pending.push((
                delivery_time,
                SensorObservation {
                    sensor: SensorKind::Acoustic,
                    time: delivery_time,
                    drone_id: Some(target.id),
                    bearing_deg: Some(bearing),
                    range: Some(noisy_range),
                    altitude: None,
                    confidence,
                    classification: None,
                    class_confidence: None,
                    meta: ObservationMeta {
                        activity_state: Some(activity),
                        is_first_detection: first,
                        ..ObservationMeta::default()
                    },
                },
            ));
        }

        if rng.gen_bool(self.config.false_alarm_rate.clamp(0.0, 1.0)) {
            delivered.push(SensorObservation {
                sensor: SensorKind::Acoustic,
                time,
                drone_id: None,
                bearing_deg: Some(rng.gen_range(0.0..360.0)),
                range: Some(rng.gen_range(50.0..self.config.max_range)),
                altitude: None,
                confidence: 0.2,
                classification: None,
                class_confidence: None,
                meta: ObservationMeta {
                    is_false_alarm: true,
                    activity_state: Some(ActivityState::Loiter),
                    ..ObservationMeta::default()
                },
            });
        }

        // Zero-delay draws may already be due this tick.
        delivered.extend(self.drain_due(time));
        delivered
    }

    fn drain_due(&mut self, time: f64) -> Vec<SensorObservation> {
        let mut due: Vec<(f64, SensorObservation)> = Vec::new();
        self.pending.retain(|(delivery, obs)| {
            if *delivery <= time {
                due.push((*delivery, obs.clone()));
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.0.total_cmp(&b.0));
        due.into_iter().map(|(_, obs)| obs).collect()
    }

    /// Infer the activity state from motion relative to the array.
    fn classify_activity(&self, target: &SensorTarget<'_>) -> ActivityState {
        let climb = target.velocity.z;
        let h_speed = target.velocity.horizontal_speed();
        let radial = radial_speed_toward(&self.base_pos, &target.position, &target.velocity);

        if climb > 3.0 && target.position.z < 50.0 {
            ActivityState::Takeoff
        } else if h_speed < 1.0 && climb.abs() < 0.5 {
            if target.position.z > 20.0 {
                ActivityState::Hover
            } else {
                ActivityState::Idle
            }
        } else if radial > 2.0 {
            ActivityState::Approach
        } else if radial < -2.0 {
            ActivityState::Depart
        } else {
            ActivityState::Loiter
        }
    }

    fn detection_probability(&self, range: f64, activity: ActivityState) -> f64 {
        let falloff = 1.0 - (range / self.config.max_range).powf(1.5);
        let bonus = match activity {
            ActivityState::Takeoff => 0.3,
            ActivityState::Approach => 0.2,
            _ => 0.0,
        };
        (self.config.base_detection * falloff + bonus) * (1.0 - self.config.miss_rate)
    }
}
