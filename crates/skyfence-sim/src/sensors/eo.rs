//! Electro-optical sensor: range- and interval-gated detections with
//! classification sampled from ground truth through an accuracy table.

use std::collections::HashMap;

use rand::Rng;

use skyfence_core::config::EoConfig;
use skyfence_core::enums::{Classification, SensorKind, SizeClass, TruthLabel};
use skyfence_core::observation::{ObservationMeta, SensorObservation};
use skyfence_core::types::{wrap_bearing_deg, Position};

use super::{gauss, SensorTarget};

pub struct EoSensor {
    config: EoConfig,
    base_pos: Position,
    /// Last detection time per hostile, enforcing the detection interval.
    last_detection: HashMap<u32, f64>,
}

impl EoSensor {
    pub fn new(config: EoConfig, base_pos: Position) -> Self {
        Self {
            config,
            base_pos,
            last_detection: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EoConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.last_detection.clear();
    }

    pub fn scan<R: Rng>(
        &mut self,
        time: f64,
        targets: &[SensorTarget<'_>],
        rng: &mut R,
    ) -> Vec<SensorObservation> {
        if !self.config.enabled {
            return Vec::new();
        }

        let mut observations = Vec::new();

        for target in targets {
            if target.is_neutralized {
                continue;
            }
            let range = self.base_pos.range_to(&target.position);
            if range < self.config.min_range || range > self.config.max_range {
                continue;
            }
            if let Some(last) = self.last_detection.get(&target.id) {
                if time - last < self.config.detection_interval {
                    continue;
                }
            }
            if !rng.gen_bool(detection_probability(range).clamp(0.0, 1.0)) {
                continue;
            }

            let first = self
                .last_detection
                .insert(target.id, time)
                .is_none();

            observations.push(self.observe(time, target, range, first, rng));
        }

        observations
    }

    /// Build a single detection, sampling classification and attributes.
    ///
    /// Also used by the interceptor recon pass, which reports through the
    /// same channel at close range.
    pub fn observe<R: Rng>(
        &self,
        time: f64,
        target: &SensorTarget<'_>,
        range: f64,
        first: bool,
        rng: &mut R,
    ) -> SensorObservation {
        let bearing = wrap_bearing_deg(
            self.base_pos.bearing_deg_to(&target.position)
                + gauss(rng, 0.0, self.config.bearing_noise_sigma_deg),
        );
        let noisy_range = (range + gauss(rng, 0.0, self.config.range_noise_sigma)).max(1.0);
        let altitude =
            (target.position.z + gauss(rng, 0.0, self.config.altitude_noise_sigma)).max(0.0);
        let confidence =
            (1.0 - 0.4 * range / self.config.max_range + gauss(rng, 0.0, 0.03)).clamp(0.5, 0.95);

        let classification = self.sample_classification(target.truth.label, rng);
        let class_confidence = self.config.class_confidence_base
            * (1.0 - range / (1.5 * self.config.max_range)).max(0.6);

        let (armed, size_class, drone_type) = match &target.truth.attrs {
            Some(attrs) => (
                Some(self.confuse_bool(attrs.armed, rng)),
                Some(self.confuse_size(attrs.size_class, rng)),
                Some(attrs.drone_type.clone()),
            ),
            None => (None, None, None),
        };

        SensorObservation {
            sensor: SensorKind::Eo,
            time,
            drone_id: Some(target.id),
            bearing_deg: Some(bearing),
            range: Some(noisy_range),
            altitude: Some(altitude),
            confidence,
            classification: Some(classification),
            class_confidence: Some(class_confidence),
            meta: ObservationMeta {
                armed,
                size_class,
                drone_type,
                is_first_detection: first,
                ..ObservationMeta::default()
            },
        }
    }

    /// Sample a classification from the truth label: a correct call with
    /// the configured accuracy, otherwise UNKNOWN with the fallback
    /// probability, otherwise the opposite definite label.
    fn sample_classification<R: Rng>(&self, truth: TruthLabel, rng: &mut R) -> Classification {
        match truth {
            TruthLabel::Hostile => {
                if rng.gen_bool(self.config.hostile_accuracy) {
                    Classification::Hostile
                } else if rng.gen_bool(self.config.unknown_fallback_prob) {
                    Classification::Unknown
                } else {
                    Classification::Civil
                }
            }
            TruthLabel::Civil => {
                if rng.gen_bool(self.config.civil_accuracy) {
                    Classification::Civil
                } else if rng.gen_bool(self.config.unknown_fallback_prob) {
                    Classification::Unknown
                } else {
                    Classification::Hostile
                }
            }
            TruthLabel::Unknown => {
                if rng.gen_bool(0.8) {
                    Classification::Unknown
                } else if rng.gen_bool(0.5) {
                    Classification::Hostile
                } else {
                    Classification::Civil
                }
            }
        }
    }

    fn confuse_bool<R: Rng>(&self, value: bool, rng: &mut R) -> bool {
        if rng.gen_bool(self.config.attribute_confusion_prob) {
            !value
        } else {
            value
        }
    }

    fn confuse_size<R: Rng>(&self, value: SizeClass, rng: &mut R) -> SizeClass {
        if !rng.gen_bool(self.config.attribute_confusion_prob) {
            return value;
        }
        // Misjudge by one class.
        match value {
            SizeClass::Small => SizeClass::Medium,
            SizeClass::Medium => {
                if rng.gen_bool(0.5) {
                    SizeClass::Small
                } else {
                    SizeClass::Large
                }
            }
            SizeClass::Large => SizeClass::Medium,
        }
    }
}

/// Detection probability: near-certain below 100 m, linear falloff to a
/// floor of 0.45 past 200 m.
fn detection_probability(range: f64) -> f64 {
    if range <= 100.0 {
        0.9
    } else if range <= 200.0 {
        0.9 - 0.45 * (range - 100.0) / 100.0
    } else {
        0.45
    }
}
