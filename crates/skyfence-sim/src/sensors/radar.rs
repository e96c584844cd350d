//! Radar sensor: range, bearing, altitude, and radial velocity with
//! Gaussian noise, per-target miss draws, and occasional false alarms.

use std::collections::HashSet;

use rand::Rng;

use skyfence_core::config::RadarConfig;
use skyfence_core::constants::FALSE_ALARM_ID_BASE;
use skyfence_core::enums::SensorKind;
use skyfence_core::observation::{ObservationMeta, SensorObservation};
use skyfence_core::types::{wrap_bearing_deg, Position};

use super::{gauss, radial_speed_toward, SensorTarget};

pub struct RadarSensor {
    config: RadarConfig,
    base_pos: Position,
    last_scan: Option<f64>,
    /// Hostiles detected at least once (drives `is_first_detection`).
    seen: HashSet<u32>,
    false_alarm_count: u32,
}

impl RadarSensor {
    pub fn new(config: RadarConfig, base_pos: Position) -> Self {
        Self {
            config,
            base_pos,
            last_scan: None,
            seen: HashSet::new(),
            false_alarm_count: 0,
        }
    }

    pub fn config(&self) -> &RadarConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.last_scan = None;
        self.seen.clear();
        self.false_alarm_count = 0;
    }

    /// Run one scan if the scan period has elapsed.
    pub fn scan<R: Rng>(
        &mut self,
        time: f64,
        targets: &[SensorTarget<'_>],
        rng: &mut R,
    ) -> Vec<SensorObservation> {
        if !self.config.enabled {
            return Vec::new();
        }
        let period = 1.0 / self.config.scan_rate.max(1e-6);
        if let Some(last) = self.last_scan {
            if time - last < period {
                return Vec::new();
            }
        }
        self.last_scan = Some(time);

        let mut observations = Vec::new();

        for target in targets {
            if target.is_neutralized {
                continue;
            }
            let range = self.base_pos.range_to(&target.position);
            if range > self.config.max_range {
                continue;
            }
            if rng.gen_bool(self.config.miss_rate.clamp(0.0, 1.0)) {
                continue;
            }

            let noisy_range =
                (range + gauss(rng, 0.0, self.config.range_noise_sigma)).max(1.0);
            let bearing = wrap_bearing_deg(
                self.base_pos.bearing_deg_to(&target.position)
                    + gauss(rng, 0.0, self.config.bearing_noise_sigma_deg),
            );
            let altitude =
                (target.position.z + gauss(rng, 0.0, self.config.altitude_noise_sigma)).max(0.0);
            let radial =
                radial_speed_toward(&self.base_pos, &target.position, &target.velocity)
                    + gauss(rng, 0.0, 1.0);
            let confidence = (1.0 - 0.3 * range / self.config.max_range
                + gauss(rng, 0.0, 0.05))
            .clamp(0.5, 0.99);

            let first = self.seen.insert(target.id);

            observations.push(SensorObservation {
                sensor: SensorKind::Radar,
                time,
                drone_id: Some(target.id),
                bearing_deg: Some(bearing),
                range: Some(noisy_range),
                altitude: Some(altitude),
                confidence,
                classification: None,
                class_confidence: None,
                meta: ObservationMeta {
                    radial_velocity: Some(radial),
                    is_first_detection: first,
                    ..ObservationMeta::default()
                },
            });
        }

        if rng.gen_bool(self.config.false_alarm_rate.clamp(0.0, 1.0)) {
            observations.push(self.false_alarm(time, rng));
        }

        observations
    }

    fn false_alarm<R: Rng>(&mut self, time: f64, rng: &mut R) -> SensorObservation {
        self.false_alarm_count += 1;
        let id = FALSE_ALARM_ID_BASE + self.false_alarm_count;
        SensorObservation {
            sensor: SensorKind::Radar,
            time,
            drone_id: Some(id),
            bearing_deg: Some(rng.gen_range(0.0..360.0)),
            range: Some(rng.gen_range(50.0..self.config.max_range)),
            altitude: Some(rng.gen_range(20.0..150.0)),
            confidence: rng.gen_range(0.25..0.45),
            classification: None,
            class_confidence: None,
            meta: ObservationMeta {
                is_false_alarm: true,
                is_first_detection: true,
                ..ObservationMeta::default()
            },
        }
    }
}
