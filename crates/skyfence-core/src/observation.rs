//! Sensor observation model.
//!
//! One struct covers all three sensors; the `sensor` tag discriminates and
//! absent measurements are `None`. Bearings are degrees [0, 360), 0 = North,
//! clockwise — the single convention used at every interface.

use serde::{Deserialize, Serialize};

use crate::enums::{ActivityState, Classification, SensorKind, SizeClass};

/// A single sensor measurement of (possibly) one hostile vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorObservation {
    pub sensor: SensorKind,
    /// Sim time of the measurement (seconds).
    pub time: f64,
    /// Ground-truth id of the observed hostile. `None` for false alarms
    /// whose synthetic id has been assigned but matches nothing real.
    pub drone_id: Option<u32>,
    /// Bearing from the base (degrees).
    pub bearing_deg: Option<f64>,
    /// Slant range from the base (meters).
    pub range: Option<f64>,
    /// Altitude (meters).
    pub altitude: Option<f64>,
    /// Detection confidence in [0, 1].
    pub confidence: f64,
    /// Classification, if this sensor classifies (EO only).
    pub classification: Option<Classification>,
    /// Confidence in the classification, in [0, 1].
    pub class_confidence: Option<f64>,
    #[serde(default)]
    pub meta: ObservationMeta,
}

/// Sensor-specific extras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationMeta {
    /// Radial velocity toward the base (m/s, positive = approaching). Radar only.
    pub radial_velocity: Option<f64>,
    pub is_false_alarm: bool,
    /// Acoustic activity classification.
    pub activity_state: Option<ActivityState>,
    /// EO-reported armed flag.
    pub armed: Option<bool>,
    /// EO-reported size class.
    pub size_class: Option<SizeClass>,
    /// EO-reported airframe type.
    pub drone_type: Option<String>,
    /// First time this sensor has seen this hostile.
    pub is_first_detection: bool,
}

impl SensorObservation {
    /// Whether this observation localizes the target (range and bearing).
    pub fn has_position(&self) -> bool {
        self.range.is_some() && self.bearing_deg.is_some()
    }
}
