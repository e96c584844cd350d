//! Runtime configuration for sensors, fusion, and engagement.
//!
//! Defaults reflect the short-range counter-UAS regime (hundreds of meters,
//! tens of m/s). Scenario files may override the sensor blocks.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::enums::{EngagePolicy, EstimatorKind, GuidanceMode};

/// Radar sensor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub enabled: bool,
    /// Scans per second.
    pub scan_rate: f64,
    pub max_range: f64,
    /// Per-target miss probability per scan.
    pub miss_rate: f64,
    /// False-alarm probability per scan.
    pub false_alarm_rate: f64,
    /// Gaussian noise sigmas.
    pub range_noise_sigma: f64,
    pub bearing_noise_sigma_deg: f64,
    pub altitude_noise_sigma: f64,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_rate: 2.0,
            max_range: 800.0,
            miss_rate: 0.10,
            false_alarm_rate: 0.02,
            range_noise_sigma: 5.0,
            bearing_noise_sigma_deg: 2.0,
            altitude_noise_sigma: 3.0,
        }
    }
}

/// Acoustic array configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcousticConfig {
    pub enabled: bool,
    /// Seconds between scans.
    pub scan_interval: f64,
    pub max_range: f64,
    /// Base detection probability at zero range.
    pub base_detection: f64,
    /// Miss probability folded into every detection draw.
    pub miss_rate: f64,
    /// Processing-delay distribution (seconds).
    pub detection_delay_mean: f64,
    pub detection_delay_std: f64,
    pub bearing_noise_sigma_deg: f64,
    pub range_noise_sigma: f64,
    pub false_alarm_rate: f64,
}

impl Default for AcousticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval: 2.0,
            max_range: 400.0,
            base_detection: 0.6,
            miss_rate: 0.15,
            detection_delay_mean: 0.5,
            detection_delay_std: 0.2,
            bearing_noise_sigma_deg: 5.0,
            range_noise_sigma: 25.0,
            false_alarm_rate: 0.01,
        }
    }
}

/// Electro-optical sensor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EoConfig {
    pub enabled: bool,
    pub min_range: f64,
    pub max_range: f64,
    /// Minimum gap between detections of the same hostile (seconds).
    pub detection_interval: f64,
    /// P(correct HOSTILE call | truly hostile).
    pub hostile_accuracy: f64,
    /// P(correct CIVIL call | truly civil).
    pub civil_accuracy: f64,
    /// P(UNKNOWN fallback) when the true-label call misses.
    pub unknown_fallback_prob: f64,
    /// P(garbling an extracted attribute).
    pub attribute_confusion_prob: f64,
    pub range_noise_sigma: f64,
    pub bearing_noise_sigma_deg: f64,
    pub altitude_noise_sigma: f64,
    /// Base classification confidence before the range falloff.
    pub class_confidence_base: f64,
}

impl Default for EoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_range: 20.0,
            max_range: 300.0,
            detection_interval: 1.0,
            hostile_accuracy: 0.85,
            civil_accuracy: 0.85,
            unknown_fallback_prob: 0.10,
            attribute_confusion_prob: 0.10,
            range_noise_sigma: 2.0,
            bearing_noise_sigma_deg: 1.0,
            altitude_noise_sigma: 1.5,
            class_confidence_base: 0.9,
        }
    }
}

/// Fusion center configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub estimator: EstimatorKind,
    /// Per-sensor observation weights used in the existence delta.
    pub radar_weight: f64,
    pub acoustic_weight: f64,
    pub eo_weight: f64,
    /// Per-sensor position blend weights.
    pub radar_position_weight: f64,
    pub acoustic_position_weight: f64,
    pub eo_position_weight: f64,
    pub decay_rate: f64,
    pub track_timeout: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorKind::WeightedMean,
            radar_weight: 0.9,
            acoustic_weight: 0.6,
            eo_weight: 0.95,
            radar_position_weight: 0.6,
            acoustic_position_weight: 0.3,
            eo_position_weight: 0.7,
            decay_rate: EXISTENCE_DECAY_PER_SEC,
            track_timeout: TRACK_TIMEOUT_SECS,
        }
    }
}

/// Engagement manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub policy: EngagePolicy,
    pub threat_engage_threshold: u32,
    pub exist_prob_threshold: f64,
    pub max_engage_range: f64,
    pub civil_exclude_confidence: f64,
    pub exist_prob_abort_threshold: f64,
    pub threat_abort_threshold: u32,
    pub min_decision_interval: f64,
    pub max_concurrent_engagements: usize,
    pub evaluation_interval: f64,
    pub baseline_engage_distance: f64,
    pub baseline_engage_probability: f64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            policy: EngagePolicy::Fusion,
            threat_engage_threshold: THREAT_ENGAGE_THRESHOLD,
            exist_prob_threshold: EXIST_PROB_THRESHOLD,
            max_engage_range: MAX_ENGAGE_RANGE,
            civil_exclude_confidence: CIVIL_EXCLUDE_CONFIDENCE,
            exist_prob_abort_threshold: EXIST_PROB_ABORT_THRESHOLD,
            threat_abort_threshold: THREAT_ABORT_THRESHOLD,
            min_decision_interval: MIN_DECISION_INTERVAL_SECS,
            max_concurrent_engagements: MAX_CONCURRENT_ENGAGEMENTS,
            evaluation_interval: EVALUATION_INTERVAL_SECS,
            baseline_engage_distance: BASELINE_ENGAGE_DISTANCE,
            baseline_engage_probability: BASELINE_ENGAGE_PROBABILITY,
        }
    }
}

/// Top-level kernel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Seconds of sim time per tick.
    pub tick_interval: f64,
    /// Whether the engagement manager runs autonomously each tick.
    pub auto_engage: bool,
    pub guidance_mode: GuidanceMode,
    /// Whether the dynamic threat scorer augments the static score.
    pub dynamic_threat_scoring: bool,
    pub fusion: FusionConfig,
    pub engagement: EngagementConfig,
    pub eo: EoConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            tick_interval: DT,
            auto_engage: true,
            guidance_mode: GuidanceMode::Pn,
            dynamic_threat_scoring: false,
            fusion: FusionConfig::default(),
            engagement: EngagementConfig::default(),
            eo: EoConfig::default(),
        }
    }
}
