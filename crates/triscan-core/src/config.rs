//! Scan configuration.
//!
//! Every heuristic constant of the controller is tunable: the yaw
//! scale factor and the angular thresholds were calibrated against one
//! specific landmark model and may need recalibration for another.
//! Defaults reproduce the reference tuning. The struct deserializes
//! from any serde format; the CLI feeds it TOML.

use crate::classify::PoseThresholds;
use crate::landmarks::LandmarkIndices;
use crate::pipeline::CaptureConfig;
use crate::pose::YawConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub yaw: YawConfig,
    pub thresholds: PoseThresholds,
    pub landmark_indices: LandmarkIndices,
    pub output: CaptureConfig,
    /// Continuous correct-pose time required before a capture fires.
    pub min_hold_ms: u64,
    /// Dead time after each capture, so a sustained pose cannot fire twice.
    pub capture_cooldown_ms: u64,
    /// Time in one step after which the controller flags that the user
    /// may be stuck. Never auto-advances.
    pub step_ceiling_ms: u64,
    /// How far the nose may sit from frame center (normalized, per
    /// axis) for the front capture.
    pub center_tolerance: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            yaw: YawConfig::default(),
            thresholds: PoseThresholds::default(),
            landmark_indices: LandmarkIndices::default(),
            output: CaptureConfig::default(),
            min_hold_ms: 1000,
            capture_cooldown_ms: 500,
            step_ceiling_ms: 30_000,
            center_tolerance: 0.22,
        }
    }
}

impl ScanConfig {
    pub fn min_hold(&self) -> Duration {
        Duration::from_millis(self.min_hold_ms)
    }

    pub fn capture_cooldown(&self) -> Duration {
        Duration::from_millis(self.capture_cooldown_ms)
    }

    pub fn step_ceiling(&self) -> Duration {
        Duration::from_millis(self.step_ceiling_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_tuning() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.yaw.scale, 1.4);
        assert_eq!(cfg.yaw.ema_alpha, 0.1);
        assert_eq!(cfg.thresholds.front_max, 6.0);
        assert_eq!(cfg.thresholds.side_min, 22.0);
        assert_eq!(cfg.min_hold(), Duration::from_millis(1000));
        assert_eq!(cfg.capture_cooldown(), Duration::from_millis(500));
        assert_eq!(cfg.output.jpeg_quality, 92);
        assert_eq!((cfg.output.width, cfg.output.height), (640, 480));
    }

    #[test]
    fn test_partial_json_override_keeps_other_defaults() {
        let cfg: ScanConfig = serde_json::from_str(
            r#"{ "min_hold_ms": 1500, "thresholds": { "side_min": 25.0 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.min_hold_ms, 1500);
        assert_eq!(cfg.thresholds.side_min, 25.0);
        assert_eq!(cfg.thresholds.front_max, 6.0);
        assert_eq!(cfg.yaw.scale, 1.4);
    }

    #[test]
    fn test_toml_file_override_keeps_other_defaults() {
        // The format the CLI's --config file uses.
        let cfg: ScanConfig = toml::from_str(
            r#"
            min_hold_ms = 1500
            center_tolerance = 0.3

            [thresholds]
            side_min = 25.0

            [output]
            jpeg_quality = 85
            "#,
        )
        .unwrap();
        assert_eq!(cfg.min_hold(), Duration::from_millis(1500));
        assert_eq!(cfg.center_tolerance, 0.3);
        assert_eq!(cfg.thresholds.side_min, 25.0);
        assert_eq!(cfg.output.jpeg_quality, 85);
        // Everything not named stays at its default.
        assert_eq!(cfg.thresholds.front_max, 6.0);
        assert_eq!(cfg.yaw.ema_alpha, 0.1);
        assert_eq!((cfg.output.width, cfg.output.height), (640, 480));
        assert_eq!(cfg.capture_cooldown(), Duration::from_millis(500));
    }
}
