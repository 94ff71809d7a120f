//! Yaw estimation from the three facial reference points.
//!
//! The estimate is geometric, not model-based: the horizontal offset of
//! the nose tip from the cheek midpoint, normalized by the apparent face
//! width so the angle is roughly scale-invariant across camera
//! distances, then scaled by an empirical factor that compensates for
//! the perspective flattening of the raw landmark geometry.

use crate::landmarks::FaceLandmarks;
use serde::{Deserialize, Serialize};

/// Guard against degenerate landmark sets where both cheek points
/// collapse onto the same column.
const MIN_FACE_WIDTH: f32 = 1e-6;

/// Tunable parameters of the yaw estimate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct YawConfig {
    /// Empirical multiplier so a natural ~45° head turn reads as ~45°.
    pub scale: f32,
    /// Smoothing factor of the exponential moving average, in (0, 1].
    pub ema_alpha: f32,
}

impl Default for YawConfig {
    fn default() -> Self {
        Self {
            scale: 1.4,
            ema_alpha: 0.1,
        }
    }
}

/// Estimate head yaw in signed degrees from one landmark set.
///
/// Sign convention: the preview shown to the user is mirrored, so the
/// result is negated such that a user-perceived turn to their left is
/// negative and a turn to their right is positive. Pure function of the
/// current frame only.
pub fn estimate_yaw(lm: &FaceLandmarks, config: &YawConfig) -> f32 {
    let mid_x = (lm.left_cheek.x + lm.right_cheek.x) / 2.0;
    let face_width = (lm.right_cheek.x - lm.left_cheek.x)
        .abs()
        .max(MIN_FACE_WIDTH);
    let dx = lm.nose_tip.x - mid_x;

    let yaw_deg = dx.atan2(face_width).to_degrees();

    // Negated for the mirrored preview.
    -yaw_deg * config.scale
}

/// Exponential moving average over the per-frame yaw estimates.
///
/// A single frame of landmark jitter can swing the raw estimate by
/// several degrees; the downstream classifier and stability gate run on
/// the smoothed value. The smoother persists across brief face loss and
/// is reset on every step transition.
#[derive(Debug)]
pub struct YawSmoother {
    alpha: f32,
    last: Option<f32>,
}

impl YawSmoother {
    pub fn new(alpha: f32) -> Self {
        debug_assert!(alpha > 0.0 && alpha <= 1.0, "alpha must be in (0, 1]");
        Self { alpha, last: None }
    }

    /// Fold one raw estimate into the average and return the smoothed
    /// value. The first sample after a reset passes through unchanged.
    pub fn apply(&mut self, yaw: f32) -> f32 {
        let smoothed = match self.last {
            Some(last) => self.alpha * yaw + (1.0 - self.alpha) * last,
            None => yaw,
        };
        self.last = Some(smoothed);
        smoothed
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Point;

    /// Landmark set with the nose offset `dx` from the cheek midpoint,
    /// cheeks 0.4 apart.
    fn face_with_nose_offset(dx: f32) -> FaceLandmarks {
        FaceLandmarks {
            left_cheek: Point::new(0.3, 0.5),
            right_cheek: Point::new(0.7, 0.5),
            nose_tip: Point::new(0.5 + dx, 0.55),
        }
    }

    #[test]
    fn test_centered_face_reads_near_zero() {
        let yaw = estimate_yaw(&face_with_nose_offset(0.0), &YawConfig::default());
        assert!(yaw.abs() <= 6.0, "centered yaw {yaw} outside front band");
    }

    #[test]
    fn test_user_left_turn_is_negative() {
        // Unmirrored camera image: a turn to the user's own left pushes
        // the nose toward +x.
        let yaw = estimate_yaw(&face_with_nose_offset(0.1), &YawConfig::default());
        assert!(yaw < 0.0, "left turn should be negative, got {yaw}");
    }

    #[test]
    fn test_user_right_turn_is_positive() {
        let yaw = estimate_yaw(&face_with_nose_offset(-0.1), &YawConfig::default());
        assert!(yaw > 0.0, "right turn should be positive, got {yaw}");
    }

    #[test]
    fn test_symmetric_turns_are_mirror_images() {
        let cfg = YawConfig::default();
        let left = estimate_yaw(&face_with_nose_offset(0.12), &cfg);
        let right = estimate_yaw(&face_with_nose_offset(-0.12), &cfg);
        assert!((left + right).abs() < 1e-4);
    }

    #[test]
    fn test_scale_invariant_across_face_sizes() {
        // Same head turn observed closer to the camera: every
        // horizontal distance doubles, the angle must not.
        let near = FaceLandmarks {
            left_cheek: Point::new(0.1, 0.5),
            right_cheek: Point::new(0.9, 0.5),
            nose_tip: Point::new(0.7, 0.55),
        };
        let far = FaceLandmarks {
            left_cheek: Point::new(0.3, 0.5),
            right_cheek: Point::new(0.7, 0.5),
            nose_tip: Point::new(0.6, 0.55),
        };
        let cfg = YawConfig::default();
        let a = estimate_yaw(&near, &cfg);
        let b = estimate_yaw(&far, &cfg);
        assert!((a - b).abs() < 1e-4, "near {a} vs far {b}");
    }

    #[test]
    fn test_degenerate_width_does_not_blow_up() {
        let lm = FaceLandmarks {
            left_cheek: Point::new(0.5, 0.5),
            right_cheek: Point::new(0.5, 0.5),
            nose_tip: Point::new(0.5, 0.55),
        };
        let yaw = estimate_yaw(&lm, &YawConfig::default());
        assert!(yaw.is_finite());
    }

    #[test]
    fn test_smoother_first_sample_passes_through() {
        let mut s = YawSmoother::new(0.1);
        assert_eq!(s.apply(30.0), 30.0);
    }

    #[test]
    fn test_smoother_damps_jumps() {
        let mut s = YawSmoother::new(0.1);
        s.apply(0.0);
        let v = s.apply(30.0);
        assert!((v - 3.0).abs() < 1e-5); // 0.1 * 30 + 0.9 * 0
    }

    #[test]
    fn test_smoother_reset_reseeds() {
        let mut s = YawSmoother::new(0.1);
        s.apply(40.0);
        s.reset();
        assert_eq!(s.apply(-5.0), -5.0);
    }
}
