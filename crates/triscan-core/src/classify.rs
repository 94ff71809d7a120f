//! Capture steps and pose classification.

use serde::{Deserialize, Serialize};

/// The three poses captured in order, plus the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStep {
    Front,
    Left,
    Right,
    Done,
}

/// The fixed capture order. Steps are addressed by index into this
/// list so a retake can move the cursor backwards without bespoke
/// per-step fields.
pub const CAPTURE_ORDER: [CaptureStep; 3] = [CaptureStep::Front, CaptureStep::Left, CaptureStep::Right];

impl CaptureStep {
    /// Position in the capture order. `None` for the terminal state.
    pub fn index(self) -> Option<usize> {
        CAPTURE_ORDER.iter().position(|&s| s == self)
    }

    pub fn is_terminal(self) -> bool {
        self == CaptureStep::Done
    }
}

impl std::fmt::Display for CaptureStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CaptureStep::Front => "front",
            CaptureStep::Left => "left",
            CaptureStep::Right => "right",
            CaptureStep::Done => "done",
        };
        f.write_str(s)
    }
}

/// Angular thresholds of the classifier, in degrees.
///
/// The gap between `front_max` and `side_min` is deliberate: a head
/// sweeping through center on its way to a side angle must not satisfy
/// both conditions in the same borderline frame, and natural micro-
/// jitter around straight-ahead stays inside the front band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseThresholds {
    /// Front is satisfied when `|yaw| <= front_max`.
    pub front_max: f32,
    /// Left/right are satisfied when `|yaw| >= side_min` on the
    /// matching side.
    pub side_min: f32,
    /// Width of the "almost there" band used for user guidance.
    pub near_margin: f32,
}

impl Default for PoseThresholds {
    fn default() -> Self {
        Self {
            front_max: 6.0,
            side_min: 22.0,
            near_margin: 5.0,
        }
    }
}

/// Does this yaw satisfy the pose requirement of `step`?
///
/// All thresholds are closed bounds: exactly 6.0° still counts as
/// front, exactly -22.0° still counts as left.
pub fn satisfies(yaw: f32, step: CaptureStep, thresholds: &PoseThresholds) -> bool {
    match step {
        CaptureStep::Front => yaw.abs() <= thresholds.front_max,
        CaptureStep::Left => yaw <= -thresholds.side_min,
        CaptureStep::Right => yaw >= thresholds.side_min,
        CaptureStep::Done => false,
    }
}

/// How close the current yaw is to satisfying `step`, for feedback
/// rendering (guide-frame color, hint urgency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseFit {
    /// Pose requirement met.
    Good,
    /// Within `near_margin` of the requirement.
    Near,
    /// Nowhere close.
    Off,
}

pub fn fit(yaw: f32, step: CaptureStep, thresholds: &PoseThresholds) -> PoseFit {
    if satisfies(yaw, step, thresholds) {
        return PoseFit::Good;
    }
    let near = match step {
        CaptureStep::Front => yaw.abs() <= thresholds.front_max + thresholds.near_margin,
        CaptureStep::Left => yaw <= -(thresholds.side_min - thresholds.near_margin),
        CaptureStep::Right => yaw >= thresholds.side_min - thresholds.near_margin,
        CaptureStep::Done => false,
    };
    if near {
        PoseFit::Near
    } else {
        PoseFit::Off
    }
}
