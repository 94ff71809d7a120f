//! Landmark-stream boundary types.
//!
//! The external face-landmark detector delivers one reading per rendered
//! camera frame: either an indexable set of normalized mesh points or an
//! explicit no-face signal. Only three reference points ever cross into
//! the core.

use serde::{Deserialize, Serialize};

/// A normalized 2D point in image coordinates (0.0–1.0 on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Mesh indices of the three reference points consumed by the yaw
/// estimator. Defaults match the 468-point face mesh the reference
/// detector emits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkIndices {
    pub left_cheek: usize,
    pub right_cheek: usize,
    pub nose_tip: usize,
}

impl Default for LandmarkIndices {
    fn default() -> Self {
        Self {
            left_cheek: 33,
            right_cheek: 263,
            nose_tip: 1,
        }
    }
}

/// The three reference points for one detected face in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub left_cheek: Point,
    pub right_cheek: Point,
    pub nose_tip: Point,
}

impl FaceLandmarks {
    /// Select the reference points out of a full indexed mesh.
    ///
    /// Returns `None` if the mesh is too short to contain all three
    /// indices, which callers treat the same as a no-face reading.
    pub fn from_mesh(mesh: &[Point], indices: &LandmarkIndices) -> Option<Self> {
        Some(Self {
            left_cheek: *mesh.get(indices.left_cheek)?,
            right_cheek: *mesh.get(indices.right_cheek)?,
            nose_tip: *mesh.get(indices.nose_tip)?,
        })
    }
}

/// One reading from the landmark stream.
///
/// `NoFace` is a normal transient, not an error: the controller resets
/// its stability window and waits for the face to come back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkFrame {
    Face(FaceLandmarks),
    NoFace,
}

impl LandmarkFrame {
    pub fn landmarks(&self) -> Option<&FaceLandmarks> {
        match self {
            LandmarkFrame::Face(lm) => Some(lm),
            LandmarkFrame::NoFace => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mesh_picks_configured_indices() {
        let mut mesh = vec![Point::new(0.0, 0.0); 300];
        mesh[33] = Point::new(0.3, 0.5);
        mesh[263] = Point::new(0.7, 0.5);
        mesh[1] = Point::new(0.5, 0.6);

        let lm = FaceLandmarks::from_mesh(&mesh, &LandmarkIndices::default()).unwrap();
        assert_eq!(lm.left_cheek, Point::new(0.3, 0.5));
        assert_eq!(lm.right_cheek, Point::new(0.7, 0.5));
        assert_eq!(lm.nose_tip, Point::new(0.5, 0.6));
    }

    #[test]
    fn test_from_mesh_too_short() {
        let mesh = vec![Point::new(0.5, 0.5); 10];
        assert!(FaceLandmarks::from_mesh(&mesh, &LandmarkIndices::default()).is_none());
    }

    #[test]
    fn test_landmark_frame_roundtrip() {
        let frame = LandmarkFrame::Face(FaceLandmarks {
            left_cheek: Point::new(0.3, 0.5),
            right_cheek: Point::new(0.7, 0.5),
            nose_tip: Point::new(0.5, 0.6),
        });
        let json = serde_json::to_string(&frame).unwrap();
        let back: LandmarkFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }
}
