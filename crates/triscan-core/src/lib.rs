//! triscan-core — Guided three-angle face capture.
//!
//! Drives a live face-landmark stream through yaw estimation, pose
//! classification, and dwell-time gating to auto-capture three stills
//! (front, left, right) for downstream skin analysis. The landmark
//! detector and the analysis service are external collaborators; this
//! crate owns everything between them: the per-frame control loop, the
//! capture raster/encode pipeline, and the session state machine.

pub mod classify;
pub mod config;
pub mod controller;
pub mod gate;
pub mod landmarks;
pub mod pipeline;
pub mod pose;
pub mod session;

pub use classify::{CaptureStep, PoseFit, PoseThresholds, CAPTURE_ORDER};
pub use config::ScanConfig;
pub use controller::{CaptureController, Commit, FrameStatus, Guidance};
pub use gate::StabilityGate;
pub use landmarks::{FaceLandmarks, LandmarkFrame, Point};
pub use pipeline::{capture_still, CaptureConfig, CapturedImage};
pub use session::{AnalysisSink, CaptureSession, CaptureSet};
