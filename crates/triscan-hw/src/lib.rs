//! triscan-hw — Hardware abstraction for camera capture.
//!
//! Provides V4L2-based camera access negotiated to YUYV color and
//! RGB24 frame conversion for the capture pipeline.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, CameraStream, DeviceInfo};
pub use frame::RgbFrame;
