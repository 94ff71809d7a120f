//! Still-capture pipeline — crop, mirror, resize, JPEG encode.
//!
//! Invoked once per stability-gate ready signal with the live frame's
//! raw pixels. The saved image is mirrored to match the preview the
//! user was looking at, center-cropped to the guide frame's aspect
//! ratio regardless of native camera resolution, and encoded lossy at a
//! fixed quality balancing payload size against downstream analysis
//! detail.

use crate::classify::CaptureStep;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("frame buffer does not match {width}x{height} RGB24")]
    BadFrameBuffer { width: u32, height: u32 },
    #[error("zero-sized frame")]
    EmptyFrame,
    #[error("jpeg encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Output geometry and encoding quality of captured stills.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    /// JPEG quality, 1–100.
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            jpeg_quality: 92,
        }
    }
}

/// An encoded still, keyed by the step it was captured for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedImage {
    pub step: CaptureStep,
    /// JPEG bytes.
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

/// Freeze one live RGB24 frame into an encoded still for `step`.
pub fn capture_still(
    rgb: &[u8],
    width: u32,
    height: u32,
    step: CaptureStep,
    config: &CaptureConfig,
) -> Result<CapturedImage, PipelineError> {
    if width == 0 || height == 0 || config.width == 0 || config.height == 0 {
        return Err(PipelineError::EmptyFrame);
    }
    let frame = RgbImage::from_raw(width, height, rgb.to_vec())
        .ok_or(PipelineError::BadFrameBuffer { width, height })?;

    let cropped = center_crop_to_aspect(&frame, config.width, config.height);
    let mirrored = imageops::flip_horizontal(&cropped);
    let resized = if mirrored.dimensions() == (config.width, config.height) {
        mirrored
    } else {
        imageops::resize(&mirrored, config.width, config.height, FilterType::Triangle)
    };

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, config.jpeg_quality).encode_image(&resized)?;

    Ok(CapturedImage {
        step,
        jpeg,
        width: config.width,
        height: config.height,
        captured_at: Utc::now(),
    })
}

/// Center-crop `frame` to the aspect ratio of `target_w:target_h`
/// without resizing.
fn center_crop_to_aspect(frame: &RgbImage, target_w: u32, target_h: u32) -> RgbImage {
    let (w, h) = frame.dimensions();
    // Cross-multiplied aspect comparison, no float division.
    let src = u64::from(w) * u64::from(target_h);
    let dst = u64::from(target_w) * u64::from(h);

    let (crop_w, crop_h) = if src > dst {
        // Source is wider than the target aspect: trim the sides.
        (((u64::from(h) * u64::from(target_w)) / u64::from(target_h)) as u32, h)
    } else if src < dst {
        // Source is taller: trim top and bottom.
        (w, ((u64::from(w) * u64::from(target_h)) / u64::from(target_w)) as u32)
    } else {
        return frame.clone();
    };

    let crop_w = crop_w.max(1);
    let crop_h = crop_h.max(1);
    let x = (w - crop_w) / 2;
    let y = (h - crop_h) / 2;
    imageops::crop_imm(frame, x, y, crop_w, crop_h).to_image()
}
