//! End-to-end guided scan: landmark stream in, three encoded stills
//! out, using a synthetic clock and synthetic camera frames.

use std::convert::Infallible;
use std::time::{Duration, Instant};
use triscan_core::{
    capture_still, AnalysisSink, CaptureController, CaptureSet, CaptureStep, Commit, FaceLandmarks,
    LandmarkFrame, Point, ScanConfig,
};

/// Collects completed sets in memory, standing in for the analysis
/// service.
#[derive(Default)]
struct MemorySink {
    received: Vec<CaptureSet>,
}

impl AnalysisSink for MemorySink {
    type Error = Infallible;

    fn submit(&mut self, set: &CaptureSet) -> Result<(), Infallible> {
        self.received.push(set.clone());
        Ok(())
    }
}

/// Landmarks reading `target` degrees through the default estimator.
fn face_at_yaw(target: f32) -> FaceLandmarks {
    let scale = ScanConfig::default().yaw.scale;
    let width = 0.4f32;
    let dx = width * (-target / scale).to_radians().tan();
    FaceLandmarks {
        left_cheek: Point::new(0.5 - width / 2.0, 0.5),
        right_cheek: Point::new(0.5 + width / 2.0, 0.5),
        nose_tip: Point::new(0.5 + dx, 0.55),
    }
}

/// A flat 128x96 RGB24 "camera frame".
fn camera_frame() -> Vec<u8> {
    vec![160u8; 128 * 96 * 3]
}

/// Drive the controller with one landmark reading every 100ms over
/// [from_ms, to_ms]. Capture requests are rastered through the real
/// pipeline and committed. Returns the completed set if the session
/// finished inside the span.
fn drive(
    controller: &mut CaptureController,
    frame: LandmarkFrame,
    t0: Instant,
    from_ms: u64,
    to_ms: u64,
    captures: &mut Vec<CaptureStep>,
) -> Option<CaptureSet> {
    let mut ms = from_ms;
    while ms <= to_ms {
        let now = t0 + Duration::from_millis(ms);
        let status = controller.on_frame(frame, now);
        if let Some(step) = status.capture {
            let raw = camera_frame();
            let output = controller.config().output;
            let still =
                capture_still(&raw, 128, 96, step, &output).expect("pipeline capture failed");
            captures.push(step);
            match controller.commit(still, now).expect("commit failed") {
                Commit::Advanced(_) => {}
                Commit::Complete(set) => return Some(set),
            }
        }
        ms += 100;
    }
    None
}

#[test]
fn test_full_scan_front_left_right_handoff() {
    let t0 = Instant::now();
    let mut controller = CaptureController::new(ScanConfig::default());
    let mut sink = MemorySink::default();
    let mut captures = Vec::new();

    // Centered pose held past the dwell: exactly one front capture.
    let done = drive(
        &mut controller,
        LandmarkFrame::Face(face_at_yaw(0.0)),
        t0,
        0,
        1200,
        &mut captures,
    );
    assert!(done.is_none());
    assert_eq!(captures, vec![CaptureStep::Front]);
    assert_eq!(controller.current_step(), CaptureStep::Left);

    // Face lost for 500ms: the gate resets, nothing fires.
    let done = drive(
        &mut controller,
        LandmarkFrame::NoFace,
        t0,
        1300,
        1800,
        &mut captures,
    );
    assert!(done.is_none());
    assert_eq!(captures.len(), 1, "no spurious capture during face loss");

    // Left turn held past the dwell.
    let done = drive(
        &mut controller,
        LandmarkFrame::Face(face_at_yaw(-30.0)),
        t0,
        1900,
        3100,
        &mut captures,
    );
    assert!(done.is_none());
    assert_eq!(captures, vec![CaptureStep::Front, CaptureStep::Left]);
    assert_eq!(controller.current_step(), CaptureStep::Right);

    // Right turn held past the dwell completes the session.
    let done = drive(
        &mut controller,
        LandmarkFrame::Face(face_at_yaw(30.0)),
        t0,
        3700,
        4900,
        &mut captures,
    );
    let set = done.expect("session should complete on the right capture");
    assert_eq!(
        captures,
        vec![CaptureStep::Front, CaptureStep::Left, CaptureStep::Right]
    );

    // Hand off to the analysis collaborator: three JPEGs in order.
    sink.submit(&set).unwrap();
    assert_eq!(sink.received.len(), 1);
    let delivered = &sink.received[0];
    for (img, step) in delivered
        .iter()
        .zip([CaptureStep::Front, CaptureStep::Left, CaptureStep::Right])
    {
        assert_eq!(img.step, step);
        assert_eq!(&img.jpeg[..2], &[0xFF, 0xD8], "JPEG SOI marker");
        let config = ScanConfig::default();
        assert_eq!((img.width, img.height), (config.output.width, config.output.height));
    }

    // Dispatcher is disabled: further frames are ignored.
    assert!(!controller.is_active());
    let status = controller.on_frame(
        LandmarkFrame::Face(face_at_yaw(0.0)),
        t0 + Duration::from_millis(5000),
    );
    assert!(!status.active);
    assert_eq!(status.capture, None);
}

#[test]
fn test_sustained_pose_after_capture_yields_one_image() {
    let t0 = Instant::now();
    let mut controller = CaptureController::new(ScanConfig::default());
    let mut captures = Vec::new();

    // Hold the front pose for a full 3 seconds past the first fire.
    drive(
        &mut controller,
        LandmarkFrame::Face(face_at_yaw(0.0)),
        t0,
        0,
        3000,
        &mut captures,
    );
    assert_eq!(captures, vec![CaptureStep::Front]);
}

#[test]
fn test_cancel_mid_session_discards_partials() {
    let t0 = Instant::now();
    let mut controller = CaptureController::new(ScanConfig::default());
    let mut captures = Vec::new();

    drive(
        &mut controller,
        LandmarkFrame::Face(face_at_yaw(0.0)),
        t0,
        0,
        1200,
        &mut captures,
    );
    assert_eq!(captures.len(), 1);

    // User navigates away: the controller is consumed, nothing is
    // ever submitted.
    controller.cancel();
}
