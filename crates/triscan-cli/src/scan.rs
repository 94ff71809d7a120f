//! Guided scan runner.
//!
//! The blocking camera loop runs on a dedicated OS thread; the async
//! side only waits for completion or Ctrl-C. Cancellation sets a flag
//! the loop checks between frames, so the camera is released on every
//! exit path when the thread unwinds.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use triscan_core::{
    capture_still, AnalysisSink, CaptureController, CaptureSet, Commit, FaceLandmarks,
    LandmarkFrame, ScanConfig,
};
use triscan_hw::Camera;

/// One line of the landmark trace. A missing `landmarks` field is a
/// no-face frame.
#[derive(Debug, Deserialize)]
struct TraceRecord {
    t_ms: u64,
    #[serde(default)]
    landmarks: Option<FaceLandmarks>,
}

impl TraceRecord {
    fn frame(&self) -> LandmarkFrame {
        match self.landmarks {
            Some(lm) => LandmarkFrame::Face(lm),
            None => LandmarkFrame::NoFace,
        }
    }
}

/// Writes the completed set as front.jpg / left.jpg / right.jpg.
struct DirSink {
    dir: PathBuf,
}

impl AnalysisSink for DirSink {
    type Error = std::io::Error;

    fn submit(&mut self, set: &CaptureSet) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.dir)?;
        for img in set.iter() {
            let path = self.dir.join(format!("{}.jpg", img.step));
            std::fs::write(&path, &img.jpeg)?;
            tracing::info!(path = %path.display(), bytes = img.jpeg.len(), "still written");
        }
        Ok(())
    }
}

pub async fn run(trace: &Path, device: &str, out: &Path, config: ScanConfig) -> Result<()> {
    let records = load_trace(trace)?;
    tracing::info!(frames = records.len(), "trace loaded");

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let device = device.to_string();
    let out = out.to_path_buf();

    let (done_tx, mut done_rx) = tokio::sync::oneshot::channel();
    std::thread::Builder::new()
        .name("triscan-scan".into())
        .spawn(move || {
            let result = scan_blocking(records, &device, &out, config, &flag);
            let _ = done_tx.send(result);
        })
        .context("failed to spawn scan thread")?;

    tokio::select! {
        res = &mut done_rx => {
            return res.context("scan thread exited unexpectedly")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("cancel requested, stopping scan");
            cancel.store(true, Ordering::Relaxed);
        }
    }

    // Wait for the scan thread to unwind and release the camera.
    match done_rx.await {
        Ok(res) => res,
        Err(_) => bail!("scan thread exited without reporting"),
    }
}

fn scan_blocking(
    records: Vec<TraceRecord>,
    device: &str,
    out: &Path,
    config: ScanConfig,
    cancel: &AtomicBool,
) -> Result<()> {
    // Fail fast: without a camera no capture can ever succeed.
    let camera = Camera::open(device)?;
    let mut stream = camera.stream()?;

    let mut controller = CaptureController::new(config);
    let mut sink = DirSink { dir: out.to_path_buf() };
    let start = Instant::now();

    for record in records {
        if cancel.load(Ordering::Relaxed) {
            controller.cancel();
            bail!("scan cancelled");
        }
        if !controller.is_active() {
            break;
        }

        // Pace frames to the trace timeline.
        let due = start + Duration::from_millis(record.t_ms);
        if let Some(wait) = due.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }

        let status = controller.on_frame(record.frame(), Instant::now());
        tracing::debug!(
            step = %status.step,
            yaw = ?status.yaw,
            fit = ?status.fit,
            guidance = ?status.guidance,
            progress = status.hold_progress,
            "frame"
        );
        if status.trouble {
            tracing::warn!(step = %status.step, "still waiting on this pose; adjust and hold");
        }

        let Some(step) = status.capture else {
            continue;
        };

        // Freeze the live frame. A camera failure here is a mid-session
        // loss: unwind, releasing the device, and surface it.
        let frame = stream
            .next_frame()
            .context("camera lost mid-session; partial captures discarded")?;
        tracing::debug!(
            seq = frame.sequence,
            age_ms = frame.timestamp.elapsed().as_millis() as u64,
            "live frame frozen"
        );

        let output = controller.config().output;
        match capture_still(&frame.data, frame.width, frame.height, step, &output) {
            Ok(still) => match controller.commit(still, Instant::now())? {
                Commit::Advanced(next) => {
                    tracing::info!(%step, %next, "captured");
                }
                Commit::Complete(set) => {
                    tracing::info!(%step, "captured, session complete");
                    sink.submit(&set).context("writing captured stills")?;
                    return Ok(());
                }
            },
            // Transient: re-arm and let the gate fire again.
            Err(e) => {
                tracing::warn!(error = %e, %step, "still encode failed, retrying");
                controller.abort_capture();
            }
        }
    }

    bail!("trace ended before all three angles were captured")
}

fn load_trace(path: &Path) -> Result<Vec<TraceRecord>> {
    let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
        Box::new(std::io::stdin().lock())
    } else {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening trace {}", path.display()))?;
        Box::new(std::io::BufReader::new(file))
    };

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: TraceRecord = serde_json::from_str(&line)
            .with_context(|| format!("trace line {}", i + 1))?;
        records.push(record);
    }
    if records.is_empty() {
        bail!("trace is empty");
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_record_face_and_no_face() {
        let rec: TraceRecord = serde_json::from_str(
            r#"{"t_ms":100,"landmarks":{"left_cheek":{"x":0.3,"y":0.5},"right_cheek":{"x":0.7,"y":0.5},"nose_tip":{"x":0.5,"y":0.55}}}"#,
        )
        .unwrap();
        assert!(matches!(rec.frame(), LandmarkFrame::Face(_)));

        let rec: TraceRecord = serde_json::from_str(r#"{"t_ms":200}"#).unwrap();
        assert_eq!(rec.t_ms, 200);
        assert!(matches!(rec.frame(), LandmarkFrame::NoFace));
    }
}
