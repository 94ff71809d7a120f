//! Capture controller — the single owner of a guided scan.
//!
//! Receives the landmark stream one frame at a time, runs the
//! estimate → classify → gate chain, and drives the session state
//! machine. Everything happens synchronously inside the caller's frame
//! callback; the controller never blocks and is mutated by no one
//! else.
//!
//! The capture itself (rastering the live frame) happens outside: when
//! a frame returns a [`capture`](FrameStatus::capture) request, the
//! host freezes the current video frame through
//! [`capture_still`](crate::pipeline::capture_still) and hands the
//! result back via [`commit`](CaptureController::commit), or calls
//! [`abort_capture`](CaptureController::abort_capture) if the encode
//! failed.

use crate::classify::{self, CaptureStep, PoseFit};
use crate::config::ScanConfig;
use crate::gate::StabilityGate;
use crate::landmarks::{FaceLandmarks, LandmarkFrame};
use crate::pipeline::CapturedImage;
use crate::pose::{self, YawSmoother};
use crate::session::{CaptureSession, CaptureSet, SessionError, SessionSnapshot, StepAdvance};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("no capture in flight")]
    NoCaptureInFlight,
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// What the user should do next, in their own (mirrored) frame of
/// reference. Presentation strings are the host's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Guidance {
    /// No face in frame.
    NoFace,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    TurnFurtherLeft,
    TurnFurtherRight,
    FaceCamera,
    /// Pose is correct: hold still while the gate accumulates.
    Hold,
}

/// Per-frame feedback for the host/UI layer.
#[derive(Debug, Clone, Copy)]
pub struct FrameStatus {
    /// The step the session is waiting on.
    pub step: CaptureStep,
    /// Smoothed yaw estimate; `None` on a no-face frame.
    pub yaw: Option<f32>,
    /// How close the pose is to the requirement (guide-frame color).
    pub fit: PoseFit,
    pub pose_ok: bool,
    pub guidance: Guidance,
    /// Fraction of the required hold accumulated (countdown ring).
    pub hold_progress: f32,
    /// Set on the single frame where the gate fires: freeze the live
    /// frame for this step and `commit` the result.
    pub capture: Option<CaptureStep>,
    /// The user has been stuck on this step past the ceiling.
    pub trouble: bool,
    /// False once the session is done and the dispatcher is disabled.
    pub active: bool,
}

impl FrameStatus {
    fn disabled() -> Self {
        Self {
            step: CaptureStep::Done,
            yaw: None,
            fit: PoseFit::Off,
            pose_ok: false,
            guidance: Guidance::NoFace,
            hold_progress: 0.0,
            capture: None,
            trouble: false,
            active: false,
        }
    }
}

/// Outcome of committing a captured still.
#[derive(Debug)]
pub enum Commit {
    /// Session advanced; the controller now waits on this step.
    Advanced(CaptureStep),
    /// All three stills captured; the dispatcher is now disabled and
    /// the set is ready for the analysis handoff.
    Complete(CaptureSet),
}

/// Serializable view of the controller for persistence or rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub session: SessionSnapshot,
    /// Milliseconds the current pose has been held, if any.
    pub hold_ms: Option<u64>,
    pub capturing: bool,
}

/// Capture latch. `Capturing` covers gate-fire to commit/abort;
/// `Cooldown` covers the flash pause after a commit. The gate is held
/// cleared in both, so a sustained pose cannot double-fire.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Awaiting,
    Capturing,
    Cooldown { until: Instant },
    Done,
}

pub struct CaptureController {
    config: ScanConfig,
    session: CaptureSession,
    gate: StabilityGate,
    smoother: YawSmoother,
    phase: Phase,
    step_entered_at: Option<Instant>,
}

impl CaptureController {
    pub fn new(config: ScanConfig) -> Self {
        let gate = StabilityGate::new(config.min_hold());
        let smoother = YawSmoother::new(config.yaw.ema_alpha);
        Self {
            config,
            session: CaptureSession::new(),
            gate,
            smoother,
            phase: Phase::Awaiting,
            step_entered_at: None,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The dispatcher consumes frames until the session is done.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Done
    }

    pub fn current_step(&self) -> CaptureStep {
        self.session.current_step()
    }

    /// Feed one landmark-stream reading at its delivery time.
    ///
    /// Frames must arrive in delivery order; the gate's dwell
    /// calculation depends on it.
    pub fn on_frame(&mut self, frame: LandmarkFrame, now: Instant) -> FrameStatus {
        if self.phase == Phase::Done {
            return FrameStatus::disabled();
        }

        let entered = *self.step_entered_at.get_or_insert(now);
        let trouble = now.duration_since(entered) >= self.config.step_ceiling();
        let step = self.session.current_step();

        // Leave cooldown once the pause has elapsed.
        if let Phase::Cooldown { until } = self.phase {
            if now >= until {
                self.phase = Phase::Awaiting;
            }
        }

        let lm = match frame.landmarks() {
            Some(lm) => *lm,
            None => {
                // Normal transient: drop the stability window and wait.
                self.gate.reset();
                return FrameStatus {
                    step,
                    yaw: None,
                    fit: PoseFit::Off,
                    pose_ok: false,
                    guidance: Guidance::NoFace,
                    hold_progress: 0.0,
                    capture: None,
                    trouble,
                    active: true,
                };
            }
        };

        let raw = pose::estimate_yaw(&lm, &self.config.yaw);
        let yaw = self.smoother.apply(raw);
        let fit = classify::fit(yaw, step, &self.config.thresholds);
        let centered = self.is_centered(&lm);
        // The front still must also be framed; side angles only need
        // the yaw band.
        let pose_ok = classify::satisfies(yaw, step, &self.config.thresholds)
            && (step != CaptureStep::Front || centered);

        let capture = match self.phase {
            Phase::Awaiting => {
                if self.gate.update(pose_ok, now) {
                    self.phase = Phase::Capturing;
                    tracing::debug!(%step, yaw, "stability gate fired");
                    Some(step)
                } else {
                    None
                }
            }
            // Latched: no accumulation while a capture or its cooldown
            // is in flight.
            _ => {
                self.gate.reset();
                None
            }
        };

        FrameStatus {
            step,
            yaw: Some(yaw),
            fit,
            pose_ok,
            guidance: self.guidance(step, yaw, &lm, pose_ok, centered),
            hold_progress: self.gate.progress(now),
            capture,
            trouble,
            active: true,
        }
    }

    /// Hand back the still rastered for the pending capture request.
    pub fn commit(&mut self, image: CapturedImage, now: Instant) -> Result<Commit, ControllerError> {
        if self.phase != Phase::Capturing {
            return Err(ControllerError::NoCaptureInFlight);
        }

        let step = image.step;
        match self.session.store(image)? {
            StepAdvance::Next(next) => {
                tracing::info!(%step, %next, "still captured, advancing");
                self.enter_step(now);
                self.phase = Phase::Cooldown {
                    until: now + self.config.capture_cooldown(),
                };
                Ok(Commit::Advanced(next))
            }
            StepAdvance::Complete(set) => {
                tracing::info!(%step, session = %self.session.id(), "session complete");
                self.phase = Phase::Done;
                Ok(Commit::Complete(set))
            }
        }
    }

    /// The raster/encode for the pending capture failed. Clears the
    /// latch so the gate can re-trigger once the pose is next held;
    /// the state machine does not advance.
    pub fn abort_capture(&mut self) {
        if self.phase == Phase::Capturing {
            tracing::debug!(step = %self.session.current_step(), "capture aborted, re-arming gate");
            self.phase = Phase::Awaiting;
            self.gate.reset();
        }
    }

    /// Discard the stored still for `step` and go back to capture it
    /// again. Valid until the session completes.
    pub fn retake(&mut self, step: CaptureStep, now: Instant) -> Result<(), ControllerError> {
        if self.phase == Phase::Done {
            return Err(ControllerError::Session(SessionError::AlreadyComplete));
        }
        self.session.retake(step)?;
        tracing::info!(%step, "retake requested");
        self.phase = Phase::Awaiting;
        self.enter_step(now);
        Ok(())
    }

    /// Cancel the session, discarding any partial captures.
    pub fn cancel(self) {
        tracing::info!(session = %self.session.id(), step = %self.session.current_step(), "session cancelled");
    }

    pub fn snapshot(&self, now: Instant) -> ControllerSnapshot {
        ControllerSnapshot {
            session: self.session.snapshot(),
            hold_ms: self
                .gate
                .holding_for(now)
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            capturing: self.phase == Phase::Capturing,
        }
    }

    /// Reset the per-step ephemera on every step transition: stability
    /// window, smoothed yaw, step timer.
    fn enter_step(&mut self, now: Instant) {
        self.gate.reset();
        self.smoother.reset();
        self.step_entered_at = Some(now);
    }

    fn is_centered(&self, lm: &FaceLandmarks) -> bool {
        let tol = self.config.center_tolerance;
        (lm.nose_tip.x - 0.5).abs() <= tol && (lm.nose_tip.y - 0.5).abs() <= tol
    }

    fn guidance(
        &self,
        step: CaptureStep,
        yaw: f32,
        lm: &FaceLandmarks,
        pose_ok: bool,
        centered: bool,
    ) -> Guidance {
        if pose_ok {
            return Guidance::Hold;
        }
        // Framing first, angle second; directions are mirrored to the
        // user's own point of view.
        if step == CaptureStep::Front && !centered {
            let cx = lm.nose_tip.x - 0.5;
            let cy = lm.nose_tip.y - 0.5;
            if cx.abs() >= cy.abs() {
                return if cx > 0.0 {
                    Guidance::MoveRight
                } else {
                    Guidance::MoveLeft
                };
            }
            return if cy > 0.0 {
                Guidance::MoveUp
            } else {
                Guidance::MoveDown
            };
        }
        match step {
            CaptureStep::Left if yaw > -self.config.thresholds.side_min => {
                Guidance::TurnFurtherLeft
            }
            CaptureStep::Right if yaw < self.config.thresholds.side_min => {
                Guidance::TurnFurtherRight
            }
            _ => Guidance::FaceCamera,
        }
    }
}
