//! Capture session state machine.
//!
//! Owns the per-session aggregate: the current step cursor and the
//! accumulated stills. The step sequence is an index into
//! [`CAPTURE_ORDER`](crate::classify::CAPTURE_ORDER) rather than three
//! bespoke fields, so a retake can move the cursor backwards and
//! advancing skips steps that already hold an image.

use crate::classify::{CaptureStep, CAPTURE_ORDER};
use crate::pipeline::CapturedImage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("image attributed to step {got}, but the current step is {expected}")]
    WrongStep {
        expected: CaptureStep,
        got: CaptureStep,
    },
    #[error("session is already complete")]
    AlreadyComplete,
    #[error("step {0} is not part of the capture order")]
    NotRetakable(CaptureStep),
}

/// The three stills of a finished session, handed off to the analysis
/// collaborator.
#[derive(Debug, Clone)]
pub struct CaptureSet {
    pub front: CapturedImage,
    pub left: CapturedImage,
    pub right: CapturedImage,
}

impl CaptureSet {
    /// Iterate the stills in capture order.
    pub fn iter(&self) -> impl Iterator<Item = &CapturedImage> {
        [&self.front, &self.left, &self.right].into_iter()
    }
}

/// Outcome of storing a captured still.
#[derive(Debug)]
pub enum StepAdvance {
    /// Capture accepted; the session moved on to this step.
    Next(CaptureStep),
    /// All steps captured; the session is done and yields its images.
    Complete(CaptureSet),
}

/// Collector for the downstream analysis handoff (spec'd only at this
/// boundary; the report shape it returns is not this crate's concern).
pub trait AnalysisSink {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Receive exactly three encoded stills, keyed front/left/right.
    fn submit(&mut self, set: &CaptureSet) -> Result<(), Self::Error>;
}

/// Serializable view of the session for hosts that persist or render
/// capture progress.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub step: CaptureStep,
    pub captured: Vec<CaptureStep>,
    pub started_at: DateTime<Utc>,
}

/// One guided capture session: lives while the capture screen is open,
/// discarded on cancel, consumed by the handoff once complete.
#[derive(Debug)]
pub struct CaptureSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    images: [Option<CapturedImage>; 3],
    /// Index into `CAPTURE_ORDER`; `CAPTURE_ORDER.len()` means done.
    cursor: usize,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            images: [None, None, None],
            cursor: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The step the session is currently waiting on.
    pub fn current_step(&self) -> CaptureStep {
        CAPTURE_ORDER
            .get(self.cursor)
            .copied()
            .unwrap_or(CaptureStep::Done)
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= CAPTURE_ORDER.len()
    }

    /// Store a still for the current step and advance.
    ///
    /// An image attributed to any other step is rejected: a capture can
    /// never land on a step that was not active when the gate fired.
    pub fn store(&mut self, image: CapturedImage) -> Result<StepAdvance, SessionError> {
        let expected = self.current_step();
        if expected.is_terminal() {
            return Err(SessionError::AlreadyComplete);
        }
        if image.step != expected {
            return Err(SessionError::WrongStep {
                expected,
                got: image.step,
            });
        }

        self.images[self.cursor] = Some(image);
        self.advance_cursor();

        if self.is_complete() {
            // All three slots are filled by construction.
            let [front, left, right] = std::mem::take(&mut self.images);
            let set = CaptureSet {
                front: front.ok_or(SessionError::AlreadyComplete)?,
                left: left.ok_or(SessionError::AlreadyComplete)?,
                right: right.ok_or(SessionError::AlreadyComplete)?,
            };
            Ok(StepAdvance::Complete(set))
        } else {
            Ok(StepAdvance::Next(self.current_step()))
        }
    }

    /// Discard the stored image for `step` and move the cursor back to
    /// it. Later captures are kept; advancing skips their steps.
    pub fn retake(&mut self, step: CaptureStep) -> Result<(), SessionError> {
        if self.is_complete() {
            return Err(SessionError::AlreadyComplete);
        }
        let idx = step.index().ok_or(SessionError::NotRetakable(step))?;
        self.images[idx] = None;
        self.cursor = idx;
        Ok(())
    }

    /// Move the cursor to the next step without a stored image.
    fn advance_cursor(&mut self) {
        self.cursor += 1;
        while self.cursor < CAPTURE_ORDER.len() && self.images[self.cursor].is_some() {
            self.cursor += 1;
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            step: self.current_step(),
            captured: CAPTURE_ORDER
                .iter()
                .zip(self.images.iter())
                .filter_map(|(&s, img)| img.is_some().then_some(s))
                .collect(),
            started_at: self.started_at,
        }
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}
