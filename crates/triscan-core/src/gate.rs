//! Stability gate — dwell-time accumulation over a noisy verdict stream.
//!
//! A single favorable frame is not evidence of a deliberately held
//! pose: a head sweeping through the target band would otherwise
//! trigger mid-motion captures. The gate requires the classifier
//! verdict to hold continuously for a minimum duration, measured on the
//! event delivery clock so it stays correct under frame drops.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct StabilityGate {
    min_hold: Duration,
    /// Start of the current continuous run of true verdicts.
    started: Option<Instant>,
    /// Set once ready has fired for the current run, so a sustained
    /// pose reports ready exactly once.
    fired: bool,
}

impl StabilityGate {
    pub fn new(min_hold: Duration) -> Self {
        Self {
            min_hold,
            started: None,
            fired: false,
        }
    }

    /// Feed one classifier verdict at its delivery time.
    ///
    /// Returns true exactly once per continuous run of true verdicts,
    /// on the first frame where the run length reaches the minimum
    /// hold. A false verdict clears the window and re-arms the gate.
    pub fn update(&mut self, verdict: bool, now: Instant) -> bool {
        if !verdict {
            self.reset();
            return false;
        }

        let started = *self.started.get_or_insert(now);
        if self.fired {
            return false;
        }
        if now.duration_since(started) >= self.min_hold {
            self.fired = true;
            return true;
        }
        false
    }

    /// Clear the window. Called by the controller on step transitions,
    /// cancellation, and while a capture or its cooldown is in flight.
    pub fn reset(&mut self) {
        self.started = None;
        self.fired = false;
    }

    /// How long the verdict has currently been held, if at all.
    pub fn holding_for(&self, now: Instant) -> Option<Duration> {
        self.started.map(|s| now.duration_since(s))
    }

    /// Fraction of the required hold already accumulated, in [0, 1].
    /// Drives the on-screen countdown ring.
    pub fn progress(&self, now: Instant) -> f32 {
        match self.holding_for(now) {
            Some(held) if !self.min_hold.is_zero() => {
                (held.as_secs_f32() / self.min_hold.as_secs_f32()).min(1.0)
            }
            Some(_) => 1.0,
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> StabilityGate {
        StabilityGate::new(Duration::from_millis(1000))
    }

    #[test]
    fn test_single_true_frame_is_not_ready() {
        let t0 = Instant::now();
        let mut g = gate();
        assert!(!g.update(true, t0));
    }

    #[test]
    fn test_ready_fires_at_min_hold() {
        let t0 = Instant::now();
        let mut g = gate();
        assert!(!g.update(true, t0));
        assert!(!g.update(true, t0 + Duration::from_millis(500)));
        assert!(!g.update(true, t0 + Duration::from_millis(999)));
        assert!(g.update(true, t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn test_ready_fires_exactly_once_per_run() {
        let t0 = Instant::now();
        let mut g = gate();
        g.update(true, t0);
        assert!(g.update(true, t0 + Duration::from_millis(1100)));
        // Sustained pose: no further ready signals.
        assert!(!g.update(true, t0 + Duration::from_millis(1200)));
        assert!(!g.update(true, t0 + Duration::from_millis(3000)));
    }

    #[test]
    fn test_false_verdict_clears_accumulated_time() {
        let t0 = Instant::now();
        let mut g = gate();
        g.update(true, t0);
        g.update(false, t0 + Duration::from_millis(900));
        // New run starts from scratch.
        assert!(!g.update(true, t0 + Duration::from_millis(1000)));
        assert!(!g.update(true, t0 + Duration::from_millis(1900)));
        assert!(g.update(true, t0 + Duration::from_millis(2000)));
    }

    #[test]
    fn test_interrupted_run_never_reports_ready() {
        let t0 = Instant::now();
        let mut g = gate();
        for ms in (0..1000).step_by(100) {
            assert!(!g.update(true, t0 + Duration::from_millis(ms)));
        }
        // Interrupt at 999ms-equivalent: nothing fired above because
        // the last update was at 900ms.
        assert!(!g.update(false, t0 + Duration::from_millis(950)));
        assert!(g.holding_for(t0 + Duration::from_millis(950)).is_none());
    }

    #[test]
    fn test_re_arms_after_firing_and_reset() {
        let t0 = Instant::now();
        let mut g = gate();
        g.update(true, t0);
        assert!(g.update(true, t0 + Duration::from_millis(1000)));
        g.update(false, t0 + Duration::from_millis(1500));
        g.update(true, t0 + Duration::from_millis(2000));
        assert!(g.update(true, t0 + Duration::from_millis(3000)));
    }

    #[test]
    fn test_progress_ramps_and_saturates() {
        let t0 = Instant::now();
        let mut g = gate();
        assert_eq!(g.progress(t0), 0.0);
        g.update(true, t0);
        let half = g.progress(t0 + Duration::from_millis(500));
        assert!((half - 0.5).abs() < 0.01, "got {half}");
        assert_eq!(g.progress(t0 + Duration::from_millis(5000)), 1.0);
    }
}
