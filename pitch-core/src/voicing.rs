//! # Voicing Gate Module
//!
//! Decides, block by block, whether the display should follow a new
//! detection, hold the last one through a short dropout, or fall back to
//! "no signal". Owns the smoothing state for one monitoring session.

use std::time::{Duration, Instant};

use crate::DetectionResult;
use crate::pitch::SILENCE_FLOOR;
use crate::smoothing::{SMOOTHING_TAU, smooth_frequency_with_tau};

/// How long a voiced reading is held through silence.
pub const SILENCE_HOLD: Duration = Duration::from_secs(3);

/// Per-stream smoothing memory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothingState {
    /// Zero exactly when nothing voiced has been seen since the last reset.
    pub smoothed_frequency_hz: f64,
    pub last_update: Option<Instant>,
    pub last_voiced: Option<Instant>,
    pub last_rms: f64,
}

/// What the gate decided for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateOutcome {
    /// New detection, already smoothed.
    Voiced { smoothed_hz: f64, rms: f64 },
    /// Brief dropout: keep showing the previous reading.
    Held { last_rms: f64 },
    /// No signal; smoothing state has been cleared.
    Reset,
}

#[derive(Debug, Clone)]
pub struct VoicingGate {
    silence_floor: f64,
    silence_hold: Duration,
    tau: Duration,
    state: SmoothingState,
}

impl Default for VoicingGate {
    fn default() -> Self {
        Self::new(SILENCE_FLOOR, SILENCE_HOLD, SMOOTHING_TAU)
    }
}

impl VoicingGate {
    pub fn new(silence_floor: f64, silence_hold: Duration, tau: Duration) -> Self {
        Self {
            silence_floor,
            silence_hold,
            tau,
            state: SmoothingState::default(),
        }
    }

    pub fn state(&self) -> &SmoothingState {
        &self.state
    }

    /// Clears all smoothing memory, as on a stream restart.
    pub fn reset(&mut self) {
        self.state = SmoothingState::default();
    }

    /// Advances the gate with the detection for the block observed at `now`.
    ///
    /// # Arguments
    /// * `detection` - Result of the pitch detector for this block
    /// * `now` - When the block was processed
    ///
    /// # Returns
    /// * `GateOutcome::Voiced` - a frequency was found; state updated
    /// * `GateOutcome::Held` - silent block inside the hold window
    /// * `GateOutcome::Reset` - anything else; state cleared
    pub fn update(&mut self, detection: DetectionResult, now: Instant) -> GateOutcome {
        let Some(frequency) = detection.frequency_hz else {
            if self.within_hold(detection.rms, now) {
                return GateOutcome::Held { last_rms: self.state.last_rms };
            }
            self.reset();
            return GateOutcome::Reset;
        };

        let smoothed = match self.state.last_update {
            Some(last) => smooth_frequency_with_tau(
                self.state.smoothed_frequency_hz,
                now.saturating_duration_since(last),
                frequency,
                self.tau,
            ),
            None => frequency,
        };

        self.state = SmoothingState {
            smoothed_frequency_hz: smoothed,
            last_update: Some(now),
            last_voiced: Some(now),
            last_rms: detection.rms,
        };

        GateOutcome::Voiced { smoothed_hz: smoothed, rms: detection.rms }
    }

    fn within_hold(&self, rms: f64, now: Instant) -> bool {
        // Only true silence is held; unpitched noise resets immediately.
        rms < self.silence_floor
            && self
                .state
                .last_voiced
                .is_some_and(|voiced| now.saturating_duration_since(voiced) < self.silence_hold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn first_voiced_block_passes_through() {
        let mut gate = VoicingGate::default();
        let now = Instant::now();
        let outcome = gate.update(DetectionResult::voiced(220.0, 0.3), now);
        assert_eq!(outcome, GateOutcome::Voiced { smoothed_hz: 220.0, rms: 0.3 });
        assert_eq!(gate.state().last_voiced, Some(now));
        assert_eq!(gate.state().last_rms, 0.3);
    }

    #[test]
    fn consecutive_blocks_are_smoothed() {
        let mut gate = VoicingGate::default();
        let t0 = Instant::now();
        gate.update(DetectionResult::voiced(200.0, 0.3), t0);
        match gate.update(DetectionResult::voiced(400.0, 0.3), t0 + ms(350)) {
            GateOutcome::Voiced { smoothed_hz, .. } => {
                assert!((smoothed_hz - 326.0).abs() < 20.0, "got {smoothed_hz}");
            }
            other => panic!("expected voiced, got {other:?}"),
        }
    }

    #[test]
    fn silence_without_history_resets() {
        let mut gate = VoicingGate::default();
        let outcome = gate.update(DetectionResult::unvoiced(0.0), Instant::now());
        assert_eq!(outcome, GateOutcome::Reset);
        assert_eq!(gate.state().smoothed_frequency_hz, 0.0);
    }

    #[test]
    fn short_silence_is_held_with_last_level() {
        let mut gate = VoicingGate::default();
        let t0 = Instant::now();
        gate.update(DetectionResult::voiced(220.0, 0.25), t0);
        let outcome = gate.update(DetectionResult::unvoiced(0.001), t0 + ms(1500));
        assert_eq!(outcome, GateOutcome::Held { last_rms: 0.25 });
        assert_eq!(gate.state().smoothed_frequency_hz, 220.0);
    }

    #[test]
    fn hold_expires_after_three_seconds() {
        let mut gate = VoicingGate::default();
        let t0 = Instant::now();
        gate.update(DetectionResult::voiced(220.0, 0.25), t0);
        assert!(matches!(
            gate.update(DetectionResult::unvoiced(0.0), t0 + ms(2999)),
            GateOutcome::Held { .. }
        ));
        assert_eq!(gate.update(DetectionResult::unvoiced(0.0), t0 + ms(3000)), GateOutcome::Reset);
        assert_eq!(*gate.state(), SmoothingState::default());
    }

    #[test]
    fn loud_unpitched_block_resets_immediately() {
        let mut gate = VoicingGate::default();
        let t0 = Instant::now();
        gate.update(DetectionResult::voiced(220.0, 0.25), t0);
        let outcome = gate.update(DetectionResult::unvoiced(0.2), t0 + ms(100));
        assert_eq!(outcome, GateOutcome::Reset);
    }

    #[test]
    fn voicing_after_reset_starts_fresh() {
        let mut gate = VoicingGate::default();
        let t0 = Instant::now();
        gate.update(DetectionResult::voiced(200.0, 0.3), t0);
        gate.update(DetectionResult::unvoiced(0.3), t0 + ms(50));
        let outcome = gate.update(DetectionResult::voiced(400.0, 0.3), t0 + ms(100));
        assert_eq!(outcome, GateOutcome::Voiced { smoothed_hz: 400.0, rms: 0.3 });
    }
}
