//! # Pitch Detection Module
//!
//! This module estimates the fundamental frequency of a block of mono audio
//! using time-domain autocorrelation over a bounded lag range.
//!
//! ## Features
//! - DC offset removal before analysis
//! - RMS noise gate to skip silent blocks entirely
//! - Lag search bounded to the human vocal range (70 - 900 Hz by default)
//! - Deterministic tie-break: the earliest (shortest) lag wins

use serde::{Deserialize, Serialize};

use crate::DetectionResult;

/// Lowest fundamental the detector will report, in Hz.
pub const MIN_PITCH_HZ: f64 = 70.0;

/// Highest fundamental the detector will report, in Hz.
pub const MAX_PITCH_HZ: f64 = 900.0;

/// RMS level below which a block is treated as silence.
pub const SILENCE_FLOOR: f64 = 0.005;

/// Tunable bounds for the pitch search and the noise gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub min_pitch_hz: f64,
    pub max_pitch_hz: f64,
    pub silence_floor: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_pitch_hz: MIN_PITCH_HZ,
            max_pitch_hz: MAX_PITCH_HZ,
            silence_floor: SILENCE_FLOOR,
        }
    }
}

/// Autocorrelation pitch detector.
///
/// Stateless apart from its settings, so one instance can be shared by every
/// block of a stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct PitchDetector {
    settings: DetectorSettings,
}

impl PitchDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Detects the dominant pitch in a block of samples.
    ///
    /// This function:
    /// 1. Removes the DC offset and computes the RMS of the centred signal
    /// 2. Returns early with no pitch if the RMS is below the silence floor
    /// 3. Searches every lag in the allowed range for the highest positive
    ///    autocorrelation
    /// 4. Converts the winning lag to a frequency and range-checks it
    ///
    /// # Arguments
    /// * `samples` - Mono audio samples, roughly in [-1, 1]
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Returns
    /// * `DetectionResult` - The RMS of the block, and the frequency if one
    ///   was found inside `[min_pitch_hz, max_pitch_hz]`
    pub fn detect(&self, samples: &[f32], sample_rate: f64) -> DetectionResult {
        if samples.is_empty() {
            return DetectionResult::unvoiced(0.0);
        }

        let normalized = remove_dc_offset(samples);
        let rms = rms(&normalized);
        if rms < self.settings.silence_floor {
            return DetectionResult::unvoiced(rms);
        }

        let min_lag = (sample_rate / self.settings.max_pitch_hz) as usize;
        let max_lag =
            ((sample_rate / self.settings.min_pitch_hz) as usize).min(normalized.len() - 1);

        let mut best_lag = 0;
        let mut best_corr = 0.0;
        for lag in min_lag..=max_lag {
            let corr = autocorrelation(&normalized, lag);
            // Strict comparison keeps the shortest lag on ties.
            if corr > best_corr {
                best_corr = corr;
                best_lag = lag;
            }
        }

        if best_lag == 0 {
            return DetectionResult::unvoiced(rms);
        }

        let frequency = sample_rate / best_lag as f64;
        if frequency < self.settings.min_pitch_hz || frequency > self.settings.max_pitch_hz {
            return DetectionResult::unvoiced(rms);
        }

        DetectionResult::voiced(frequency, rms)
    }
}

/// Detects pitch with the default vocal-range settings.
///
/// Convenience wrapper around [`PitchDetector::detect`].
pub fn detect_pitch(samples: &[f32], sample_rate: f64) -> DetectionResult {
    PitchDetector::default().detect(samples, sample_rate)
}

/// Returns a copy of the signal centred on zero.
fn remove_dc_offset(signal: &[f32]) -> Vec<f64> {
    let mean = signal.iter().map(|&s| s as f64).sum::<f64>() / signal.len() as f64;
    signal.iter().map(|&s| s as f64 - mean).collect()
}

fn rms(signal: &[f64]) -> f64 {
    let energy: f64 = signal.iter().map(|s| s * s).sum();
    (energy / signal.len() as f64).sqrt()
}

/// Unnormalized autocorrelation at `lag` over the overlapping range.
fn autocorrelation(signal: &[f64], lag: usize) -> f64 {
    signal
        .iter()
        .zip(&signal[lag..])
        .map(|(a, b)| a * b)
        .sum()
}
