//! Continuous-time exponential smoothing of the detected frequency.
//!
//! Blocks do not arrive at a fixed rate, so the smoothing coefficient is
//! derived from the real elapsed time between updates rather than a fixed
//! per-block factor.

use std::time::Duration;

/// Default smoothing time constant.
pub const SMOOTHING_TAU: Duration = Duration::from_millis(350);

/// Smooths `sample` towards `previous` with time constant `tau`.
///
/// A `previous` of zero (nothing observed since the last reset) or a zero
/// `elapsed` passes `sample` through unchanged.
pub fn smooth_frequency_with_tau(
    previous: f64,
    elapsed: Duration,
    sample: f64,
    tau: Duration,
) -> f64 {
    if previous == 0.0 || elapsed.is_zero() || tau.is_zero() {
        return sample;
    }
    let alpha = 1.0 - (-elapsed.as_secs_f64() / tau.as_secs_f64()).exp();
    previous + alpha * (sample - previous)
}

/// [`smooth_frequency_with_tau`] with the default 350 ms time constant.
pub fn smooth_frequency(previous: f64, elapsed: Duration, sample: f64) -> f64 {
    smooth_frequency_with_tau(previous, elapsed, sample, SMOOTHING_TAU)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tau_moves_about_63_percent() {
        let smoothed = smooth_frequency(200.0, Duration::from_millis(350), 400.0);
        assert!(smoothed > 200.0 && smoothed < 400.0);
        assert!((smoothed - 326.0).abs() < 20.0, "got {smoothed}");
    }

    #[test]
    fn first_sample_bypasses_smoothing() {
        assert_eq!(smooth_frequency(0.0, Duration::from_millis(100), 220.0), 220.0);
    }

    #[test]
    fn zero_elapsed_bypasses_smoothing() {
        assert_eq!(smooth_frequency(200.0, Duration::ZERO, 300.0), 300.0);
    }

    #[test]
    fn longer_gaps_converge_further() {
        let short = smooth_frequency(200.0, Duration::from_millis(20), 300.0);
        let long = smooth_frequency(200.0, Duration::from_millis(2000), 300.0);
        assert!(short < long);
        assert!(long < 300.0 && long > 299.0);
    }

    #[test]
    fn smoothing_works_downwards() {
        let smoothed = smooth_frequency(400.0, Duration::from_millis(350), 200.0);
        assert!(smoothed < 400.0 && smoothed > 200.0);
    }
}
