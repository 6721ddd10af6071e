// pitch-core/src/lib.rs

//! The core logic for the voice pitch monitor.
//! This crate is responsible for audio capture, pitch detection,
//! voicing/smoothing and note mapping. It is completely headless
//! and contains no UI code; front-ends consume [`display::DisplayUpdate`]s.

pub mod audio;
pub mod config;
pub mod display;
pub mod monitor;
pub mod pitch;
pub mod reference;
pub mod session;
pub mod smoothing;
pub mod tuning;
pub mod voicing;

use serde::Serialize;

/// One fixed-size block of mono audio, tagged with the rate it was captured at.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }
}

/// Represents the result of running the pitch detector on a single block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionResult {
    /// The detected fundamental in Hz, if the block was voiced.
    pub frequency_hz: Option<f64>,
    /// RMS energy of the DC-corrected block.
    pub rms: f64,
}

impl DetectionResult {
    pub fn voiced(frequency_hz: f64, rms: f64) -> Self {
        Self { frequency_hz: Some(frequency_hz), rms }
    }

    pub fn unvoiced(rms: f64) -> Self {
        Self { frequency_hz: None, rms }
    }
}

/// A smoothed frequency mapped onto the chromatic scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteEstimate {
    /// Nearest note, e.g. "A4".
    pub note_name: String,
    /// Offset from the nearest note's exact frequency.
    pub cents_offset: f64,
    /// Offset from the current reference tone (unclamped).
    pub reference_delta_cents: f64,
}
