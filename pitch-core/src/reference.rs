//! # Reference Module
//!
//! Holds the user-selected reference tone and measures how far a detected
//! frequency sits from it.
//!
//! The reference is written rarely (user selection) and read once per
//! processed block, so it lives in a reader/writer lock and readers take a
//! cloned snapshot instead of holding the lock across a tick.

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::tuning::{self, NoteError, A4_FREQUENCY};

/// Reference used when nothing else is configured.
pub const DEFAULT_REFERENCE_NOTE: &str = "A3";

/// A named target pitch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceTone {
    pub note_name: String,
    pub frequency_hz: f64,
}

impl ReferenceTone {
    /// Builds a reference tone from a note in the selectable range.
    pub fn from_note(name: &str) -> Result<Self, NoteError> {
        if !tuning::is_reference_note(name) {
            return Err(NoteError::InvalidNoteName(name.to_string()));
        }
        let frequency_hz = tuning::note_name_to_freq(name)?;
        Ok(Self {
            note_name: name.to_string(),
            frequency_hz,
        })
    }

    /// Picks the preferred note if valid, then the default, then the lowest
    /// note of the reference range.
    pub fn resolve(preferred: Option<&str>) -> Self {
        if let Some(name) = preferred {
            match Self::from_note(name) {
                Ok(tone) => return tone,
                Err(e) => warn!("{e}; falling back to {DEFAULT_REFERENCE_NOTE}"),
            }
        }
        Self::from_note(DEFAULT_REFERENCE_NOTE).unwrap_or_else(|_| Self::lowest())
    }

    fn lowest() -> Self {
        let midi = tuning::REFERENCE_MIDI_LOW;
        Self {
            note_name: tuning::midi_to_name(midi),
            frequency_hz: tuning::midi_to_freq(midi),
        }
    }
}

/// Shared, concurrently updatable reference tone.
#[derive(Debug)]
pub struct ReferenceCell {
    tone: RwLock<ReferenceTone>,
}

impl ReferenceCell {
    pub fn new(tone: ReferenceTone) -> Self {
        Self { tone: RwLock::new(tone) }
    }

    /// Returns a copy of the current reference.
    pub fn snapshot(&self) -> ReferenceTone {
        self.tone.read().clone()
    }

    pub fn set(&self, tone: ReferenceTone) {
        info!("Reference set to {} ({:.2} Hz)", tone.note_name, tone.frequency_hz);
        *self.tone.write() = tone;
    }

    /// Validates `name` against the reference range and installs it.
    ///
    /// On error the current reference is left untouched.
    pub fn set_note(&self, name: &str) -> Result<ReferenceTone, NoteError> {
        let tone = ReferenceTone::from_note(name)?;
        self.set(tone.clone());
        Ok(tone)
    }
}

impl Default for ReferenceCell {
    fn default() -> Self {
        Self::new(ReferenceTone::resolve(None))
    }
}

/// Cents from `reference_freq` to `measured_freq`.
///
/// A non-positive reference is replaced by 440 Hz. The result is unbounded.
pub fn deviation_cents(measured_freq: f64, reference_freq: f64) -> f64 {
    let reference = if reference_freq <= 0.0 { A4_FREQUENCY } else { reference_freq };
    tuning::cents_between(measured_freq, reference)
}
