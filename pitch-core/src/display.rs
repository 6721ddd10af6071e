//! Display values emitted to front-ends after each processed block.

use serde::Serialize;

use crate::NoteEstimate;

/// Full-scale range of the deviation bar, in cents either side of the reference.
pub const BAR_FULL_SCALE_CENTS: f64 = 200.0;

pub const NO_FREQUENCY_TEXT: &str = "-- Hz";
pub const NO_NOTE_TEXT: &str = "--";
pub const LISTENING_STATUS: &str = "Listening...";

/// What a display sink should show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayUpdate {
    /// A fresh voiced reading.
    Reading {
        frequency: String,
        note: String,
        status: String,
        bar_deviation_cents: f64,
    },
    /// Keep the previous reading, only the status line changes.
    Holding { status: String },
    /// Back to the neutral "no signal" state.
    NoSignal {
        frequency: String,
        note: String,
        status: String,
        bar_deviation_cents: f64,
    },
}

impl DisplayUpdate {
    pub fn reading(frequency_hz: f64, estimate: &NoteEstimate, rms: f64, full_scale: f64) -> Self {
        Self::Reading {
            frequency: format_frequency(frequency_hz),
            note: format_note(&estimate.note_name, estimate.cents_offset),
            status: format!("Level {rms:.2}"),
            bar_deviation_cents: clamp_bar(estimate.reference_delta_cents, full_scale),
        }
    }

    pub fn holding(last_rms: f64) -> Self {
        Self::Holding {
            status: format!("Holding (Level {last_rms:.2})"),
        }
    }

    pub fn no_signal() -> Self {
        Self::NoSignal {
            frequency: NO_FREQUENCY_TEXT.to_string(),
            note: NO_NOTE_TEXT.to_string(),
            status: LISTENING_STATUS.to_string(),
            bar_deviation_cents: 0.0,
        }
    }

    pub fn status(&self) -> &str {
        match self {
            Self::Reading { status, .. }
            | Self::Holding { status }
            | Self::NoSignal { status, .. } => status,
        }
    }
}

/// "220.0 Hz"
pub fn format_frequency(frequency_hz: f64) -> String {
    format!("{frequency_hz:.1} Hz")
}

/// "A3 (+4¢)"
pub fn format_note(note_name: &str, cents_offset: f64) -> String {
    format!("{note_name} ({cents_offset:+.0}¢)")
}

/// Limits a deviation to the bar's full-scale range.
pub fn clamp_bar(cents: f64, full_scale: f64) -> f64 {
    cents.clamp(-full_scale, full_scale)
}
