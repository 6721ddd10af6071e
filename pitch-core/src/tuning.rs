//! # Musical Tuning Module
//!
//! This module maps frequencies onto the twelve-tone equal tempered scale
//! (A4 = 440 Hz) and back.
//!
//! ## Features
//! - Frequency to nearest note name with cents offset
//! - Note name ("C#3") to frequency, with strict validation
//! - MIDI number naming and frequency conversion
//! - The fixed reference range offered to the user (F#2 to F4)

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use thiserror::Error;

/// Concert pitch for A4.
pub const A4_FREQUENCY: f64 = 440.0;

/// MIDI number of A4.
pub const A4_MIDI: i32 = 69;

/// Lowest and highest MIDI numbers of the selectable reference range.
pub const REFERENCE_MIDI_LOW: i32 = 42;
pub const REFERENCE_MIDI_HIGH: i32 = 65;

/// Placeholder shown when there is no note to display.
pub const NO_NOTE: &str = "--";

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Errors produced when interpreting user-supplied note names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("invalid note name: {0:?}")]
    InvalidNoteName(String),
}

/// Static map for note name to semitone index lookups (C = 0 ... B = 11).
static SEMITONES: Lazy<BTreeMap<&'static str, i32>> = Lazy::new(|| {
    NOTE_NAMES
        .iter()
        .enumerate()
        .map(|(i, &name)| (name, i as i32))
        .collect()
});

/// The selectable reference notes, computed once.
static REFERENCE_NOTES: Lazy<Vec<String>> = Lazy::new(|| {
    (REFERENCE_MIDI_LOW..=REFERENCE_MIDI_HIGH)
        .map(midi_to_name)
        .collect()
});

/// Calculates the interval between two frequencies in cents.
///
/// Positive values mean `freq` is sharp of `target_freq`.
pub fn cents_between(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}

/// Finds the nearest equal-tempered note to a frequency.
///
/// The semitone offset from A4 is rounded half away from zero.
///
/// # Arguments
/// * `freq` - Input frequency in Hz
///
/// # Returns
/// * `(note_name, cents_offset)` - e.g. `("A4", 0.0)`; `("--", 0.0)` when
///   `freq` is not a positive finite number
pub fn frequency_to_note(freq: f64) -> (String, f64) {
    if !freq.is_finite() || freq <= 0.0 {
        return (NO_NOTE.to_string(), 0.0);
    }

    let n = (12.0 * (freq / A4_FREQUENCY).log2()).round();
    let midi = n as i32 + A4_MIDI;
    let target = A4_FREQUENCY * 2.0_f64.powf(n / 12.0);

    (midi_to_name(midi), cents_between(freq, target))
}

/// Converts a note name such as "A3" or "F#2" to its frequency.
///
/// The last character must be a single octave digit (0-9) and the rest must
/// be one of the twelve sharp-spelled names, case-sensitive.
pub fn note_name_to_freq(name: &str) -> Result<f64, NoteError> {
    parse_note(name).map(midi_to_freq)
}

/// Parses a note name into its MIDI number.
pub fn parse_note(name: &str) -> Result<i32, NoteError> {
    let invalid = || NoteError::InvalidNoteName(name.to_string());

    let mut chars = name.chars();
    let octave = chars
        .next_back()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(invalid)? as i32;
    let base = chars.as_str();
    let semitone = SEMITONES.get(base).copied().ok_or_else(invalid)?;

    Ok((octave + 1) * 12 + semitone)
}

/// Exact equal-tempered frequency of a MIDI note.
pub fn midi_to_freq(midi: i32) -> f64 {
    A4_FREQUENCY * 2.0_f64.powf((midi - A4_MIDI) as f64 / 12.0)
}

/// Names a MIDI note, e.g. 69 -> "A4".
pub fn midi_to_name(midi: i32) -> String {
    let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
    let octave = midi.div_euclid(12) - 1;
    format!("{name}{octave}")
}

/// Returns the selectable reference notes, ascending from F#2 to F4.
pub fn build_reference_notes() -> Vec<String> {
    REFERENCE_NOTES.clone()
}

/// Whether `name` is one of the selectable reference notes.
pub fn is_reference_note(name: &str) -> bool {
    REFERENCE_NOTES.iter().any(|n| n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a440_is_a4_with_no_offset() {
        let (name, cents) = frequency_to_note(440.0);
        assert_eq!(name, "A4");
        assert!(cents.abs() < 0.1, "got {cents}");
    }

    #[test]
    fn non_positive_frequency_has_no_note() {
        assert_eq!(frequency_to_note(0.0), ("--".to_string(), 0.0));
        assert_eq!(frequency_to_note(-10.0), ("--".to_string(), 0.0));
    }

    #[test]
    fn non_finite_frequency_has_no_note() {
        for freq in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert_eq!(frequency_to_note(freq), ("--".to_string(), 0.0));
        }
    }

    #[test]
    fn detuned_frequency_reports_signed_cents() {
        let sharp = 440.0 * 2.0_f64.powf(20.0 / 1200.0);
        let (name, cents) = frequency_to_note(sharp);
        assert_eq!(name, "A4");
        assert!((cents - 20.0).abs() < 1e-6);

        let flat = 220.0 * 2.0_f64.powf(-30.0 / 1200.0);
        let (name, cents) = frequency_to_note(flat);
        assert_eq!(name, "A3");
        assert!((cents + 30.0).abs() < 1e-6);
    }

    #[test]
    fn vocal_range_maps_within_a_semitone() {
        let mut freq = 70.0;
        while freq <= 900.0 {
            let (name, cents) = frequency_to_note(freq);
            let target = note_name_to_freq(&name).expect("mapper produced a parseable name");
            assert!(cents.abs() <= 50.0 + 1e-9, "{freq} -> {name} {cents}");
            assert!(cents_between(freq, target).abs() < 100.0);
            freq += 3.7;
        }
    }

    #[test]
    fn octave_boundaries_are_named_from_c() {
        assert_eq!(midi_to_name(60), "C4");
        assert_eq!(midi_to_name(59), "B3");
        assert_eq!(midi_to_name(0), "C-1");
        assert_eq!(frequency_to_note(261.63).0, "C4");
    }

    #[test]
    fn parses_valid_names() {
        assert!((note_name_to_freq("A3").unwrap() - 220.0).abs() < 0.5);
        assert_eq!(parse_note("C4"), Ok(60));
        assert_eq!(parse_note("F#2"), Ok(42));
        assert_eq!(parse_note("B9"), Ok(131));
    }

    #[test]
    fn rejects_invalid_names() {
        for bad in ["H#9", "", "A", "4", "Bb3", "a4", "C#", "C#10", "E#4", "A4 "] {
            assert_eq!(
                note_name_to_freq(bad),
                Err(NoteError::InvalidNoteName(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn reference_range_spans_f_sharp_2_to_f4() {
        let notes = build_reference_notes();
        assert_eq!(notes.len(), 24);
        assert_eq!(notes.first().map(String::as_str), Some("F#2"));
        assert_eq!(notes.last().map(String::as_str), Some("F4"));

        let freqs: Vec<f64> = notes
            .iter()
            .map(|n| note_name_to_freq(n).unwrap())
            .collect();
        assert!(freqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn name_round_trip_recovers_exact_frequency() {
        for midi in REFERENCE_MIDI_LOW..=REFERENCE_MIDI_HIGH {
            assert_eq!(note_name_to_freq(&midi_to_name(midi)), Ok(midi_to_freq(midi)));
        }
    }

    #[test]
    fn reference_membership() {
        assert!(is_reference_note("A3"));
        assert!(!is_reference_note("A4"));
        assert!(!is_reference_note("F2"));
    }
}
