//! # Configuration Module
//!
//! Tunables for a monitoring session. Every field has a default, so a config
//! file only needs to name what it changes. Files are JSON and read-only;
//! nothing is ever written back.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::display::BAR_FULL_SCALE_CENTS;
use crate::pitch::DetectorSettings;
use crate::reference::DEFAULT_REFERENCE_NOTE;
use crate::voicing::VoicingGate;

/// Samples per block handed to the detector.
pub const BLOCK_SIZE: usize = 2048;

/// Capacity of the capture-to-processing channel.
pub const CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub detector: DetectorSettings,
    #[serde(default = "default_silence_hold_ms")]
    pub silence_hold_ms: u64,
    #[serde(default = "default_smoothing_tau_ms")]
    pub smoothing_tau_ms: u64,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_reference_note")]
    pub reference_note: String,
    #[serde(default = "default_bar_full_scale_cents")]
    pub bar_full_scale_cents: f64,
}

fn default_silence_hold_ms() -> u64 {
    3000
}

fn default_smoothing_tau_ms() -> u64 {
    350
}

fn default_block_size() -> usize {
    BLOCK_SIZE
}

fn default_channel_capacity() -> usize {
    CHANNEL_CAPACITY
}

fn default_reference_note() -> String {
    DEFAULT_REFERENCE_NOTE.to_string()
}

fn default_bar_full_scale_cents() -> f64 {
    BAR_FULL_SCALE_CENTS
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            detector: DetectorSettings::default(),
            silence_hold_ms: default_silence_hold_ms(),
            smoothing_tau_ms: default_smoothing_tau_ms(),
            block_size: default_block_size(),
            channel_capacity: default_channel_capacity(),
            reference_note: default_reference_note(),
            bar_full_scale_cents: default_bar_full_scale_cents(),
        }
    }
}

impl MonitorConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: MonitorConfig =
            serde_json::from_str(content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;
        if !(d.min_pitch_hz > 0.0 && d.min_pitch_hz < d.max_pitch_hz) {
            bail!(
                "pitch range must satisfy 0 < min < max (got {} - {})",
                d.min_pitch_hz,
                d.max_pitch_hz
            );
        }
        if d.silence_floor < 0.0 {
            bail!("silence_floor must not be negative");
        }
        if self.block_size < 2 {
            bail!("block_size must be at least 2");
        }
        if self.channel_capacity == 0 {
            bail!("channel_capacity must be at least 1");
        }
        if self.bar_full_scale_cents <= 0.0 {
            bail!("bar_full_scale_cents must be positive");
        }
        Ok(())
    }

    pub fn silence_hold(&self) -> Duration {
        Duration::from_millis(self.silence_hold_ms)
    }

    pub fn smoothing_tau(&self) -> Duration {
        Duration::from_millis(self.smoothing_tau_ms)
    }

    /// A fresh voicing gate using this config's thresholds.
    pub fn voicing_gate(&self) -> VoicingGate {
        VoicingGate::new(self.detector.silence_floor, self.silence_hold(), self.smoothing_tau())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = MonitorConfig::from_json("{}").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.detector.min_pitch_hz, 70.0);
        assert_eq!(config.detector.max_pitch_hz, 900.0);
        assert_eq!(config.silence_hold(), Duration::from_secs(3));
        assert_eq!(config.smoothing_tau(), Duration::from_millis(350));
        assert_eq!(config.channel_capacity, 8);
        assert_eq!(config.reference_note, "A3");
    }

    #[test]
    fn partial_override() {
        let json = r#"{"reference_note": "C3", "detector": {"max_pitch_hz": 600.0}}"#;
        let config = MonitorConfig::from_json(json).unwrap();
        assert_eq!(config.reference_note, "C3");
        assert_eq!(config.detector.max_pitch_hz, 600.0);
        assert_eq!(config.detector.min_pitch_hz, 70.0);
    }

    #[test]
    fn rejects_inverted_pitch_range() {
        let json = r#"{"detector": {"min_pitch_hz": 500.0, "max_pitch_hz": 100.0}}"#;
        assert!(MonitorConfig::from_json(json).is_err());
    }

    #[test]
    fn rejects_zero_capacity() {
        assert!(MonitorConfig::from_json(r#"{"channel_capacity": 0}"#).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(MonitorConfig::load(Path::new("/nonexistent/pitch-monitor.json")).is_err());
    }
}
