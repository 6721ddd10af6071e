//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! It turns whatever buffers the device delivers into fixed-size mono
//! [`AudioBlock`]s and hands them to the processing loop.
//!
//! ## Features
//! - Input device enumeration and selection by name
//! - Downmixing of multi-channel input to mono
//! - Fixed-size block assembly independent of the device buffer size
//! - Non-blocking handoff: blocks are dropped when the consumer falls behind

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};
use crossbeam_channel::{Sender, TrySendError};
use tracing::{error, info, warn};

use crate::AudioBlock;

/// Name shown for devices that do not report one.
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown input";

/// Sample rate used when the device reports nothing usable.
pub const FALLBACK_SAMPLE_RATE: u32 = 48_000;

/// Collects interleaved device buffers into fixed-size mono blocks.
#[derive(Debug)]
pub struct BlockAssembler {
    block_size: usize,
    channels: usize,
    sample_rate: u32,
    pending: Vec<f32>,
}

impl BlockAssembler {
    /// A `block_size` of zero is treated as one.
    pub fn new(block_size: usize, channels: u16, sample_rate: u32) -> Self {
        let block_size = block_size.max(1);
        Self {
            block_size,
            channels: channels.max(1) as usize,
            sample_rate,
            pending: Vec::with_capacity(block_size * 2),
        }
    }

    /// Appends interleaved samples, calling `emit` for every full block.
    pub fn push(&mut self, data: &[f32], mut emit: impl FnMut(AudioBlock)) {
        if self.channels == 1 {
            self.pending.extend_from_slice(data);
        } else {
            let channels = self.channels;
            self.pending.extend(
                data.chunks_exact(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }

        while self.pending.len() >= self.block_size {
            let block: Vec<f32> = self.pending.drain(..self.block_size).collect();
            emit(AudioBlock::new(block, self.sample_rate));
        }
    }
}

/// Sends a block without blocking. Returns `false` if it was dropped.
pub fn offer_block(sender: &Sender<AudioBlock>, block: AudioBlock) -> bool {
    match sender.try_send(block) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
    }
}

/// A running input stream. Dropping it stops capture.
pub struct CaptureStream {
    stream: cpal::Stream,
    pub device_name: String,
    pub sample_rate: u32,
}

impl CaptureStream {
    /// Pauses and releases the device.
    pub fn stop(self) {
        if let Err(e) = self.stream.pause() {
            warn!("Error pausing stream on {}: {}", self.device_name, e);
        }
        drop(self.stream);
        info!("Released input device {}", self.device_name);
    }
}

/// Lists the names of the available input devices.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("Failed to enumerate input devices")?;
    Ok(devices.map(|d| device_label(&d)).collect())
}

fn device_label(device: &cpal::Device) -> String {
    match device.name() {
        Ok(name) if !name.is_empty() => name,
        _ => UNKNOWN_DEVICE_NAME.to_string(),
    }
}

fn select_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device> {
    if let Some(wanted) = name {
        let mut devices = host.input_devices().context("Failed to enumerate input devices")?;
        return devices
            .find(|d| device_label(d) == wanted)
            .ok_or_else(|| anyhow!("Device not found: {wanted}"));
    }
    host.default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))
}

/// Starts audio capture and streams fixed-size blocks into `sender`.
///
/// This function:
/// 1. Selects the named input device, or the default one
/// 2. Picks an f32 input configuration at the device's preferred rate
/// 3. Sets up a callback that downmixes, assembles blocks and offers them
///    to the channel without ever blocking
///
/// # Arguments
/// * `device_name` - Exact device name, or `None` for the default input
/// * `block_size` - Samples per emitted block
/// * `sender` - Bounded channel to the processing loop
///
/// # Returns
/// * `Ok(CaptureStream)` - Running stream with its device name and rate
/// * `Err(e)` - If the device cannot be found, configured or started
pub fn start_audio_capture(
    device_name: Option<&str>,
    block_size: usize,
    sender: Sender<AudioBlock>,
) -> Result<CaptureStream> {
    let host = cpal::default_host();
    let device = select_device(&host, device_name)?;
    let label = device_label(&device);

    info!("Using audio input device: {}", label);

    let preferred_rate = device
        .default_input_config()
        .map(|c| c.sample_rate().0)
        .unwrap_or(FALLBACK_SAMPLE_RATE);

    let configs = device
        .supported_input_configs()
        .context("Failed to query supported input configs")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, preferred_rate)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let sample_rate = preferred_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate));
    let channels = config.channels();
    let config: cpal::StreamConfig = config.into();

    info!("Selected sample rate: {} Hz, {} channel(s)", sample_rate, channels);

    let mut assembler = BlockAssembler::new(block_size, channels, sample_rate);
    let err_label = label.clone();

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Never block the audio callback; a full channel drops the block.
                assembler.push(data, |block| {
                    offer_block(&sender, block);
                });
            },
            move |err| error!("An error occurred on the audio stream ({}): {}", err_label, err),
            None,
        )
        .context("init device")?;

    stream.play().context("start device")?;

    Ok(CaptureStream {
        stream,
        device_name: label,
        sample_rate,
    })
}

/// Finds the best f32 input configuration for the target sample rate.
///
/// Prefers mono, then the range closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .min_by_key(|c| {
            let range = c.min_sample_rate().0..=c.max_sample_rate().0;
            let rate_miss = if range.contains(&target_rate) {
                0
            } else {
                let min_diff = c.min_sample_rate().0.abs_diff(target_rate);
                let max_diff = c.max_sample_rate().0.abs_diff(target_rate);
                min_diff.min(max_diff)
            };
            (c.channels() != 1, rate_miss)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_fixed_size_blocks_across_buffers() {
        let mut assembler = BlockAssembler::new(4, 1, 8_000);
        let mut blocks = Vec::new();
        assembler.push(&[1.0, 2.0, 3.0], |b| blocks.push(b));
        assert!(blocks.is_empty());
        assembler.push(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0], |b| blocks.push(b));
        assert_eq!(
            blocks,
            vec![
                AudioBlock::new(vec![1.0, 2.0, 3.0, 4.0], 8_000),
                AudioBlock::new(vec![5.0, 6.0, 7.0, 8.0], 8_000),
            ]
        );
    }

    #[test]
    fn downmixes_interleaved_stereo() {
        let mut assembler = BlockAssembler::new(2, 2, 44_100);
        let mut blocks = Vec::new();
        assembler.push(&[1.0, 0.0, 0.5, 0.5], |b| blocks.push(b));
        assert_eq!(blocks, vec![AudioBlock::new(vec![0.5, 0.5], 44_100)]);
    }

    #[test]
    fn zero_block_size_still_makes_progress() {
        let mut assembler = BlockAssembler::new(0, 1, 8_000);
        let mut blocks = Vec::new();
        assembler.push(&[0.1, 0.2], |b| blocks.push(b));
        assert_eq!(
            blocks,
            vec![
                AudioBlock::new(vec![0.1], 8_000),
                AudioBlock::new(vec![0.2], 8_000),
            ]
        );
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (tx, rx) = crossbeam_channel::bounded(8);
        let accepted = (0..12)
            .filter(|&i| offer_block(&tx, AudioBlock::new(vec![i as f32], 48_000)))
            .count();
        assert_eq!(accepted, 8);
        // The oldest blocks survive, in capture order.
        let firsts: Vec<f32> = rx.try_iter().map(|b| b.samples[0]).collect();
        assert_eq!(firsts, (0..8).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn disconnected_consumer_is_not_an_error() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        assert!(!offer_block(&tx, AudioBlock::new(vec![0.0], 48_000)));
    }
}
