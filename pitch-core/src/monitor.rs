//! # Monitor Module
//!
//! The per-block pipeline (detect → gate → smooth → map → compare) and the
//! consumer loop that drives it from the capture channel.
//!
//! ## Architecture
//! - **Producer**: the capture callback, which never blocks (see `audio`)
//! - **Consumer**: [`run_processing_loop`], which owns the smoothing state
//! - **Shared**: only the [`ReferenceCell`], read once per block

use crossbeam_channel::{Receiver, select};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::display::DisplayUpdate;
use crate::pitch::PitchDetector;
use crate::reference::{ReferenceCell, deviation_cents};
use crate::tuning::frequency_to_note;
use crate::voicing::{GateOutcome, VoicingGate};
use crate::{AudioBlock, NoteEstimate};

/// Consumer of display updates (terminal, GUI, test recorder...).
pub trait DisplaySink: Send {
    fn publish(&mut self, update: DisplayUpdate);
}

impl<F> DisplaySink for F
where
    F: FnMut(DisplayUpdate) + Send,
{
    fn publish(&mut self, update: DisplayUpdate) {
        self(update)
    }
}

/// Pipeline state for one monitoring session.
pub struct Monitor {
    detector: PitchDetector,
    gate: VoicingGate,
    reference: Arc<ReferenceCell>,
    bar_full_scale_cents: f64,
}

impl Monitor {
    pub fn new(config: &MonitorConfig, reference: Arc<ReferenceCell>) -> Self {
        Self {
            detector: PitchDetector::new(config.detector),
            gate: config.voicing_gate(),
            reference,
            bar_full_scale_cents: config.bar_full_scale_cents,
        }
    }

    pub fn gate(&self) -> &VoicingGate {
        &self.gate
    }

    /// Maps a smoothed frequency against the current reference.
    pub fn estimate(&self, frequency_hz: f64) -> NoteEstimate {
        let (note_name, cents_offset) = frequency_to_note(frequency_hz);
        let reference = self.reference.snapshot();
        NoteEstimate {
            note_name,
            cents_offset,
            reference_delta_cents: deviation_cents(frequency_hz, reference.frequency_hz),
        }
    }

    /// Runs one block through the pipeline.
    ///
    /// # Arguments
    /// * `block` - Captured samples and their sample rate
    /// * `now` - Processing time, used for smoothing and the silence hold
    ///
    /// # Returns
    /// * `DisplayUpdate` - what the display should show after this block
    pub fn process_block(&mut self, block: &AudioBlock, now: Instant) -> DisplayUpdate {
        let detection = self.detector.detect(&block.samples, block.sample_rate as f64);
        match self.gate.update(detection, now) {
            GateOutcome::Voiced { smoothed_hz, rms } => {
                let estimate = self.estimate(smoothed_hz);
                debug!(
                    "raw={:?} smoothed={:.1} note={} ref_delta={:.1}",
                    detection.frequency_hz,
                    smoothed_hz,
                    estimate.note_name,
                    estimate.reference_delta_cents
                );
                DisplayUpdate::reading(smoothed_hz, &estimate, rms, self.bar_full_scale_cents)
            }
            GateOutcome::Held { last_rms } => DisplayUpdate::holding(last_rms),
            GateOutcome::Reset => DisplayUpdate::no_signal(),
        }
    }
}

/// Why the processing loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Stopped,
    ChannelClosed,
}

/// Consumes blocks until a stop signal arrives or the producer goes away.
///
/// Blocks only on the two receivers. Blocks still queued when the stop
/// signal arrives are discarded unprocessed.
pub fn run_processing_loop(
    blocks: Receiver<AudioBlock>,
    stop: Receiver<()>,
    mut monitor: Monitor,
    sink: &mut dyn DisplaySink,
) -> LoopExit {
    let exit = loop {
        select! {
            recv(stop) -> _ => break LoopExit::Stopped,
            recv(blocks) -> msg => match msg {
                Ok(block) => sink.publish(monitor.process_block(&block, Instant::now())),
                Err(_) => break LoopExit::ChannelClosed,
            },
        }
    };

    let dropped = blocks.try_iter().count();
    info!("Processing loop exiting ({exit:?}), discarded {dropped} queued blocks");
    exit
}
