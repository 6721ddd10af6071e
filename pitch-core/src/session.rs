//! # Session Module
//!
//! Lifecycle of a monitoring session: start capture, run the processing loop
//! on a dedicated thread, and tear both down again.
//!
//! Only one session may be active at a time. [`StreamRunner`] holds the
//! active session's teardown; replacing it always stops the previous
//! occupant before the next one is installed.

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info};

use crate::audio::{self, CaptureStream};
use crate::config::MonitorConfig;
use crate::monitor::{DisplaySink, Monitor, run_processing_loop};
use crate::reference::ReferenceCell;
use crate::AudioBlock;

/// Handle to a running processing thread.
///
/// Dropping the handle stops the session.
#[derive(Debug)]
pub struct SessionHandle {
    label: String,
    shutdown_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Signals the loop to stop and waits for its thread, which also
    /// releases the capture stream.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            return;
        };
        // Dropping the sender wakes the loop's stop receiver.
        drop(shutdown_tx);
        info!("Stopping session on {}", self.label);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!("Processing thread for {} panicked", self.label);
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Runs the processing loop over an already-established block feed.
///
/// Used directly when blocks come from somewhere other than a live device.
pub fn spawn_processing(
    label: impl Into<String>,
    blocks: Receiver<AudioBlock>,
    config: &MonitorConfig,
    reference: Arc<ReferenceCell>,
    mut sink: Box<dyn DisplaySink>,
) -> Result<SessionHandle> {
    config.validate()?;
    let label = label.into();
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    let monitor = Monitor::new(config, reference);

    let thread_handle = thread::Builder::new()
        .name("pitch-processing".into())
        .spawn(move || {
            run_processing_loop(blocks, shutdown_rx, monitor, sink.as_mut());
        })
        .context("Failed to spawn processing thread")?;

    Ok(SessionHandle {
        label,
        shutdown_tx: Some(shutdown_tx),
        thread_handle: Some(thread_handle),
    })
}

/// Starts capture on `device_name` (or the default input) and processes it.
///
/// The capture stream is created on the session thread and never leaves it.
/// This function returns only after the stream has started; if it fails to
/// start, or `config` is invalid, the error is returned and no processing
/// loop runs.
pub fn start_session(
    device_name: Option<String>,
    config: &MonitorConfig,
    reference: Arc<ReferenceCell>,
    mut sink: Box<dyn DisplaySink>,
) -> Result<SessionHandle> {
    config.validate()?;
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<String>>(1);
    let block_size = config.block_size;
    let capacity = config.channel_capacity;
    let monitor = Monitor::new(config, reference);

    let thread_handle = thread::Builder::new()
        .name("pitch-session".into())
        .spawn(move || {
            let (block_tx, block_rx) = crossbeam_channel::bounded::<AudioBlock>(capacity);
            let capture: CaptureStream =
                match audio::start_audio_capture(device_name.as_deref(), block_size, block_tx) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
            let _ = ready_tx.send(Ok(capture.device_name.clone()));

            info!(
                "Listening on {} at {} Hz",
                capture.device_name, capture.sample_rate
            );
            run_processing_loop(block_rx, shutdown_rx, monitor, sink.as_mut());
            capture.stop();
        })
        .context("Failed to spawn session thread")?;

    let started = ready_rx
        .recv()
        .map_err(|_| anyhow!("Session thread exited before reporting"))
        .and_then(|r| r);

    match started {
        Ok(label) => Ok(SessionHandle {
            label,
            shutdown_tx: Some(shutdown_tx),
            thread_handle: Some(thread_handle),
        }),
        Err(e) => {
            let _ = thread_handle.join();
            Err(e)
        }
    }
}

pub type Teardown = Box<dyn FnOnce() + Send>;

/// Owns at most one active session.
#[derive(Default)]
pub struct StreamRunner {
    active: Mutex<Option<Teardown>>,
}

impl StreamRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tears down the current occupant, then installs `next`.
    pub fn replace(&self, next: Option<Teardown>) {
        let mut slot = self.active.lock();
        if let Some(stop) = slot.take() {
            stop();
        }
        *slot = next;
    }

    pub fn install(&self, session: SessionHandle) {
        self.replace(Some(Box::new(move || session.stop())));
    }

    /// Stops the current session, then starts a new one with `start`.
    ///
    /// The lock is held for the whole operation so two restarts can never
    /// interleave. If `start` fails the runner is left empty.
    pub fn restart<F>(&self, start: F) -> Result<String>
    where
        F: FnOnce() -> Result<SessionHandle>,
    {
        let mut slot = self.active.lock();
        if let Some(stop) = slot.take() {
            stop();
        }
        let session = start()?;
        let label = session.label().to_string();
        *slot = Some(Box::new(move || session.stop()));
        Ok(label)
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn shutdown(&self) {
        self.replace(None);
    }
}
