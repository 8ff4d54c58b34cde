//! Chunked capture loop run on a dedicated blocking thread.
//!
//! Every iteration checks the stop signal, then the presence oracle, then
//! captures one chunk. A chunk is only captured after a check that returned
//! true, so stopping takes at most one chunk duration.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::audio_source::{CaptureError, DeviceOpener};
use super::buffer::{AudioFormat, RecordingBuffer};
use crate::meeting::PresenceOracle;

/// Why the capture loop returned.
#[derive(Debug, Clone)]
pub enum StopReason {
    SessionEnded,
    Cancelled,
    DeviceFailed(CaptureError),
}

/// Everything the capture thread hands back when it is joined.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub buffer: RecordingBuffer,
    pub stop: StopReason,
}

pub struct CaptureLoop {
    oracle: Arc<dyn PresenceOracle>,
    cancel: CancellationToken,
    format: AudioFormat,
    chunk_frames: usize,
    runtime: Handle,
}

impl CaptureLoop {
    pub fn new(
        oracle: Arc<dyn PresenceOracle>,
        cancel: CancellationToken,
        format: AudioFormat,
        chunk_frames: usize,
        runtime: Handle,
    ) -> Self {
        Self {
            oracle,
            cancel,
            format,
            chunk_frames,
            runtime,
        }
    }

    /// Open the device and capture until the session ends, the loop is
    /// cancelled, or the device fails. Blocks the calling thread.
    pub fn run(self, open_device: DeviceOpener) -> CaptureOutcome {
        let mut buffer = RecordingBuffer::new(self.format);

        let mut device = match open_device(self.format) {
            Ok(device) => device,
            Err(e) => {
                warn!("Could not open input device: {}", e);
                return CaptureOutcome {
                    buffer,
                    stop: StopReason::DeviceFailed(e),
                };
            }
        };

        info!("Recording...");

        let stop = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            if !self.runtime.block_on(self.oracle.is_active()) {
                break StopReason::SessionEnded;
            }

            let chunk = match device.capture(self.chunk_frames) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(
                        "Capture failed after {} chunk(s), keeping partial recording: {}",
                        buffer.len(),
                        e
                    );
                    break StopReason::DeviceFailed(e);
                }
            };

            if let Err(e) = buffer.push(chunk) {
                warn!("Discarding malformed chunk and stopping capture: {}", e);
                break StopReason::DeviceFailed(e);
            }

            debug!("Captured chunk {}", buffer.len());
        };

        info!(
            "Recording stopped ({:?}): {} chunk(s), {} frames",
            stop,
            buffer.len(),
            buffer.frames()
        );

        CaptureOutcome { buffer, stop }
    }
}
