//! Input device abstraction for chunked, blocking capture.

use std::time::Duration;
use thiserror::Error;

use super::buffer::{AudioChunk, AudioFormat};

#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("no audio input device available")]
    NoInputDevice,
    #[error("input device sample format {0} is not supported")]
    UnsupportedFormat(String),
    #[error("failed to open input stream: {0}")]
    Stream(String),
    #[error("input device reported an error: {0}")]
    Device(String),
    #[error("input device delivered no audio for {}ms", .waited.as_millis())]
    Stalled { waited: Duration },
    #[error("input stream closed unexpectedly")]
    Disconnected,
    #[error("captured chunk format {actual:?} does not match recording format {expected:?}")]
    FormatMismatch {
        expected: AudioFormat,
        actual: AudioFormat,
    },
}

/// A capture device owned by a single thread.
///
/// Implementations need not be `Send`; they are opened on the capture thread.
pub trait InputDevice {
    /// Block until exactly `frames` frames have been captured.
    fn capture(&mut self, frames: usize) -> Result<AudioChunk, CaptureError>;
}

/// Opens the input device on the thread that will use it.
pub type DeviceOpener =
    Box<dyn FnOnce(AudioFormat) -> Result<Box<dyn InputDevice>, CaptureError> + Send>;
