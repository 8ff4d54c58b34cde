pub mod audio_source;
pub mod buffer;
pub mod capture_loop;
pub mod mic_source;
pub mod post_process;
pub mod wav;

pub use audio_source::{CaptureError, DeviceOpener, InputDevice};
pub use buffer::{AudioChunk, AudioFormat, RecordingBuffer, Waveform};
pub use capture_loop::{CaptureLoop, CaptureOutcome, StopReason};
pub use mic_source::MicInput;
pub use post_process::{PostProcessor, ProcessError};
pub use wav::WavError;
