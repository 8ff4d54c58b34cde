//! In-memory audio types shared by capture, flush and post-processing.
//!
//! All audio is interleaved signed 16-bit PCM. A [`RecordingBuffer`] is filled
//! by exactly one writer (the capture thread) and handed to the session
//! machine by value once capture stops.

use std::time::Duration;

use super::audio_source::CaptureError;

/// Sample rate and channel layout of a stream of `i16` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Number of frames covering `duration` at this rate.
    pub fn frames_for(&self, duration: Duration) -> usize {
        (self.sample_rate as u128 * duration.as_millis() / 1000) as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(44_100, 2)
    }
}

/// One fixed-length unit of captured audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    format: AudioFormat,
    samples: Vec<i16>,
}

impl AudioChunk {
    pub fn new(format: AudioFormat, samples: Vec<i16>) -> Self {
        debug_assert!(
            format.channels > 0 && samples.len() % format.channels as usize == 0,
            "chunk must hold whole frames"
        );
        Self { format, samples }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels.max(1) as usize
    }
}

/// Append-only, capture-ordered list of chunks.
#[derive(Debug)]
pub struct RecordingBuffer {
    format: AudioFormat,
    chunks: Vec<AudioChunk>,
}

impl RecordingBuffer {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            chunks: Vec::new(),
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn push(&mut self, chunk: AudioChunk) -> Result<(), CaptureError> {
        if chunk.format() != self.format {
            return Err(CaptureError::FormatMismatch {
                expected: self.format,
                actual: chunk.format(),
            });
        }
        self.chunks.push(chunk);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn frames(&self) -> usize {
        self.chunks.iter().map(AudioChunk::frames).sum()
    }

    /// Concatenate every chunk, in capture order, into one waveform. Each
    /// chunk is freed as soon as it has been copied.
    pub fn concat(self) -> Waveform {
        let total: usize = self.chunks.iter().map(|c| c.samples().len()).sum();
        let mut samples = Vec::with_capacity(total);
        for chunk in self.chunks {
            samples.extend_from_slice(chunk.samples());
        }
        Waveform::new(self.format, samples)
    }
}

/// A flat interleaved recording, either concatenated chunks or a decoded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    pub format: AudioFormat,
    pub samples: Vec<i16>,
}

impl Waveform {
    pub fn new(format: AudioFormat, samples: Vec<i16>) -> Self {
        Self { format, samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        if self.format.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.format.sample_rate as f64)
    }

    /// Largest absolute sample value. `i16::MIN` counts as 32768.
    pub fn peak(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }
}
