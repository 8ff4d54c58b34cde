//! Cleanup chain applied once to a finished recording.
//!
//! normalize → high-pass → gain boost. Every stage rewrites a [`Waveform`]'s
//! samples in place and keeps its format. Results saturate at the `i16` range.

use std::f64::consts::PI;
use thiserror::Error;

use super::buffer::Waveform;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    #[error("recording is empty")]
    Empty,
    #[error("recording declares {0} channels")]
    NoChannels(u16),
    #[error("recording declares a sample rate of 0 Hz")]
    NoSampleRate,
    #[error("{samples} samples do not form whole {channels}-channel frames")]
    PartialFrame { samples: usize, channels: u16 },
    #[error("high-pass cutoff {cutoff_hz} Hz must lie between 0 and {nyquist_hz} Hz")]
    InvalidCutoff { cutoff_hz: f64, nyquist_hz: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessor {
    /// Distance kept below full scale when normalizing.
    pub headroom_db: f64,
    pub cutoff_hz: f64,
    pub gain_db: f64,
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self {
            headroom_db: 0.1,
            cutoff_hz: 100.0,
            gain_db: 5.0,
        }
    }
}

impl PostProcessor {
    /// Run the chain over `waveform`, reusing its sample storage.
    pub fn process(&self, mut waveform: Waveform) -> Result<Waveform, ProcessError> {
        validate(&waveform)?;

        let nyquist_hz = waveform.format.sample_rate as f64 / 2.0;
        if !(self.cutoff_hz > 0.0 && self.cutoff_hz < nyquist_hz) {
            return Err(ProcessError::InvalidCutoff {
                cutoff_hz: self.cutoff_hz,
                nyquist_hz,
            });
        }

        normalize(&mut waveform, self.headroom_db);
        high_pass(&mut waveform, self.cutoff_hz);
        apply_gain(&mut waveform, self.gain_db);
        Ok(waveform)
    }
}

fn validate(waveform: &Waveform) -> Result<(), ProcessError> {
    let channels = waveform.format.channels;
    if channels == 0 {
        return Err(ProcessError::NoChannels(channels));
    }
    if waveform.format.sample_rate == 0 {
        return Err(ProcessError::NoSampleRate);
    }
    if waveform.is_empty() {
        return Err(ProcessError::Empty);
    }
    if waveform.samples.len() % channels as usize != 0 {
        return Err(ProcessError::PartialFrame {
            samples: waveform.samples.len(),
            channels,
        });
    }
    Ok(())
}

pub fn db_to_ratio(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

fn saturate(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

fn scale(samples: &mut [i16], factor: f64) {
    for sample in samples {
        *sample = saturate(*sample as f64 * factor);
    }
}

/// Scale so the loudest sample sits `headroom_db` below full scale.
/// Silence is left unchanged.
pub fn normalize(waveform: &mut Waveform, headroom_db: f64) {
    let peak = waveform.peak();
    if peak == 0 {
        return;
    }
    let target = i16::MAX as f64 * db_to_ratio(-headroom_db);
    scale(&mut waveform.samples, target / peak as f64);
}

/// First-order RC high-pass, run independently on each channel.
pub fn high_pass(waveform: &mut Waveform, cutoff_hz: f64) {
    let channels = waveform.format.channels.max(1) as usize;
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    let dt = 1.0 / waveform.format.sample_rate as f64;
    let alpha = rc / (rc + dt);

    let mut last_in = vec![0.0f64; channels];
    let mut last_out = vec![0.0f64; channels];

    for (i, frame) in waveform.samples.chunks_exact_mut(channels).enumerate() {
        for (c, sample) in frame.iter_mut().enumerate() {
            let x = *sample as f64;
            let y = if i == 0 {
                x
            } else {
                alpha * (last_out[c] + x - last_in[c])
            };
            last_in[c] = x;
            last_out[c] = y;
            *sample = saturate(y);
        }
    }
}

pub fn apply_gain(waveform: &mut Waveform, gain_db: f64) {
    scale(&mut waveform.samples, db_to_ratio(gain_db));
}
