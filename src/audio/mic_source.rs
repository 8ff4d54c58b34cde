//! Default-input-device capture via cpal.
//!
//! The stream runs continuously from `open` until drop; `capture` drains it in
//! fixed-size chunks so consecutive chunks are contiguous.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::{debug, error, info};

use super::audio_source::{CaptureError, InputDevice};
use super::buffer::{AudioChunk, AudioFormat};

/// How long `capture` waits for the next callback before giving up.
const STALL_TIMEOUT: Duration = Duration::from_secs(5);

enum StreamEvent {
    Samples(Vec<i16>),
    Failed(String),
}

pub struct MicInput {
    format: AudioFormat,
    events: Receiver<StreamEvent>,
    pending: Vec<i16>,
    _stream: cpal::Stream,
}

impl MicInput {
    /// Open the default input device and start streaming.
    pub fn open(format: AudioFormat) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::NoInputDevice)?;

        info!(
            "Recording from input device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        let sample_format = device
            .default_input_config()
            .map(|c| c.sample_format())
            .unwrap_or(SampleFormat::I16);

        let config = cpal::StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, events) = mpsc::channel();
        let stream = match sample_format {
            SampleFormat::I16 => build_stream::<i16>(&device, &config, tx)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, tx)?,
            SampleFormat::F32 => build_stream::<f32>(&device, &config, tx)?,
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        };

        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        debug!(
            "Input stream started: {} Hz, {} channel(s), device format {:?}",
            format.sample_rate, format.channels, sample_format
        );

        Ok(Self {
            format,
            events,
            pending: Vec::new(),
            _stream: stream,
        })
    }

    pub fn boxed(format: AudioFormat) -> Result<Box<dyn InputDevice>, CaptureError> {
        Ok(Box::new(Self::open(format)?))
    }
}

impl InputDevice for MicInput {
    fn capture(&mut self, frames: usize) -> Result<AudioChunk, CaptureError> {
        let wanted = frames * self.format.channels as usize;

        while self.pending.len() < wanted {
            match self.events.recv_timeout(STALL_TIMEOUT) {
                Ok(StreamEvent::Samples(samples)) => self.pending.extend(samples),
                Ok(StreamEvent::Failed(message)) => return Err(CaptureError::Device(message)),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(CaptureError::Stalled {
                        waited: STALL_TIMEOUT,
                    })
                }
                Err(RecvTimeoutError::Disconnected) => return Err(CaptureError::Disconnected),
            }
        }

        let rest = self.pending.split_off(wanted);
        let samples = std::mem::replace(&mut self.pending, rest);
        Ok(AudioChunk::new(self.format, samples))
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tx: Sender<StreamEvent>,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let err_tx = tx.clone();
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples = data.iter().map(|&s| i16::from_sample(s)).collect();
                let _ = tx.send(StreamEvent::Samples(samples));
            },
            move |err| {
                error!("Input stream error: {}", err);
                let _ = err_tx.send(StreamEvent::Failed(err.to_string()));
            },
            None,
        )
        .map_err(|e| CaptureError::Stream(e.to_string()))
}
