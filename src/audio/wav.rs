//! WAV persistence for recordings.
//!
//! Writes go to a temp file next to the target and are renamed into place, so
//! overwriting the raw recording with the processed one never leaves a
//! half-written artifact behind.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::BufWriter;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use super::buffer::{AudioFormat, Waveform};

#[derive(Debug, Error)]
pub enum WavError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Wav(#[from] hound::Error),
    #[error("expected 16-bit integer PCM, found {bits}-bit {format:?}")]
    UnsupportedEncoding { bits: u16, format: SampleFormat },
}

fn spec_for(format: AudioFormat) -> WavSpec {
    WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Atomically write `waveform` to `path` as 16-bit PCM.
pub fn write_wav(path: &Path, waveform: &Waveform) -> Result<(), WavError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer =
            WavWriter::new(BufWriter::new(tmp.as_file_mut()), spec_for(waveform.format))?;
        for &sample in &waveform.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;

    debug!("Wrote {} frames to {:?}", waveform.frames(), path);
    Ok(())
}

pub fn read_wav(path: &Path) -> Result<Waveform, WavError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.bits_per_sample != 16 || spec.sample_format != SampleFormat::Int {
        return Err(WavError::UnsupportedEncoding {
            bits: spec.bits_per_sample,
            format: spec.sample_format,
        });
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Waveform::new(
        AudioFormat::new(spec.sample_rate, spec.channels),
        samples,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn stereo(samples: Vec<i16>) -> Waveform {
        Waveform::new(AudioFormat::new(44_100, 2), samples)
    }

    #[test]
    fn test_written_file_reads_back_identically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meeting.wav");
        let waveform = stereo(vec![0, 1, -1, i16::MAX, i16::MIN, 42]);

        write_wav(&path, &waveform).unwrap();
        assert_eq!(read_wav(&path).unwrap(), waveform);
    }

    #[test]
    fn test_overwrite_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meeting.wav");

        write_wav(&path, &stereo(vec![1; 8])).unwrap();
        write_wav(&path, &stereo(vec![2; 4])).unwrap();

        let read = read_wav(&path).unwrap();
        assert_eq!(read.samples, vec![2; 4]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.wav");
        write_wav(&path, &stereo(vec![0; 2])).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_rejects_float_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.finalize().unwrap();

        assert!(matches!(
            read_wav(&path),
            Err(WavError::UnsupportedEncoding { bits: 32, .. })
        ));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_wav(Path::new("/nonexistent/meeting.wav")).is_err());
    }
}
