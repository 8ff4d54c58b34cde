//! Session lifecycle orchestrator.
//!
//! NotStarted → Active → Ended. While active, a capture thread records
//! chunks and this task polls the presence oracle on a coarser cadence. Once
//! ended: join capture → save raw → post-process → overwrite → release surface.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::audio::{
    wav, AudioFormat, CaptureError, CaptureLoop, CaptureOutcome, DeviceOpener, PostProcessor,
    RecordingBuffer, StopReason,
};
use crate::config::{Config, ProcessingSection};
use crate::surface::SessionSurface;

use super::error::{ArtifactStage, SessionError};
use super::presence::PresenceOracle;
use super::status::{SessionPhase, SessionStatusHandle};

/// Immutable settings for one session, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub format: AudioFormat,
    pub chunk_duration: Duration,
    pub poll_interval: Duration,
    pub output_path: PathBuf,
    pub post_processor: PostProcessor,
}

impl SessionConfig {
    pub fn from_config(config: &Config, output_path: PathBuf) -> Result<Self, SessionError> {
        let session = Self {
            format: AudioFormat::new(config.audio.sample_rate, config.audio.channels),
            chunk_duration: Duration::from_millis(config.audio.chunk_millis),
            poll_interval: Duration::from_secs(config.session.poll_interval_secs),
            output_path,
            post_processor: PostProcessor::from(&config.processing),
        };
        session.validate()?;
        Ok(session)
    }

    pub fn chunk_frames(&self) -> usize {
        self.format.frames_for(self.chunk_duration)
    }

    /// Reject settings that would make the capture or poll loops spin.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.format.sample_rate == 0 {
            return invalid("audio.sample_rate", "must be above 0 Hz");
        }
        if self.format.channels == 0 {
            return invalid("audio.channels", "must be at least 1");
        }
        if self.chunk_frames() == 0 {
            return invalid("audio.chunk_millis", "must cover at least one frame");
        }
        if self.poll_interval.is_zero() {
            return invalid("session.poll_interval_secs", "must be at least 1 second");
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> Result<(), SessionError> {
    Err(SessionError::InvalidSetting {
        name,
        reason: reason.to_string(),
    })
}

impl From<&ProcessingSection> for PostProcessor {
    fn from(section: &ProcessingSection) -> Self {
        Self {
            headroom_db: section.headroom_db,
            cutoff_hz: section.highpass_cutoff_hz,
            gain_db: section.gain_db,
        }
    }
}

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The presence marker disappeared.
    SessionEnded,
    /// Stop signal from the operator.
    Interrupted,
    /// The input device failed and capture stopped early.
    CaptureFailed,
}

#[derive(Debug)]
pub struct SessionReport {
    pub end_reason: EndReason,
    pub chunks: usize,
    pub frames: usize,
    pub duration: Duration,
    pub output_path: PathBuf,
    pub capture_error: Option<CaptureError>,
}

pub struct SessionMachine {
    config: SessionConfig,
    oracle: Arc<dyn PresenceOracle>,
    surface: Arc<dyn SessionSurface>,
    open_device: DeviceOpener,
    status: SessionStatusHandle,
}

impl SessionMachine {
    pub fn new(
        config: SessionConfig,
        oracle: Arc<dyn PresenceOracle>,
        surface: Arc<dyn SessionSurface>,
        open_device: DeviceOpener,
        status: SessionStatusHandle,
    ) -> Self {
        Self {
            config,
            oracle,
            surface,
            open_device,
            status,
        }
    }

    /// Drive the session to completion. `cancel` is the operator stop signal.
    ///
    /// The session surface is released on every path.
    pub async fn run(self, cancel: CancellationToken) -> Result<SessionReport, SessionError> {
        let SessionMachine {
            config,
            oracle,
            surface,
            open_device,
            status,
        } = self;

        let result = record(&config, oracle, open_device, &status, cancel).await;

        if let Err(e) = surface.release().await {
            warn!("Failed to release browser session: {}", e);
        }

        match &result {
            Ok(report) => {
                let state = status.get().await;
                info!(
                    "Session {} after {}s active ({:?}): {} chunk(s), {:.1}s saved to {:?}",
                    state.phase.as_str(),
                    state.duration_seconds().unwrap_or(0),
                    report.end_reason,
                    report.chunks,
                    report.duration.as_secs_f64(),
                    report.output_path
                );
            }
            Err(e) => {
                error!("Session failed: {}", e);
                status.set_error(e.to_string()).await;
            }
        }

        result
    }
}

async fn record(
    config: &SessionConfig,
    oracle: Arc<dyn PresenceOracle>,
    open_device: DeviceOpener,
    status: &SessionStatusHandle,
    cancel: CancellationToken,
) -> Result<SessionReport, SessionError> {
    config.validate()?;

    if !oracle.is_active().await {
        info!("Presence marker not found after joining; session never started");
        status.transition(SessionPhase::Ended).await;
        let outcome = CaptureOutcome {
            buffer: RecordingBuffer::new(config.format),
            stop: StopReason::SessionEnded,
        };
        return finalize(config, outcome, EndReason::SessionEnded);
    }

    status.transition(SessionPhase::Active).await;
    info!("Session active, recording to {:?}", config.output_path);

    let capture_cancel = cancel.child_token();
    let capture = CaptureLoop::new(
        oracle.clone(),
        capture_cancel.clone(),
        config.format,
        config.chunk_frames(),
        Handle::current(),
    );
    let mut capture_task = tokio::task::spawn_blocking(move || capture.run(open_device));

    let (decided, finished) = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Stop requested, finishing recording");
                break (Some(EndReason::Interrupted), None);
            }
            joined = &mut capture_task => {
                break (None, Some(joined));
            }
            _ = tokio::time::sleep(config.poll_interval) => {
                if !oracle.is_active().await {
                    info!("Presence marker gone, session ended");
                    break (Some(EndReason::SessionEnded), None);
                }
                debug!("Session still active");
            }
        }
    };

    status.transition(SessionPhase::Ended).await;

    capture_cancel.cancel();
    let joined = match finished {
        Some(joined) => joined,
        None => capture_task.await,
    };
    let outcome = joined?;

    let end_reason = decided.unwrap_or(match outcome.stop {
        StopReason::SessionEnded => EndReason::SessionEnded,
        StopReason::Cancelled => EndReason::Interrupted,
        StopReason::DeviceFailed(_) => EndReason::CaptureFailed,
    });

    finalize(config, outcome, end_reason)
}

/// Flush the buffer to disk, then overwrite it with the processed version.
fn finalize(
    config: &SessionConfig,
    outcome: CaptureOutcome,
    end_reason: EndReason,
) -> Result<SessionReport, SessionError> {
    let CaptureOutcome { buffer, stop } = outcome;
    let capture_error = match stop {
        StopReason::DeviceFailed(e) => {
            warn!("Recording is partial, capture stopped on device error: {}", e);
            Some(e)
        }
        _ => None,
    };

    let chunks = buffer.len();
    let frames = buffer.frames();
    if frames == 0 {
        return Err(SessionError::EmptyRecording);
    }

    let path = &config.output_path;
    let raw = buffer.concat();
    wav::write_wav(path, &raw).map_err(|source| SessionError::Artifact {
        stage: ArtifactStage::Raw,
        path: path.clone(),
        source,
    })?;
    info!("Recording saved as {:?}", path);

    let duration = raw.duration();
    info!("Post-processing audio...");
    let processed = config
        .post_processor
        .process(raw)
        .map_err(|source| SessionError::PostProcess {
            path: path.clone(),
            source,
        })?;

    wav::write_wav(path, &processed).map_err(|source| SessionError::Artifact {
        stage: ArtifactStage::Processed,
        path: path.clone(),
        source,
    })?;
    info!("Processed audio saved as {:?}", path);

    Ok(SessionReport {
        end_reason,
        chunks,
        frames,
        duration,
        output_path: path.clone(),
        capture_error,
    })
}
