use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::audio::{ProcessError, WavError};

/// Which write of the recording artifact failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStage {
    Raw,
    Processed,
}

impl fmt::Display for ArtifactStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Processed => f.write_str("processed"),
        }
    }
}

/// Terminal conditions of a recording session. None of these are retried.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
    #[error("no audio was captured, nothing to save")]
    EmptyRecording,
    #[error("failed to save {stage} recording to {path:?}")]
    Artifact {
        stage: ArtifactStage,
        path: PathBuf,
        #[source]
        source: WavError,
    },
    #[error("post-processing failed; raw recording kept at {path:?}")]
    PostProcess {
        path: PathBuf,
        #[source]
        source: ProcessError,
    },
    #[error("capture thread did not finish cleanly")]
    CaptureThread(#[from] tokio::task::JoinError),
}
