//! Session phase and shared status handle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Phase of the session lifecycle. `Ended` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NotStarted,
    Active,
    Ended,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }

    pub fn can_transition_to(&self, next: SessionPhase) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Active)
                | (Self::NotStarted, Self::Ended)
                | (Self::Active, Self::Ended)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub transitions: Vec<PhaseTransition>,
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::NotStarted,
            started_at: None,
            transitions: Vec::new(),
            last_error: None,
        }
    }
}

impl SessionState {
    /// Seconds spent in `Active`, up to now if still active.
    pub fn duration_seconds(&self) -> Option<u64> {
        let started = self.started_at?;
        let until = self
            .transitions
            .iter()
            .find(|t| t.to == SessionPhase::Ended)
            .map(|t| t.at)
            .unwrap_or_else(Utc::now);
        Some((until - started).num_seconds().max(0) as u64)
    }
}

/// Thread-safe handle for observing the session machine from outside.
#[derive(Clone, Default)]
pub struct SessionStatusHandle {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionStatusHandle {
    pub async fn get(&self) -> SessionState {
        self.inner.lock().await.clone()
    }

    /// Move to `next`. Returns false, leaving the state untouched, when the
    /// transition is not allowed.
    pub async fn transition(&self, next: SessionPhase) -> bool {
        let mut state = self.inner.lock().await;
        if !state.phase.can_transition_to(next) {
            return false;
        }

        let now = Utc::now();
        if next == SessionPhase::Active {
            state.started_at = Some(now);
        }
        let from = state.phase;
        state.transitions.push(PhaseTransition {
            from,
            to: next,
            at: now,
        });
        state.phase = next;
        true
    }

    pub async fn set_error(&self, error: String) {
        let mut state = self.inner.lock().await;
        state.last_error = Some(error);
    }
}
