//! "Is the meeting still running?"

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::surface::SessionSurface;

/// Answers whether the session is still active.
///
/// Implementations are memoryless and fail closed: anything that prevents a
/// positive answer is reported as `false`, never as an error.
#[async_trait]
pub trait PresenceOracle: Send + Sync {
    async fn is_active(&self) -> bool;
}

/// Looks for a marker element on the meeting page.
pub struct MarkerOracle {
    surface: Arc<dyn SessionSurface>,
    marker: String,
}

impl MarkerOracle {
    pub fn new(surface: Arc<dyn SessionSurface>, marker: impl Into<String>) -> Self {
        Self {
            surface,
            marker: marker.into(),
        }
    }
}

#[async_trait]
impl PresenceOracle for MarkerOracle {
    async fn is_active(&self) -> bool {
        match self.surface.locate(&self.marker).await {
            Ok(found) => found,
            Err(e) => {
                debug!("Presence check failed, treating session as ended: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceError;
    use std::sync::Mutex;

    /// Replays `locate` answers; `None` simulates a driver failure.
    struct Replay(Mutex<Vec<Option<bool>>>);

    #[async_trait]
    impl SessionSurface for Replay {
        async fn navigate(&self, _url: &str) -> Result<(), SurfaceError> {
            Ok(())
        }

        async fn locate(&self, _xpath: &str) -> Result<bool, SurfaceError> {
            match self.0.lock().unwrap().remove(0) {
                Some(found) => Ok(found),
                None => Err(SurfaceError::Protocol("driver went away".into())),
            }
        }

        async fn click(&self, _xpath: &str) -> Result<(), SurfaceError> {
            Ok(())
        }

        async fn send_keys(&self, _xpath: &str, _text: &str) -> Result<(), SurfaceError> {
            Ok(())
        }

        async fn release(&self) -> Result<(), SurfaceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_marker_presence_maps_to_activity() {
        let surface = Arc::new(Replay(Mutex::new(vec![Some(true), Some(false), Some(true)])));
        let oracle = MarkerOracle::new(surface, "//*[contains(text(),\"You\")]");

        assert!(oracle.is_active().await);
        assert!(!oracle.is_active().await);
        assert!(oracle.is_active().await);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let surface = Arc::new(Replay(Mutex::new(vec![None, Some(true)])));
        let oracle = MarkerOracle::new(surface, "//marker");

        assert!(!oracle.is_active().await);
        // No memory of the failure.
        assert!(oracle.is_active().await);
    }
}
