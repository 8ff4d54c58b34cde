//! Meeting session lifecycle.
//!
//! Watches the joined meeting for its presence marker, records audio while it
//! is there, and produces the cleaned-up recording once it is gone.

pub mod error;
pub mod presence;
pub mod session_machine;
pub mod status;

pub use error::{ArtifactStage, SessionError};
pub use presence::{MarkerOracle, PresenceOracle};
pub use session_machine::{EndReason, SessionConfig, SessionMachine, SessionReport};
pub use status::{PhaseTransition, SessionPhase, SessionState, SessionStatusHandle};
