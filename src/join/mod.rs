//! Sign in and get admitted to the meeting.
//!
//! Every step is a wait-then-act against the [`SessionSurface`]. Only the
//! login is retried, a fixed number of times.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::surface::{SessionSurface, SurfaceError};

mod xpath {
    pub const IDENTIFIER_INPUT: &str = r#"//*[@id="identifierId"]"#;
    pub const IDENTIFIER_NEXT: &str = r#"//*[@id="identifierNext"]"#;
    pub const PASSWORD_INPUT: &str = r#"//*[@id="password"]/div[1]/div/div[1]/input"#;
    pub const PASSWORD_NEXT: &str = r#"//*[@id="passwordNext"]"#;
    pub const SIGNED_IN: &str = r#"//*[contains(@aria-label,"Google Account")]"#;
    pub const MIC_OFF: &str = r#"//*[contains(@aria-label,"Turn off microphone")]"#;
    pub const CAMERA_OFF: &str = r#"//*[contains(@aria-label,"Turn off camera")]"#;
    pub const JOIN_NOW: &str = r#"//span[text()="Join now"]/.."#;
    pub const ASK_TO_JOIN: &str = r#"//span[text()="Ask to join"]/.."#;
    pub const NAME_INPUT: &str = r#"//input[@placeholder="Your name"]"#;
}

const FIELD_WAIT: Duration = Duration::from_secs(10);
const SIGN_IN_WAIT: Duration = Duration::from_secs(20);
const JOIN_BUTTON_WAIT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("environment variable {0} is not set")]
    MissingCredential(&'static str),
    #[error("login did not succeed after {attempts} attempt(s)")]
    LoginFailed { attempts: u32 },
    #[error("no way to join the meeting was found (join, ask to join and name prompt all missing)")]
    NoJoinControl,
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read `MEETREC_EMAIL`/`MEETREC_PASSWORD`, falling back to `EMAIL`/`PASSWORD`.
    pub fn from_env() -> Result<Self, JoinError> {
        Ok(Self {
            email: read_var("MEETREC_EMAIL", "EMAIL")?,
            password: read_var("MEETREC_PASSWORD", "PASSWORD")?,
        })
    }
}

fn read_var(primary: &'static str, fallback: &'static str) -> Result<String, JoinError> {
    std::env::var(primary)
        .or_else(|_| std::env::var(fallback))
        .map_err(|_| JoinError::MissingCredential(primary))
}

/// Everything needed to get from a fresh browser into the meeting.
#[derive(Debug, Clone)]
pub struct JoinPlan {
    pub login_url: String,
    pub credentials: Credentials,
    pub meeting_url: String,
    pub login_attempts: u32,
    pub retry_backoff: Duration,
    pub display_name: String,
}

impl JoinPlan {
    pub fn new(config: &Config, credentials: Credentials, meeting_url: String) -> Self {
        Self {
            login_url: config.join.login_url.clone(),
            credentials,
            meeting_url,
            login_attempts: config.join.login_attempts.max(1),
            retry_backoff: Duration::from_secs(config.join.retry_backoff_secs),
            display_name: config.join.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AskedToJoin,
    JoinedAsGuest,
}

impl fmt::Display for JoinOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined => f.write_str("joined"),
            Self::AskedToJoin => f.write_str("asked to join, waiting for the host"),
            Self::JoinedAsGuest => f.write_str("joined as guest"),
        }
    }
}

pub async fn join_meeting(
    surface: &dyn SessionSurface,
    plan: &JoinPlan,
) -> Result<JoinOutcome, JoinError> {
    login(surface, plan).await?;

    surface.navigate(&plan.meeting_url).await?;
    turn_off_media(surface).await;

    enter_meeting(surface, plan).await
}

async fn login(surface: &dyn SessionSurface, plan: &JoinPlan) -> Result<(), JoinError> {
    for attempt in 1..=plan.login_attempts {
        match attempt_login(surface, plan).await {
            Ok(true) => {
                info!("Logged in successfully");
                return Ok(());
            }
            Ok(false) => warn!(
                "Login attempt {}/{} did not reach the signed-in page",
                attempt, plan.login_attempts
            ),
            Err(e) => warn!(
                "Login attempt {}/{} failed: {}",
                attempt, plan.login_attempts, e
            ),
        }

        if attempt < plan.login_attempts {
            tokio::time::sleep(plan.retry_backoff).await;
        }
    }

    Err(JoinError::LoginFailed {
        attempts: plan.login_attempts,
    })
}

async fn attempt_login(
    surface: &dyn SessionSurface,
    plan: &JoinPlan,
) -> Result<bool, SurfaceError> {
    surface.navigate(&plan.login_url).await?;

    fill(surface, xpath::IDENTIFIER_INPUT, &plan.credentials.email).await?;
    surface.click(xpath::IDENTIFIER_NEXT).await?;

    fill(surface, xpath::PASSWORD_INPUT, &plan.credentials.password).await?;
    surface.click(xpath::PASSWORD_NEXT).await?;

    surface.wait_for(xpath::SIGNED_IN, SIGN_IN_WAIT).await
}

async fn fill(
    surface: &dyn SessionSurface,
    target: &str,
    text: &str,
) -> Result<(), SurfaceError> {
    if !surface.wait_for(target, FIELD_WAIT).await? {
        return Err(SurfaceError::NoSuchElement(target.to_string()));
    }
    surface.send_keys(target, text).await
}

async fn click_when_ready(
    surface: &dyn SessionSurface,
    target: &str,
    timeout: Duration,
) -> Result<bool, SurfaceError> {
    if !surface.wait_for(target, timeout).await? {
        return Ok(false);
    }
    surface.click(target).await?;
    Ok(true)
}

async fn turn_off_media(surface: &dyn SessionSurface) {
    for (target, what) in [(xpath::MIC_OFF, "microphone"), (xpath::CAMERA_OFF, "camera")] {
        match click_when_ready(surface, target, FIELD_WAIT).await {
            Ok(true) => info!("Turned off {}", what),
            Ok(false) => warn!("No control to turn off the {} was found", what),
            Err(e) => warn!("Could not turn off the {}: {}", what, e),
        }
    }
}

async fn enter_meeting(
    surface: &dyn SessionSurface,
    plan: &JoinPlan,
) -> Result<JoinOutcome, JoinError> {
    if click_when_ready(surface, xpath::JOIN_NOW, JOIN_BUTTON_WAIT).await? {
        info!("Clicked 'Join now'");
        return Ok(JoinOutcome::Joined);
    }
    info!("Could not find 'Join now' button. Trying 'Ask to join'...");

    if click_when_ready(surface, xpath::ASK_TO_JOIN, JOIN_BUTTON_WAIT).await? {
        info!("Clicked 'Ask to join'");
        return Ok(JoinOutcome::AskedToJoin);
    }
    warn!("Could not find 'Ask to join' button. Looking for a name prompt...");

    if surface.wait_for(xpath::NAME_INPUT, FIELD_WAIT).await? {
        surface.send_keys(xpath::NAME_INPUT, &plan.display_name).await?;
        surface.click(xpath::JOIN_NOW).await?;
        info!("Joined as '{}'", plan.display_name);
        return Ok(JoinOutcome::JoinedAsGuest);
    }

    Err(JoinError::NoJoinControl)
}
