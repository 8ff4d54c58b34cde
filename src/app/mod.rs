use crate::audio::{wav, MicInput, PostProcessor};
use crate::config::Config;
use crate::global;
use crate::join::{self, Credentials, JoinPlan};
use crate::meeting::{
    MarkerOracle, SessionConfig, SessionMachine, SessionReport, SessionStatusHandle,
};
use crate::surface::{SessionSurface, WebDriverSurface};
use anyhow::{anyhow, Context, Result};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Per-run overrides from the command line.
#[derive(Debug, Default)]
pub struct RecordOptions {
    pub meeting_url: String,
    pub output: Option<PathBuf>,
    pub poll_interval_secs: Option<u64>,
}

/// Join the meeting, record it until it ends, and write the cleaned recording.
pub async fn run_session(mut config: Config, options: RecordOptions) -> Result<SessionReport> {
    if let Some(secs) = options.poll_interval_secs {
        config.session.poll_interval_secs = secs;
    }

    let credentials = Credentials::from_env().context("Missing login credentials")?;
    let output_path = resolve_output_path(&config, options.output)?;
    let session_config = SessionConfig::from_config(&config, output_path)?;
    let plan = JoinPlan::new(&config, credentials, options.meeting_url);

    let surface: Arc<dyn SessionSurface> = Arc::new(
        WebDriverSurface::connect(&config.webdriver.url, &config.webdriver.browser_args)
            .await
            .with_context(|| {
                format!(
                    "Failed to start a browser session at {}. Is chromedriver running?",
                    config.webdriver.url
                )
            })?,
    );

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let joined = tokio::select! {
        joined = join::join_meeting(surface.as_ref(), &plan) => {
            joined.context("Failed to join the meeting")
        }
        _ = cancel.cancelled() => Err(anyhow!("Interrupted before the meeting was joined")),
    };
    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Err(release_err) = surface.release().await {
                warn!("Failed to release browser session: {}", release_err);
            }
            return Err(e);
        }
    };
    info!("Meeting {}", outcome);

    let oracle = Arc::new(MarkerOracle::new(
        surface.clone(),
        config.session.presence_marker.clone(),
    ));

    let machine = SessionMachine::new(
        session_config,
        oracle,
        surface,
        Box::new(MicInput::boxed),
        SessionStatusHandle::default(),
    );

    let report = machine.run(cancel).await?;
    Ok(report)
}

/// Run the cleanup chain over an existing recording.
pub fn process_file(config: &Config, input: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let output = output.unwrap_or(input).to_path_buf();
    let processor = PostProcessor::from(&config.processing);

    let waveform =
        wav::read_wav(input).with_context(|| format!("Failed to read recording {:?}", input))?;
    info!(
        "Post-processing {:?} ({:.1}s, {} Hz, {} channel(s))",
        input,
        waveform.duration().as_secs_f64(),
        waveform.format.sample_rate,
        waveform.format.channels
    );

    let processed = processor
        .process(waveform)
        .with_context(|| format!("Failed to post-process {:?}", input))?;
    wav::write_wav(&output, &processed)
        .with_context(|| format!("Failed to write processed audio to {:?}", output))?;

    info!("Processed audio saved as {:?}", output);
    Ok(output)
}

/// The first Ctrl-C stops the recording and lets it be saved. A second one
/// exits immediately.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match forward_interrupts(cancel, tokio::signal::ctrl_c).await {
            Ok(()) => {
                warn!("Interrupted again, exiting without finishing");
                std::process::exit(130);
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

/// Cancel on the first signal, then return on the second.
async fn forward_interrupts<S, F>(cancel: CancellationToken, mut next_signal: S) -> io::Result<()>
where
    S: FnMut() -> F,
    F: Future<Output = io::Result<()>>,
{
    next_signal().await?;
    info!("Interrupt received, stopping after the current chunk");
    cancel.cancel();

    next_signal().await?;
    Ok(())
}

fn resolve_output_path(config: &Config, cli_output: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_output.or_else(|| config.output.path.clone()) {
        return Ok(path);
    }

    let dir = global::recordings_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create recordings directory {:?}", dir))?;
    Ok(generate_recording_path(&dir))
}

fn generate_recording_path(dir: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("meeting-{}.wav", timestamp));

    // Handle collision by appending counter
    if path.exists() {
        for i in 1..100 {
            let alt_path = dir.join(format!("meeting-{}-{}.wav", timestamp, i));
            if !alt_path.exists() {
                return alt_path;
            }
        }
    }

    path
}
