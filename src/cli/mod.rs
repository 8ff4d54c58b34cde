use crate::app::{self, RecordOptions};
use crate::config::Config;
use crate::meeting::EndReason;
use anyhow::{bail, Context, Result};
use dialoguer::Input;

pub mod args;

pub use args::{Cli, CliCommand, ConfigCliArgs, ConfigCommand, ProcessCliArgs, RecordCliArgs};

pub async fn handle_record_command(args: RecordCliArgs) -> Result<()> {
    let config = Config::load()?;

    let meeting_url = match args.url {
        Some(url) => url,
        None => prompt_meeting_url()?,
    };
    if meeting_url.trim().is_empty() {
        bail!("A meeting link is required");
    }

    let report = app::run_session(
        config,
        RecordOptions {
            meeting_url: meeting_url.trim().to_string(),
            output: args.output,
            poll_interval_secs: args.poll_interval,
        },
    )
    .await?;

    let ended = match report.end_reason {
        EndReason::SessionEnded => "meeting ended",
        EndReason::Interrupted => "stopped manually",
        EndReason::CaptureFailed => "audio device failed",
    };
    println!(
        "Recorded {:.0}s ({}) to {}",
        report.duration.as_secs_f64(),
        ended,
        report.output_path.display()
    );
    if let Some(e) = report.capture_error {
        println!("Warning: recording is partial: {e}");
    }

    Ok(())
}

pub fn handle_process_command(args: ProcessCliArgs) -> Result<()> {
    let config = Config::load()?;
    let output = app::process_file(&config, &args.input, args.output.as_deref())?;
    println!("Processed audio saved as {}", output.display());
    Ok(())
}

pub fn handle_config_command(args: ConfigCliArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", Config::config_path()?.display());
        }
        ConfigCommand::Show => {
            let config = Config::load()?;
            let text = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            print!("{text}");
        }
    }
    Ok(())
}

fn prompt_meeting_url() -> Result<String> {
    Input::<String>::new()
        .with_prompt("Please enter the meeting link")
        .interact_text()
        .context("Failed to read meeting link")
}
