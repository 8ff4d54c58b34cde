use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meetrec")]
#[command(about = "Attend a video meeting and record its audio", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Join a meeting and record it until it ends
    Record(RecordCliArgs),
    /// Run the audio cleanup chain over an existing WAV recording
    Process(ProcessCliArgs),
    /// Inspect the configuration file
    Config(ConfigCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct RecordCliArgs {
    /// Meeting link (prompted for when omitted)
    #[arg(short, long)]
    pub url: Option<String>,
    /// Where to save the recording (default: timestamped file in the data dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Seconds between checks that the meeting is still running
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

#[derive(ClapArgs, Debug)]
pub struct ProcessCliArgs {
    /// 16-bit PCM WAV file to clean up
    pub input: PathBuf,
    /// Output path (default: overwrite the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct ConfigCliArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the path of the configuration file
    Path,
}
