use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionSection,
    pub audio: AudioSection,
    pub processing: ProcessingSection,
    pub webdriver: WebDriverSection,
    pub join: JoinSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Seconds between the controller's liveness checks.
    pub poll_interval_secs: u64,
    /// XPath of the element whose presence means the meeting is still running.
    pub presence_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    pub sample_rate: u32,
    pub channels: u16,
    /// Length of one captured chunk, in milliseconds.
    pub chunk_millis: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSection {
    pub headroom_db: f64,
    pub highpass_cutoff_hz: f64,
    pub gain_db: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverSection {
    /// Base URL of a running chromedriver.
    pub url: String,
    pub browser_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinSection {
    pub login_url: String,
    pub login_attempts: u32,
    pub retry_backoff_secs: u64,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Fixed artifact path. When unset a timestamped file under the data dir is used.
    pub path: Option<PathBuf>,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            presence_marker: r#"//*[contains(text(),"You")]"#.to_string(),
        }
    }
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            chunk_millis: 1_000,
        }
    }
}

impl Default for ProcessingSection {
    fn default() -> Self {
        Self {
            headroom_db: 0.1,
            highpass_cutoff_hz: 100.0,
            gain_db: 5.0,
        }
    }
}

impl Default for WebDriverSection {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9515".to_string(),
            browser_args: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--start-maximized".to_string(),
            ],
        }
    }
}

impl Default for JoinSection {
    fn default() -> Self {
        Self {
            login_url: "https://accounts.google.com/ServiceLogin?hl=en&passive=true&continue=https://www.google.com/&ec=GAZAAQ".to_string(),
            login_attempts: 3,
            retry_backoff_secs: 5,
            display_name: "Automated User".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
