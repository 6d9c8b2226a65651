use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub reports: ReportsConfig,
    pub extract: ExtractConfig,
    pub notifications: NotificationsConfig,
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Local clone of the source bucket, one sub-directory per insolvency type
    pub local_files: PathBuf,
    /// Federal state a residence must be in for a case to count
    pub federal_state: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            local_files: PathBuf::from("data/source"),
            federal_state: "Nordrhein-Westfalen".to_string(),
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub output_dir: PathBuf,
    /// Copy changed reports into a dated folder
    pub archive: bool,
    /// Length of the trailing window for district reports
    pub district_window_days: i64,
    /// `name,inhabitants` CSV replacing the built-in table
    pub population_table: Option<PathBuf>,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/reports"),
            archive: true,
            district_window_days: 30,
            population_table: None,
        }
    }
}

/// Feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Directory holding the scraped `.jsonl` files
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Files extracted at the same time
    pub workers: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/insolvenzbekanntmachungen-scraper"),
            output_dir: PathBuf::from("extracted"),
            workers: 4,
        }
    }
}

/// Notifications configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotificationsConfig {
    pub slack: SlackConfig,
}

/// Slack notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
    pub on_failure: bool,
    pub on_report_change: bool,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            channel: None,
            on_failure: true,
            on_report_change: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    /// Load configuration from the default location (.insolvency/config.yml)
    pub fn load_default() -> Result<Self> {
        Self::load(".insolvency/config.yml")
    }

    /// Apply `LOCAL_FILES`, `REPORTS_DIR`, `EXTRACT_INPUT_DIR` and `SLACK_WEBHOOK_URL`
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("LOCAL_FILES") {
            self.source.local_files = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("REPORTS_DIR") {
            self.reports.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("EXTRACT_INPUT_DIR") {
            self.extract.input_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("SLACK_WEBHOOK_URL") {
            self.notifications.slack.webhook_url = Some(url);
        }
        self
    }
}
