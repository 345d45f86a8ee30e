//! Agent configuration.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/rlgrab/agent.toml`
//! - Windows: `%APPDATA%/rlgrab/agent.toml`

use std::fmt;
use std::path::{Path, PathBuf};

use rlgrab_discovery::{DEFAULT_KEEP_DUPLICATES, DEFAULT_POLL_INTERVAL_MS};
use serde::{Deserialize, Serialize};

/// Which discovery strategy the agent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Poll the connection table while a match is running.
    #[default]
    ActiveScan,
    /// Re-read the game log.
    LogTail,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::ActiveScan => write!(f, "active-scan"),
            StrategyKind::LogTail => write!(f, "log-tail"),
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Discovery strategy.
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Poll interval in milliseconds, clamped to the strategy floor and 5000.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Keep repeated endpoints instead of listing each once.
    #[serde(default = "default_keep_duplicates")]
    pub keep_duplicates: bool,

    /// Game executable to attribute connections to.
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Explicit game log path; defaults to the documents folder location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_keep_duplicates() -> bool {
    DEFAULT_KEEP_DUPLICATES
}

fn default_executable() -> String {
    "RocketLeague.exe".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            poll_interval_ms: default_poll_interval_ms(),
            keep_duplicates: default_keep_duplicates(),
            executable: default_executable(),
            log_path: None,
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Saves the current configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&config_path()?)
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("rlgrab")
            .join("agent.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("rlgrab").join("agent.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/rlgrab/agent.toml"))
    }
}
