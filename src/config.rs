use crate::queue::DEFAULT_LEARNING_THRESHOLD;
use crate::scheduler::SchedulerParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Clamp evaluations outside 0-5 instead of rejecting them (default: true)
    #[serde(default = "default_clamp_evaluations")]
    pub clamp_evaluations: bool,

    /// Largest streak still counted as "due" in session counts (default: 2)
    #[serde(default = "default_learning_threshold")]
    pub learning_threshold: u32,

    /// SM-2 constants, under `[scheduler]`
    #[serde(default)]
    pub scheduler: SchedulerParams,

    /// Path to database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_clamp_evaluations() -> bool {
    true
}

fn default_learning_threshold() -> u32 {
    DEFAULT_LEARNING_THRESHOLD
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("flashrep").join("flashrep.db"))
        .unwrap_or_else(|| PathBuf::from("flashrep.db"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clamp_evaluations: default_clamp_evaluations(),
            learning_threshold: default_learning_threshold(),
            scheduler: SchedulerParams::default(),
            db_path: default_db_path(),
        }
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(suffix) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(suffix);
    }
    path.to_path_buf()
}

impl Config {
    /// Load config from the default location or return defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        config.db_path = expand_tilde(&config.db_path);
        Ok(config)
    }

    /// Path to config file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("flashrep").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Ensure the database directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        Ok(())
    }
}
