//! Configuration loading and parsing

use anyhow::{Context, Result};
use carstate::CarParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from car.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// DBC files with the car's message definitions
    #[serde(default)]
    pub dbc_files: Vec<PathBuf>,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub car: CarParams,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplayConfig {
    /// Control cycle length in milliseconds
    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,
    /// Only write cycles where every frequency-checked message is fresh
    #[serde(default)]
    pub require_can_valid: bool,
}

fn default_cycle_ms() -> u64 {
    10
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            cycle_ms: default_cycle_ms(),
            require_can_valid: false,
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .car
        .validate()
        .with_context(|| format!("Invalid car parameters in {:?}", path))?;
    anyhow::ensure!(config.replay.cycle_ms > 0, "replay.cycle_ms must be positive");

    Ok(config)
}
