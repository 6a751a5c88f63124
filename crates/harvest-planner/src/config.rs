//! Configuration loading for the planner.
//!
//! Economy rules, search limits and output settings are read from a TOML
//! tuning file. Every section is optional and falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::heuristic::HeuristicKind;

/// Default location of the planner tuning file.
pub const DEFAULT_TUNING_PATH: &str = "tuning.toml";

/// Complete planner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Harvest and training rules
    #[serde(default)]
    pub economy: EconomyConfig,
    /// Search limits and heuristic choice
    #[serde(default)]
    pub search: SearchConfig,
    /// Where plans are written
    #[serde(default)]
    pub output: OutputConfig,
}

impl PlannerConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a file the user asked for, failing if it is missing or broken.
    /// Without one, the default tuning file is optional.
    pub fn load_requested(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::load_or_default(DEFAULT_TUNING_PATH)),
        }
    }

    /// Loads from `path`, falling back to defaults if the file is missing or
    /// unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no tuning file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load tuning, using defaults");
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Harvest and training rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Amount one worker picks up per harvest
    pub harvest_unit: u32,
    /// Banked gold spent to train a worker
    pub build_cost: u32,
    /// Whether the planner may train workers at all
    pub allow_build: bool,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            harvest_unit: 100,
            build_cost: 400,
            allow_build: true,
        }
    }
}

/// Search limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Expansions before giving up
    pub max_expansions: usize,
    /// Wall-clock limit in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    pub heuristic: HeuristicKind,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_expansions: 250_000,
            deadline_ms: None,
            heuristic: HeuristicKind::DeliveryDistance,
        }
    }
}

/// Plan output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Text plan destination
    pub plan_path: PathBuf,
    /// Also write `<plan_path>.json`
    pub write_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            plan_path: PathBuf::from("saves/plan.txt"),
            write_json: false,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
