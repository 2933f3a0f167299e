//! Main application configuration
//!
//! This module defines the top-level configuration for the versus-rank
//! service, including environment variable and TOML file loading and
//! validation.

use crate::config::{MatchmakingConfig, NormalizationConfig, RatingConfig};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub rating: RatingConfig,
    pub matchmaking: MatchmakingConfig,
    pub normalization: NormalizationConfig,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Battle records kept in the in-memory history
    pub max_history: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "versus-rank".to_string(),
            log_level: "info".to_string(),
            shutdown_timeout_seconds: 10,
            max_history: 10_000,
        }
    }
}

/// Overwrite `target` with the parsed value of `name` when it is set
fn env_override<T: FromStr>(name: &str, target: &mut T) -> Result<()> {
    if let Ok(raw) = env::var(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", name, raw))?;
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing sections use defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        env_override(
            "SHUTDOWN_TIMEOUT_SECONDS",
            &mut self.service.shutdown_timeout_seconds,
        )?;
        env_override("MAX_HISTORY", &mut self.service.max_history)?;

        // Rating settings
        env_override("INITIAL_SCORE", &mut self.rating.initial_score)?;
        env_override("K_HIGH", &mut self.rating.k_high)?;
        env_override("K_LOW", &mut self.rating.k_low)?;
        env_override("K_THRESHOLD_GAMES", &mut self.rating.k_threshold_games)?;

        // Matchmaking settings
        env_override(
            "RIVAL_MATCH_PROBABILITY",
            &mut self.matchmaking.rival_match_probability,
        )?;
        env_override(
            "RIVAL_SCORE_WINDOW",
            &mut self.matchmaking.rival_score_window,
        )?;

        // Normalization settings
        env_override("SCORE_ANCHOR", &mut self.normalization.anchor)?;
        env_override("NORMALIZATION_DAMPING", &mut self.normalization.damping)?;
        env_override(
            "NORMALIZATION_MIN_DEVIATION",
            &mut self.normalization.min_deviation,
        )?;
        env_override(
            "NORMALIZATION_INTERVAL_SECONDS",
            &mut self.normalization.interval_seconds,
        )?;
        env_override(
            "NORMALIZATION_EVERY_N_BATTLES",
            &mut self.normalization.every_n_battles,
        )?;

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    config.rating.validate()?;
    config.matchmaking.validate()?;
    config.normalization.validate()?;

    Ok(())
}
