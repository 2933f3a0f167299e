//! Normalization configuration

use crate::error::{RankingError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mean anchoring parameters and the triggers that drive passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Target mean for every category
    pub anchor: f64,
    /// Fraction of the deviation applied per pass, in (0, 1]
    pub damping: f64,
    /// Deviations at or below this magnitude are left alone
    pub min_deviation: f64,
    /// Timer trigger period, 0 disables it
    pub interval_seconds: u64,
    /// Battle-count trigger period, 0 disables it
    pub every_n_battles: u64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            anchor: 1200.0,
            damping: 1.0,
            min_deviation: 1e-9,
            interval_seconds: 300, // 5 minutes
            every_n_battles: 50,
        }
    }
}

impl NormalizationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.anchor.is_finite() {
            return Err(RankingError::ConfigurationError {
                message: "Score anchor must be finite".to_string(),
            });
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(RankingError::ConfigurationError {
                message: format!(
                    "Normalization damping must be within (0, 1], got {}",
                    self.damping
                ),
            });
        }
        if !(self.min_deviation >= 0.0) {
            return Err(RankingError::ConfigurationError {
                message: "Normalization min deviation must be non-negative".to_string(),
            });
        }
        Ok(())
    }

    /// Timer trigger period, if enabled
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_seconds > 0).then(|| Duration::from_secs(self.interval_seconds))
    }
}
