//! Elo rating configuration

use crate::error::{RankingError, Result};
use serde::{Deserialize, Serialize};

/// Dynamic K-factor and starting score for the Elo engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Score every category starts from
    pub initial_score: f64,
    /// K-factor while games played is below `k_threshold_games`
    pub k_high: f64,
    /// K-factor once a contestant has `k_threshold_games` games in a category
    pub k_low: f64,
    pub k_threshold_games: u64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial_score: 1200.0,
            k_high: 60.0,
            k_low: 24.0,
            k_threshold_games: 10,
        }
    }
}

impl RatingConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.initial_score.is_finite() {
            return Err(RankingError::ConfigurationError {
                message: "Initial score must be finite".to_string(),
            });
        }
        if !(self.k_high.is_finite() && self.k_high > 0.0) {
            return Err(RankingError::ConfigurationError {
                message: "K_HIGH must be positive".to_string(),
            });
        }
        if !(self.k_low.is_finite() && self.k_low > 0.0) {
            return Err(RankingError::ConfigurationError {
                message: "K_LOW must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RatingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.k_high, 60.0);
        assert_eq!(config.k_low, 24.0);
    }

    #[test]
    fn test_rejects_non_positive_k() {
        let config = RatingConfig {
            k_low: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RankingError::ConfigurationError { .. })
        ));
    }
}
