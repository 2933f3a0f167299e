//! Matchmaking configuration

use crate::error::{RankingError, Result};
use serde::{Deserialize, Serialize};

/// Rival/random split and rival score window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingConfig {
    /// Chance that a battle is a rival match rather than a random match
    pub rival_match_probability: f64,
    /// Maximum score distance (inclusive) for a rival
    pub rival_score_window: f64,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            rival_match_probability: 0.8,
            rival_score_window: 300.0, // ±300 score points
        }
    }
}

impl MatchmakingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.rival_match_probability) {
            return Err(RankingError::ConfigurationError {
                message: format!(
                    "Rival match probability must be within [0, 1], got {}",
                    self.rival_match_probability
                ),
            });
        }
        if !(self.rival_score_window >= 0.0) {
            return Err(RankingError::ConfigurationError {
                message: "Rival score window must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}
