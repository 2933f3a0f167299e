//! Elo expected score and dynamic K-factor
//!
//! The logistic expectation comes from the skillratings crate; the per-side
//! K-factor selection is ours since each contestant's games played differ.

use crate::config::RatingConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use skillratings::elo::{expected_score, EloRating};

/// Which side of a battle a score belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Winner, or the first contestant of a draw
    First,
    /// Loser, or the second contestant of a draw
    Second,
}

/// Proposed new score for one side of a battle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideUpdate {
    pub expected: f64,
    pub k_factor: f64,
    pub new_score: f64,
}

impl SideUpdate {
    pub fn delta(&self, old_score: f64) -> f64 {
        self.new_score - old_score
    }
}

/// Expectation of `first` against `second`: `1 / (1 + 10^((second - first) / 400))`
///
/// The second side's expectation is exactly `1 - first`.
pub fn expected_pair(first: f64, second: f64) -> (f64, f64) {
    expected_score(&EloRating { rating: first }, &EloRating { rating: second })
}

/// Elo calculator with a games-played dependent K-factor
#[derive(Debug, Clone)]
pub struct EloCalculator {
    config: RatingConfig,
}

impl EloCalculator {
    /// Create a new calculator
    pub fn new(config: RatingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// `k_high` below the games threshold, `k_low` at or above it
    pub fn k_factor(&self, games_played: u64) -> f64 {
        if games_played < self.config.k_threshold_games {
            self.config.k_high
        } else {
            self.config.k_low
        }
    }

    /// Expected score of `side`, computed from the first side's logistic expectation
    pub fn expected_for(&self, side: Side, own_score: f64, opponent_score: f64) -> f64 {
        match side {
            Side::First => expected_pair(own_score, opponent_score).0,
            Side::Second => expected_pair(opponent_score, own_score).1,
        }
    }

    /// New score for one side given the actual result it achieved (1, 0.5 or 0)
    pub fn side_update(
        &self,
        side: Side,
        own_score: f64,
        own_games: u64,
        opponent_score: f64,
        actual: f64,
    ) -> SideUpdate {
        let expected = self.expected_for(side, own_score, opponent_score);
        let k_factor = self.k_factor(own_games);
        SideUpdate {
            expected,
            k_factor,
            new_score: own_score + k_factor * (actual - expected),
        }
    }

    /// Winner and loser updates for a decisive battle
    ///
    /// Each side uses its own K-factor, so the pair is only zero-sum when
    /// both K-factors agree.
    pub fn decisive(
        &self,
        winner_score: f64,
        winner_games: u64,
        loser_score: f64,
        loser_games: u64,
    ) -> (SideUpdate, SideUpdate) {
        (
            self.side_update(Side::First, winner_score, winner_games, loser_score, 1.0),
            self.side_update(Side::Second, loser_score, loser_games, winner_score, 0.0),
        )
    }

    /// Updates for a drawn battle
    pub fn draw(
        &self,
        first_score: f64,
        first_games: u64,
        second_score: f64,
        second_games: u64,
    ) -> (SideUpdate, SideUpdate) {
        (
            self.side_update(Side::First, first_score, first_games, second_score, 0.5),
            self.side_update(Side::Second, second_score, second_games, first_score, 0.5),
        )
    }
}

impl Default for EloCalculator {
    fn default() -> Self {
        Self {
            config: RatingConfig::default(),
        }
    }
}
