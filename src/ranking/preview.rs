//! What a voter sees before choosing a winner

use crate::matchmaking::Matchup;
use crate::ranking::leaderboard::{rank_of, RankInfo};
use crate::rating::elo::expected_pair;
use crate::types::{Category, Contestant, ContestantId};
use serde::{Deserialize, Serialize};

/// One side of a previewed matchup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidePreview {
    pub id: ContestantId,
    pub name: String,
    pub score: f64,
    /// Expected score against the other side
    pub win_probability: f64,
    pub rank: RankInfo,
}

/// Win probabilities and category ranks for both sides of a matchup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupPreview {
    pub category: Category,
    pub first: SidePreview,
    pub second: SidePreview,
}

impl MatchupPreview {
    /// Build a preview; ranks are computed against `population`
    pub fn build(matchup: &Matchup, population: &[Contestant]) -> Self {
        let category = matchup.category;
        let first_score = matchup.first.score(category);
        let second_score = matchup.second.score(category);
        let (first_p, second_p) = expected_pair(first_score, second_score);

        let side = |contestant: &Contestant, score: f64, win_probability: f64| SidePreview {
            id: contestant.id,
            name: contestant.name.clone(),
            score,
            win_probability,
            rank: rank_of(population, category, score),
        };

        Self {
            category,
            first: side(&matchup.first, first_score, first_p),
            second: side(&matchup.second, second_score, second_p),
        }
    }
}
