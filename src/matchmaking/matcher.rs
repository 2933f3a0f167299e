//! Rival and random opponent selection
//!
//! Draw order per call, which scripted sources rely on:
//! 1. category index (skipped when the request names a category)
//! 2. first contestant index (skipped in focus mode)
//! 3. the rival/random roll
//! 4. opponent index

use crate::config::MatchmakingConfig;
use crate::error::{RankingError, Result};
use crate::matchmaking::random::RandomSource;
use crate::rating::storage::ContestantStorage;
use crate::types::{Category, Contestant, ContestantId};
use crate::utils::scores_within_window;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the second contestant was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    /// Opponent within the rival score window
    Rival,
    /// Rival match requested but nobody was inside the window
    RivalFallback,
    /// Opponent drawn from the whole pool
    Random,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::Rival => write!(f, "rival"),
            MatchKind::RivalFallback => write!(f, "rival_fallback"),
            MatchKind::Random => write!(f, "random"),
        }
    }
}

/// Constraints on the next matchup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    /// Pin the first contestant (focus mode)
    pub focus: Option<ContestantId>,
    /// Avoid this contestant, e.g. to prevent an immediate rematch
    pub exclude: Option<ContestantId>,
    /// Use this category instead of drawing one
    pub category: Option<Category>,
}

impl MatchRequest {
    pub fn focused(id: ContestantId) -> Self {
        Self {
            focus: Some(id),
            ..Default::default()
        }
    }
}

/// A selected battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Matchup {
    pub category: Category,
    pub first: Contestant,
    pub second: Contestant,
    pub kind: MatchKind,
}

impl Matchup {
    pub fn ids(&self) -> (ContestantId, ContestantId) {
        (self.first.id, self.second.id)
    }
}

/// Picks (category, first, second) triples for new battles
#[derive(Debug, Clone)]
pub struct Matchmaker {
    config: MatchmakingConfig,
}

impl Matchmaker {
    pub fn new(config: MatchmakingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchmakingConfig {
        &self.config
    }

    /// Select a matchup from the contestants currently in storage
    pub fn select_from_storage<R: RandomSource + ?Sized>(
        &self,
        storage: &dyn ContestantStorage,
        request: &MatchRequest,
        rng: &mut R,
    ) -> Result<Matchup> {
        let available = storage.count()?;
        if available < 2 {
            return Err(RankingError::InsufficientContestants { available });
        }

        let pool = storage.list_contestants()?;
        self.select(&pool, request, rng)
    }

    /// Select a matchup from `pool`
    pub fn select<R: RandomSource + ?Sized>(
        &self,
        pool: &[Contestant],
        request: &MatchRequest,
        rng: &mut R,
    ) -> Result<Matchup> {
        if pool.len() < 2 {
            return Err(RankingError::InsufficientContestants {
                available: pool.len(),
            });
        }

        let category = match request.category {
            Some(category) => category,
            None => Category::ALL[rng.next_index(Category::COUNT)],
        };

        let first = match request.focus {
            Some(id) => pool
                .iter()
                .find(|c| c.id == id)
                .ok_or(RankingError::ContestantNotFound { id })?,
            None => {
                let candidates = without_excluded(pool.iter(), request.exclude);
                let candidates = if candidates.is_empty() {
                    pool.iter().collect()
                } else {
                    candidates
                };
                candidates[rng.next_index(candidates.len())]
            }
        };

        let mut opponents = without_excluded(pool.iter().filter(|c| c.id != first.id), request.exclude);
        if opponents.is_empty() {
            opponents = pool.iter().filter(|c| c.id != first.id).collect();
        }
        if opponents.is_empty() {
            return Err(RankingError::InsufficientContestants { available: 1 });
        }

        let roll = rng.next_unit();
        let (second, kind) = if roll < self.config.rival_match_probability {
            self.pick_rival(first, &opponents, category, rng)
        } else {
            (opponents[rng.next_index(opponents.len())], MatchKind::Random)
        };

        debug!(
            "Matchup selected - category: {}, {} ({:.1}) vs {} ({:.1}), kind: {}",
            category,
            first.id,
            first.score(category),
            second.id,
            second.score(category),
            kind
        );

        Ok(Matchup {
            category,
            first: first.clone(),
            second: second.clone(),
            kind,
        })
    }

    /// Opponent within the score window, or anyone when the window is empty
    fn pick_rival<'a, R: RandomSource + ?Sized>(
        &self,
        first: &Contestant,
        opponents: &[&'a Contestant],
        category: Category,
        rng: &mut R,
    ) -> (&'a Contestant, MatchKind) {
        let anchor = first.score(category);
        let rivals: Vec<&Contestant> = opponents
            .iter()
            .copied()
            .filter(|c| {
                scores_within_window(anchor, c.score(category), self.config.rival_score_window)
            })
            .collect();

        if rivals.is_empty() {
            (
                opponents[rng.next_index(opponents.len())],
                MatchKind::RivalFallback,
            )
        } else {
            (rivals[rng.next_index(rivals.len())], MatchKind::Rival)
        }
    }
}

fn without_excluded<'a>(
    contestants: impl Iterator<Item = &'a Contestant>,
    exclude: Option<ContestantId>,
) -> Vec<&'a Contestant> {
    contestants.filter(|c| Some(c.id) != exclude).collect()
}
