//! Battle resolution against contestant storage
//!
//! Both sides of a battle are committed together as one guarded
//! read-modify-write over the two contestant-category rows. A conflict on
//! either row is retried once with a fresh read of both rows before it is
//! surfaced, and a failed commit leaves both rows as they were.

use crate::config::RatingConfig;
use crate::error::{RankingError, Result};
use crate::rating::elo::{EloCalculator, Side, SideUpdate};
use crate::rating::storage::{ContestantStorage, ScoreWrite};
use crate::types::{
    BattleOutcome, BattleRecord, Category, CategoryRating, ContestantId, Outcome, ScoreChange,
};
use crate::utils::current_timestamp;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Commit attempts per battle before a conflict is returned to the caller
const MAX_ATTEMPTS: u32 = 2;

/// Applies resolved battles to stored contestant scores
pub struct RatingEngine {
    storage: Arc<dyn ContestantStorage>,
    calculator: EloCalculator,
}

impl RatingEngine {
    /// Create a new rating engine
    pub fn new(storage: Arc<dyn ContestantStorage>, config: RatingConfig) -> Result<Self> {
        Ok(Self {
            storage,
            calculator: EloCalculator::new(config)?,
        })
    }

    pub fn calculator(&self) -> &EloCalculator {
        &self.calculator
    }

    /// Apply a decisive battle: `outcome.winner` beat `outcome.loser`
    pub fn resolve(&self, outcome: &BattleOutcome) -> Result<BattleRecord> {
        outcome.validate()?;
        self.apply(outcome.category, outcome.winner, outcome.loser, Outcome::Win)
    }

    /// Apply a drawn battle between `first` and `second`
    pub fn resolve_draw(
        &self,
        category: Category,
        first: ContestantId,
        second: ContestantId,
    ) -> Result<BattleRecord> {
        if first == second {
            return Err(RankingError::SelfMatch { id: first });
        }
        self.apply(category, first, second, Outcome::Draw)
    }

    fn apply(
        &self,
        category: Category,
        first_id: ContestantId,
        second_id: ContestantId,
        outcome: Outcome,
    ) -> Result<BattleRecord> {
        // Both rows must exist before anything is written
        let first_start = self.storage.get_contestant(first_id)?.rating(category);
        let second_start = self.storage.get_contestant(second_id)?.rating(category);

        let (first_actual, second_actual) = match outcome {
            Outcome::Win => (1.0, 0.0),
            Outcome::Draw => (0.5, 0.5),
        };

        let (mut first, mut second) = (first_start, second_start);
        let mut attempt = 1;
        loop {
            // Each side is scored against the opponent's pre-battle snapshot
            let first_update = self.calculator.side_update(
                Side::First,
                first.score,
                first.games_played,
                second_start.score,
                first_actual,
            );
            let second_update = self.calculator.side_update(
                Side::Second,
                second.score,
                second.games_played,
                first_start.score,
                second_actual,
            );

            let writes = [
                (
                    first_id,
                    ScoreWrite::battle(first_update.new_score, first.revision),
                ),
                (
                    second_id,
                    ScoreWrite::battle(second_update.new_score, second.revision),
                ),
            ];

            match self.storage.commit_battle(category, writes) {
                Ok([first_committed, second_committed]) => {
                    let record = BattleRecord {
                        id: Uuid::new_v4(),
                        category,
                        outcome,
                        first: score_change(first_id, &first, &first_update, &first_committed),
                        second: score_change(second_id, &second, &second_update, &second_committed),
                        retries: attempt - 1,
                        resolved_at: current_timestamp(),
                    };

                    debug!(
                        "Battle resolved - category: {}, {} {:.1} -> {:.1}, {} {:.1} -> {:.1} ({})",
                        category,
                        first_id,
                        record.first.old_score,
                        record.first.new_score,
                        second_id,
                        record.second.old_score,
                        record.second.new_score,
                        outcome
                    );

                    return Ok(record);
                }
                Err(e) if e.is_conflict() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        "Score write conflict in {} battle between {} and {}, retrying with a fresh read",
                        category, first_id, second_id
                    );
                    first = self.storage.get_contestant(first_id)?.rating(category);
                    second = self.storage.get_contestant(second_id)?.rating(category);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn score_change(
    id: ContestantId,
    read: &CategoryRating,
    update: &SideUpdate,
    committed: &CategoryRating,
) -> ScoreChange {
    ScoreChange {
        contestant_id: id,
        old_score: read.score,
        new_score: committed.score,
        expected: update.expected,
        k_factor: update.k_factor,
        games_played: committed.games_played,
    }
}
