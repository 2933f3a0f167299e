//! Common types used throughout the ranking service

use crate::error::{RankingError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Stable unique identifier for contestants
pub type ContestantId = u64;

/// Unique identifier for logged battles
pub type BattleId = Uuid;

/// One of the six fixed quality dimensions a battle is fought in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Story,
    Visual,
    Ost,
    Voice,
    #[serde(rename = "char", alias = "character")]
    Character,
    Fun,
}

impl Category {
    /// Every category, in table order
    pub const ALL: [Category; 6] = [
        Category::Story,
        Category::Visual,
        Category::Ost,
        Category::Voice,
        Category::Character,
        Category::Fun,
    ];

    /// Number of categories
    pub const COUNT: usize = Self::ALL.len();

    /// Stable key used in requests and configuration
    pub fn key(&self) -> &'static str {
        match self {
            Category::Story => "story",
            Category::Visual => "visual",
            Category::Ost => "ost",
            Category::Voice => "voice",
            Category::Character => "char",
            Category::Fun => "fun",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Story => "Story",
            Category::Visual => "Visual",
            Category::Ost => "OST",
            Category::Voice => "Voice acting",
            Category::Character => "Characters",
            Category::Fun => "Overall fun",
        }
    }

    /// Slot of this category in a [`CategoryRatings`] table
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Category {
    type Err = RankingError;

    fn from_str(key: &str) -> Result<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "story" => Ok(Category::Story),
            "visual" => Ok(Category::Visual),
            "ost" => Ok(Category::Ost),
            "voice" => Ok(Category::Voice),
            "char" | "character" => Ok(Category::Character),
            "fun" => Ok(Category::Fun),
            _ => Err(RankingError::InvalidCategory {
                key: key.to_string(),
            }),
        }
    }
}

/// Score state of one contestant in one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryRating {
    pub score: f64,
    pub games_played: u64,
    /// Bumped on every write; used as the optimistic concurrency token
    pub revision: u64,
}

impl CategoryRating {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            games_played: 0,
            revision: 0,
        }
    }
}

/// Fixed table holding exactly one rating per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRatings([CategoryRating; Category::COUNT]);

impl CategoryRatings {
    /// Every category starts from the same score with no games played
    pub fn uniform(score: f64) -> Self {
        Self([CategoryRating::new(score); Category::COUNT])
    }

    pub fn get(&self, category: Category) -> &CategoryRating {
        &self.0[category.index()]
    }

    pub fn get_mut(&mut self, category: Category) -> &mut CategoryRating {
        &mut self.0[category.index()]
    }

    /// Iterate `(category, rating)` pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &CategoryRating)> {
        Category::ALL.iter().copied().zip(self.0.iter())
    }
}

/// An item ranked along the six categories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contestant {
    pub id: ContestantId,
    pub name: String,
    pub ratings: CategoryRatings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contestant {
    /// Create a contestant with every category at `initial_score`
    pub fn new(id: ContestantId, name: impl Into<String>, initial_score: f64) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            ratings: CategoryRatings::uniform(initial_score),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rating(&self, category: Category) -> CategoryRating {
        *self.ratings.get(category)
    }

    pub fn score(&self, category: Category) -> f64 {
        self.ratings.get(category).score
    }

    /// Mean of the six category scores
    pub fn overall_score(&self) -> f64 {
        let total: f64 = self.ratings.iter().map(|(_, r)| r.score).sum();
        total / Category::COUNT as f64
    }

    /// Battles fought across all categories
    pub fn total_games(&self) -> u64 {
        self.ratings.iter().map(|(_, r)| r.games_played).sum()
    }
}

/// How a battle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// `first` beat `second`
    Win,
    Draw,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Draw => write!(f, "draw"),
        }
    }
}

/// A resolved vote: `winner` beat `loser` in `category`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOutcome {
    pub category: Category,
    pub winner: ContestantId,
    pub loser: ContestantId,
}

impl BattleOutcome {
    /// Build an outcome from a raw category key, validating both the key and the pair
    pub fn parse(category_key: &str, winner: ContestantId, loser: ContestantId) -> Result<Self> {
        let outcome = Self {
            category: category_key.parse()?,
            winner,
            loser,
        };
        outcome.validate()?;
        Ok(outcome)
    }

    pub fn validate(&self) -> Result<()> {
        if self.winner == self.loser {
            return Err(RankingError::SelfMatch { id: self.winner });
        }
        Ok(())
    }
}

/// Score movement of one side of a battle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub contestant_id: ContestantId,
    pub old_score: f64,
    pub new_score: f64,
    /// Expected score of this side before the battle
    pub expected: f64,
    /// K-factor used for this side
    pub k_factor: f64,
    pub games_played: u64,
}

impl ScoreChange {
    pub fn delta(&self) -> f64 {
        self.new_score - self.old_score
    }
}

/// Audit entry for one resolved battle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleRecord {
    pub id: BattleId,
    pub category: Category,
    pub outcome: Outcome,
    /// Winner for [`Outcome::Win`], first side for a draw
    pub first: ScoreChange,
    /// Loser for [`Outcome::Win`], second side for a draw
    pub second: ScoreChange,
    /// Number of conflict retries needed to commit both sides
    pub retries: u32,
    pub resolved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_keys_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.key().parse::<Category>().unwrap(), category);
        }
        assert_eq!("Character".parse::<Category>().unwrap(), Category::Character);
        assert_eq!(" STORY ".parse::<Category>().unwrap(), Category::Story);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let err = "plot".parse::<Category>().unwrap_err();
        assert_eq!(
            err,
            RankingError::InvalidCategory {
                key: "plot".to_string()
            }
        );
    }

    #[test]
    fn test_category_indices_match_table_order() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn test_new_contestant_is_fully_populated() {
        let contestant = Contestant::new(7, "Frieren", 1200.0);
        for (_, rating) in contestant.ratings.iter() {
            assert_eq!(rating.score, 1200.0);
            assert_eq!(rating.games_played, 0);
        }
        assert_eq!(contestant.ratings.iter().count(), Category::COUNT);
        assert_eq!(contestant.overall_score(), 1200.0);
        assert_eq!(contestant.total_games(), 0);
    }

    #[test]
    fn test_overall_score_is_category_mean() {
        let mut contestant = Contestant::new(1, "Mushishi", 1200.0);
        contestant.ratings.get_mut(Category::Story).score = 1500.0;
        contestant.ratings.get_mut(Category::Fun).score = 900.0;
        assert_eq!(contestant.overall_score(), 1200.0);

        contestant.ratings.get_mut(Category::Ost).score = 1260.0;
        assert_eq!(contestant.overall_score(), 1210.0);
    }

    #[test]
    fn test_battle_outcome_parse() {
        let outcome = BattleOutcome::parse("voice", 1, 2).unwrap();
        assert_eq!(outcome.category, Category::Voice);

        assert!(matches!(
            BattleOutcome::parse("voice", 3, 3),
            Err(RankingError::SelfMatch { id: 3 })
        ));
        assert!(matches!(
            BattleOutcome::parse("sound", 1, 2),
            Err(RankingError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn test_category_serde_uses_keys() {
        let json = serde_json::to_string(&Category::Character).unwrap();
        assert_eq!(json, "\"char\"");
        let parsed: Category = serde_json::from_str("\"ost\"").unwrap();
        assert_eq!(parsed, Category::Ost);
    }
}
