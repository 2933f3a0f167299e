//! Error types for the ranking service
//!
//! Core operations return [`RankingError`] so callers can tell failure kinds
//! apart; the service shell and binary wrap them in `anyhow`.

use crate::types::{Category, ContestantId};

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, RankingError>;

/// Error kinds surfaced by the rating, matchmaking and normalization core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RankingError {
    #[error("Invalid category: {key}")]
    InvalidCategory { key: String },

    #[error("Contestant {id} cannot battle itself")]
    SelfMatch { id: ContestantId },

    #[error("Contestant not found: {id}")]
    ContestantNotFound { id: ContestantId },

    #[error("Not enough contestants for a battle: {available} available, 2 required")]
    InsufficientContestants { available: usize },

    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    #[error("Concurrent update conflict on contestant {id} in category {category}")]
    ConcurrentUpdateConflict {
        id: ContestantId,
        category: Category,
    },

    #[error("Invalid contestant name: {name:?}")]
    InvalidName { name: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl RankingError {
    /// Whether a fresh read and another attempt may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, RankingError::ConcurrentUpdateConflict { .. })
    }
}
