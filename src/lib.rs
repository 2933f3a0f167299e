//! Versus Rank - pairwise battle ranking service
//!
//! This crate ranks a fixed population of contestants along six independent
//! categories. Votes on head-to-head battles feed an Elo engine with a dynamic
//! K-factor, a matchmaker pairs contestants of similar strength, and a
//! normalizer periodically re-anchors each category's mean score.

pub mod config;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod normalization;
pub mod ranking;
pub mod rating;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RankingError, Result};
pub use types::*;

// Re-export key components
pub use matchmaking::{MatchRequest, Matchmaker, Matchup};
pub use normalization::Normalizer;
pub use rating::{ContestantStorage, InMemoryContestantStorage, RatingEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
