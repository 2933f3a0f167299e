//! Opponent selection for the next battle
//!
//! This module picks a category and two distinct contestants, preferring
//! rivals of similar score and falling back to random opponents.

pub mod matcher;
pub mod random;

pub use matcher::{MatchKind, MatchRequest, Matchmaker, Matchup};
pub use random::{RandomSource, RngSource, ScriptedSource};
