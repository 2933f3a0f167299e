//! Elo rating engine and the storage contract it writes through
//!
//! This module provides the expected-score and dynamic K-factor math, the
//! engine that applies battle outcomes with per-row optimistic concurrency,
//! and the contestant storage interface.

pub mod elo;
pub mod engine;
pub mod storage;

// Re-export commonly used types
pub use elo::{EloCalculator, Side, SideUpdate};
pub use engine::RatingEngine;
pub use storage::{ContestantStorage, InMemoryContestantStorage, MockContestantStorage, ScoreWrite};
