//! Read-side views over contestant scores
//!
//! Leaderboards, rank lookups, score histograms and the pre-vote preview of a
//! matchup. Nothing here writes to storage.

pub mod leaderboard;
pub mod preview;

pub use leaderboard::{
    rank_of, score_histogram, HistogramBucket, Leaderboard, RankInfo, SortKey, Standing,
    DEFAULT_BUCKET_WIDTH,
};
pub use preview::{MatchupPreview, SidePreview};
