//! Utility functions for the ranking service

use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Calculate the absolute difference between two scores
pub fn score_difference(score1: f64, score2: f64) -> f64 {
    (score1 - score2).abs()
}

/// Check if two scores are within the given window (inclusive)
pub fn scores_within_window(score1: f64, score2: f64, window: f64) -> bool {
    score_difference(score1, score2) <= window
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
