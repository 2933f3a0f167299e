//! Metrics for the versus-rank service
//!
//! Prometheus counters and gauges for battles, matchmaking and normalization.

pub mod collector;

pub use collector::{
    MatchmakingMetrics, MetricsCollector, MetricsTimer, NormalizationMetrics, RatingMetrics,
};
