//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the versus-rank service using
//! a private Prometheus registry.

use crate::error::RankingError;
use crate::matchmaking::MatchKind;
use crate::normalization::NormalizationReport;
use crate::types::BattleRecord;
use anyhow::Result;
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the ranking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Battle resolution metrics
    rating_metrics: RatingMetrics,

    /// Opponent selection metrics
    matchmaking_metrics: MatchmakingMetrics,

    /// Mean anchoring metrics
    normalization_metrics: NormalizationMetrics,
}

/// Battle resolution metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Battles resolved by category and outcome
    pub battles_resolved_total: IntCounterVec,

    /// Battles rejected, by error kind
    pub battles_failed_total: IntCounterVec,

    /// Score writes that needed a conflict retry
    pub rating_conflicts_retried_total: IntCounter,

    /// Time to resolve one battle
    pub battle_resolution_duration: Histogram,
}

/// Opponent selection metrics
#[derive(Clone)]
pub struct MatchmakingMetrics {
    /// Matchups produced by selection kind
    pub matchups_total: IntCounterVec,
}

/// Mean anchoring metrics
#[derive(Clone)]
pub struct NormalizationMetrics {
    /// Completed normalization passes
    pub normalization_passes_total: IntCounter,

    /// Shift applied by the latest pass, per category
    pub normalization_shift: GaugeVec,

    /// Category mean measured by the latest pass
    pub category_mean: GaugeVec,

    /// Contestants seen by the latest pass
    pub contestants: IntGauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let rating_metrics = RatingMetrics::new(&registry)?;
        let matchmaking_metrics = MatchmakingMetrics::new(&registry)?;
        let normalization_metrics = NormalizationMetrics::new(&registry)?;

        Ok(Self {
            registry,
            rating_metrics,
            matchmaking_metrics,
            normalization_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    pub fn matchmaking(&self) -> &MatchmakingMetrics {
        &self.matchmaking_metrics
    }

    pub fn normalization(&self) -> &NormalizationMetrics {
        &self.normalization_metrics
    }

    /// Record a resolved battle
    pub fn record_battle(&self, record: &BattleRecord, duration: Duration) {
        self.rating_metrics
            .battles_resolved_total
            .with_label_values(&[record.category.key(), &record.outcome.to_string()])
            .inc();

        if record.retries > 0 {
            self.rating_metrics
                .rating_conflicts_retried_total
                .inc_by(u64::from(record.retries));
        }

        self.rating_metrics
            .battle_resolution_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a battle that could not be resolved
    ///
    /// A surfaced conflict always follows one retried commit, which is counted
    /// alongside the retries of resolved battles.
    pub fn record_battle_failure(&self, error: &RankingError) {
        if error.is_conflict() {
            self.rating_metrics.rating_conflicts_retried_total.inc();
        }

        let kind = match error {
            RankingError::InvalidCategory { .. } => "invalid_category",
            RankingError::SelfMatch { .. } => "self_match",
            RankingError::ContestantNotFound { .. } => "not_found",
            RankingError::ConcurrentUpdateConflict { .. } => "conflict",
            RankingError::StorageUnavailable { .. } => "storage",
            _ => "other",
        };

        self.rating_metrics
            .battles_failed_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record a matchup being produced
    pub fn record_matchup(&self, kind: MatchKind) {
        self.matchmaking_metrics
            .matchups_total
            .with_label_values(&[&kind.to_string()])
            .inc();
    }

    /// Record a completed normalization pass
    pub fn record_normalization(&self, report: &NormalizationReport) {
        self.normalization_metrics.normalization_passes_total.inc();
        self.normalization_metrics
            .contestants
            .set(report.contestants as i64);

        for drift in &report.categories {
            let label = [drift.category.key()];
            self.normalization_metrics
                .normalization_shift
                .with_label_values(&label)
                .set(drift.applied_shift);
            self.normalization_metrics
                .category_mean
                .with_label_values(&label)
                .set(drift.mean_before);
        }
    }

    /// Render every registered metric in the text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let battles_resolved_total = IntCounterVec::new(
            Opts::new(
                "versus_rank_battles_resolved_total",
                "Total battles resolved",
            ),
            &["category", "outcome"],
        )?;
        registry.register(Box::new(battles_resolved_total.clone()))?;

        let battles_failed_total = IntCounterVec::new(
            Opts::new("versus_rank_battles_failed_total", "Total battles rejected"),
            &["kind"],
        )?;
        registry.register(Box::new(battles_failed_total.clone()))?;

        let rating_conflicts_retried_total = IntCounter::new(
            "versus_rank_rating_conflicts_retried_total",
            "Score writes retried after a concurrent update conflict",
        )?;
        registry.register(Box::new(rating_conflicts_retried_total.clone()))?;

        let battle_resolution_duration = Histogram::with_opts(
            HistogramOpts::new(
                "versus_rank_battle_resolution_duration_seconds",
                "Time to resolve a battle",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(battle_resolution_duration.clone()))?;

        Ok(Self {
            battles_resolved_total,
            battles_failed_total,
            rating_conflicts_retried_total,
            battle_resolution_duration,
        })
    }
}

impl MatchmakingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matchups_total = IntCounterVec::new(
            Opts::new("versus_rank_matchups_total", "Total matchups produced"),
            &["kind"],
        )?;
        registry.register(Box::new(matchups_total.clone()))?;

        Ok(Self { matchups_total })
    }
}

impl NormalizationMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let normalization_passes_total = IntCounter::new(
            "versus_rank_normalization_passes_total",
            "Completed normalization passes",
        )?;
        registry.register(Box::new(normalization_passes_total.clone()))?;

        let normalization_shift = GaugeVec::new(
            Opts::new(
                "versus_rank_normalization_shift",
                "Shift applied by the latest normalization pass",
            ),
            &["category"],
        )?;
        registry.register(Box::new(normalization_shift.clone()))?;

        let category_mean = GaugeVec::new(
            Opts::new(
                "versus_rank_category_mean",
                "Category mean measured by the latest normalization pass",
            ),
            &["category"],
        )?;
        registry.register(Box::new(category_mean.clone()))?;

        let contestants = IntGauge::new(
            "versus_rank_contestants",
            "Contestants seen by the latest normalization pass",
        )?;
        registry.register(Box::new(contestants.clone()))?;

        Ok(Self {
            normalization_passes_total,
            normalization_shift,
            category_mean,
            contestants,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalization::CategoryDrift;
    use crate::types::{Category, Outcome, ScoreChange};
    use chrono::Utc;
    use uuid::Uuid;

    fn record(retries: u32) -> BattleRecord {
        let side = |id| ScoreChange {
            contestant_id: id,
            old_score: 1200.0,
            new_score: 1230.0,
            expected: 0.5,
            k_factor: 60.0,
            games_played: 1,
        };
        BattleRecord {
            id: Uuid::new_v4(),
            category: Category::Story,
            outcome: Outcome::Win,
            first: side(1),
            second: side(2),
            retries,
            resolved_at: Utc::now(),
        }
    }

    #[test]
    fn test_battle_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_battle(&record(0), Duration::from_micros(50));
        collector.record_battle(&record(2), Duration::from_micros(80));

        assert_eq!(
            collector
                .rating()
                .battles_resolved_total
                .with_label_values(&["story", "win"])
                .get(),
            2
        );
        assert_eq!(collector.rating().rating_conflicts_retried_total.get(), 2);
    }

    #[test]
    fn test_failure_kinds() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        collector.record_battle_failure(&RankingError::SelfMatch { id: 1 });
        collector.record_battle_failure(&RankingError::ContestantNotFound { id: 1 });
        collector.record_battle_failure(&RankingError::ContestantNotFound { id: 2 });

        let failed = &collector.rating().battles_failed_total;
        assert_eq!(failed.with_label_values(&["self_match"]).get(), 1);
        assert_eq!(failed.with_label_values(&["not_found"]).get(), 2);
        assert_eq!(collector.rating().rating_conflicts_retried_total.get(), 0);
    }

    #[test]
    fn test_failed_conflict_counts_its_retry() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        collector.record_battle(&record(1), Duration::from_micros(60));
        collector.record_battle_failure(&RankingError::ConcurrentUpdateConflict {
            id: 1,
            category: Category::Fun,
        });

        let rating = collector.rating();
        assert_eq!(rating.rating_conflicts_retried_total.get(), 2);
        assert_eq!(
            rating.battles_failed_total.with_label_values(&["conflict"]).get(),
            1
        );
    }

    #[test]
    fn test_normalization_recording_and_render() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        collector.record_matchup(MatchKind::Rival);

        let report = NormalizationReport {
            contestants: 3,
            categories: vec![CategoryDrift {
                category: Category::Ost,
                mean_before: 1266.0,
                deviation: -66.0,
                applied_shift: -66.0,
                contestants_shifted: 3,
            }],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        collector.record_normalization(&report);

        assert_eq!(
            collector
                .normalization()
                .normalization_shift
                .with_label_values(&["ost"])
                .get(),
            -66.0
        );

        let text = collector.render().unwrap();
        assert!(text.contains("versus_rank_normalization_passes_total 1"));
        assert!(text.contains("versus_rank_matchups_total{kind=\"rival\"} 1"));
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.stop() >= Duration::from_millis(10));
    }
}
