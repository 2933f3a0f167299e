//! Main application state and service coordination
//!
//! This module contains the AppState that wires storage, the rating engine,
//! the matchmaker, the normalizer and metrics together, and owns the
//! background normalization task.

use crate::config::{validate_config, AppConfig};
use crate::error::Result as RankingResult;
use crate::matchmaking::{MatchRequest, Matchmaker, Matchup, RandomSource, RngSource};
use crate::metrics::MetricsCollector;
use crate::normalization::{BattleCountTrigger, NormalizationReport, Normalizer};
use crate::ranking::{
    score_histogram, HistogramBucket, Leaderboard, MatchupPreview, SortKey, DEFAULT_BUCKET_WIDTH,
};
use crate::rating::{ContestantStorage, InMemoryContestantStorage, RatingEngine};
use crate::types::{BattleOutcome, BattleRecord, Category, Contestant, ContestantId};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Contestant persistence shared by every component
    storage: Arc<dyn ContestantStorage>,

    /// Battle resolution
    engine: Arc<RatingEngine>,

    /// Opponent selection
    matchmaker: Matchmaker,

    /// Mean anchoring
    normalizer: Arc<Normalizer>,

    /// Prometheus metrics
    metrics: Arc<MetricsCollector>,

    /// Battle-count normalization trigger
    trigger: Arc<BattleCountTrigger>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with in-memory storage
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        let storage = Arc::new(InMemoryContestantStorage::new(config.service.max_history));
        Self::with_storage(config, storage)
    }

    /// Initialize the application over an existing storage backend
    pub fn with_storage(
        config: AppConfig,
        storage: Arc<dyn ContestantStorage>,
    ) -> Result<Self, ServiceError> {
        info!("Initializing {} service", config.service.name);

        validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let engine = RatingEngine::new(storage.clone(), config.rating.clone()).map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to initialize rating engine: {}", e),
            }
        })?;

        let matchmaker = Matchmaker::new(config.matchmaking.clone()).map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to initialize matchmaker: {}", e),
            }
        })?;

        let normalizer = Normalizer::new(storage.clone(), config.normalization.clone()).map_err(
            |e| ServiceError::Initialization {
                message: format!("Failed to initialize normalizer: {}", e),
            },
        )?;

        let metrics = MetricsCollector::new().map_err(|e| ServiceError::Initialization {
            message: format!("Failed to create metrics collector: {}", e),
        })?;

        let trigger = BattleCountTrigger::new(config.normalization.every_n_battles);

        debug!(
            "Rating: K {}/{} switching at {} games; rival window {} with probability {}",
            config.rating.k_high,
            config.rating.k_low,
            config.rating.k_threshold_games,
            config.matchmaking.rival_score_window,
            config.matchmaking.rival_match_probability
        );

        Ok(Self {
            config,
            storage,
            engine: Arc::new(engine),
            matchmaker,
            normalizer: Arc::new(normalizer),
            metrics: Arc::new(metrics),
            trigger: Arc::new(trigger),
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage(&self) -> Arc<dyn ContestantStorage> {
        self.storage.clone()
    }

    pub fn engine(&self) -> Arc<RatingEngine> {
        self.engine.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Register a contestant at the configured initial score
    pub fn add_contestant(&self, name: &str) -> RankingResult<Contestant> {
        let contestant = self
            .storage
            .create_contestant(name, self.config.rating.initial_score)?;
        debug!("Added contestant {} '{}'", contestant.id, contestant.name);
        Ok(contestant)
    }

    pub fn contestant(&self, id: ContestantId) -> RankingResult<Contestant> {
        self.storage.get_contestant(id)
    }

    /// Select the next matchup using thread-local randomness
    pub fn next_matchup(&self, request: &MatchRequest) -> RankingResult<Matchup> {
        self.next_matchup_with(request, &mut RngSource::thread())
    }

    /// Select the next matchup with a caller-supplied random source
    pub fn next_matchup_with<R: RandomSource + ?Sized>(
        &self,
        request: &MatchRequest,
        rng: &mut R,
    ) -> RankingResult<Matchup> {
        let matchup = self
            .matchmaker
            .select_from_storage(self.storage.as_ref(), request, rng)?;
        self.metrics.record_matchup(matchup.kind);
        debug!(
            "Matchup {} vs {} in {} ({})",
            matchup.first.id, matchup.second.id, matchup.category, matchup.kind
        );
        Ok(matchup)
    }

    /// Win probabilities and current ranks for a matchup
    pub fn preview(&self, matchup: &Matchup) -> RankingResult<MatchupPreview> {
        let population = self.storage.list_contestants()?;
        Ok(MatchupPreview::build(matchup, &population))
    }

    /// Resolve a decisive vote
    pub async fn record_vote(&self, outcome: &BattleOutcome) -> RankingResult<BattleRecord> {
        let timer = self.metrics.start_timer();
        let result = self.engine.resolve(outcome);
        self.finish_battle(result, timer.stop())
    }

    /// Resolve a drawn vote
    pub async fn record_draw(
        &self,
        category: Category,
        first: ContestantId,
        second: ContestantId,
    ) -> RankingResult<BattleRecord> {
        let timer = self.metrics.start_timer();
        let result = self.engine.resolve_draw(category, first, second);
        self.finish_battle(result, timer.stop())
    }

    fn finish_battle(
        &self,
        result: RankingResult<BattleRecord>,
        elapsed: std::time::Duration,
    ) -> RankingResult<BattleRecord> {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                self.metrics.record_battle_failure(&e);
                return Err(e);
            }
        };

        if let Err(e) = self.storage.log_battle(record.clone()) {
            warn!("Failed to log battle {}: {}", record.id, e);
        }
        self.metrics.record_battle(&record, elapsed);

        if self.trigger.record_battle() {
            debug!(
                "Battle-count trigger fired after {} battles",
                self.trigger.battles_seen()
            );
            self.spawn_normalization();
        }

        Ok(record)
    }

    /// Run a normalization pass on the blocking pool unless one is in flight
    fn spawn_normalization(&self) -> JoinHandle<()> {
        let normalizer = self.normalizer.clone();
        let metrics = self.metrics.clone();

        tokio::task::spawn_blocking(move || match normalizer.try_run_pass() {
            Ok(Some(report)) => metrics.record_normalization(&report),
            Ok(None) => debug!("Normalization already in flight"),
            Err(e) => warn!("Triggered normalization failed: {}", e),
        })
    }

    /// Run a normalization pass now, waiting for any pass in flight
    pub fn normalize_now(&self) -> RankingResult<NormalizationReport> {
        let report = self.normalizer.run_pass()?;
        self.metrics.record_normalization(&report);
        Ok(report)
    }

    pub fn leaderboard(&self, sort_key: SortKey) -> RankingResult<Leaderboard> {
        let contestants = self.storage.list_contestants()?;
        Ok(Leaderboard::build(&contestants, sort_key))
    }

    /// Score distribution of one category
    pub fn histogram(&self, category: Category) -> RankingResult<Vec<HistogramBucket>> {
        let scores: Vec<f64> = self
            .storage
            .list_contestants()?
            .iter()
            .map(|c| c.score(category))
            .collect();
        Ok(score_histogram(&scores, DEFAULT_BUCKET_WIDTH))
    }

    pub fn recent_battles(&self, limit: usize) -> RankingResult<Vec<BattleRecord>> {
        self.storage.recent_battles(limit)
    }

    /// Start the background normalization task
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting {} service", self.config.service.name);

        *self.is_running.write().await = true;

        match self.config.normalization.interval() {
            Some(period) => {
                info!(
                    "Starting normalization task ({}s interval)",
                    period.as_secs()
                );
                let normalizer = self.normalizer.clone();
                let metrics = self.metrics.clone();
                let is_running = self.is_running.clone();

                let task = tokio::spawn(async move {
                    let mut interval = tokio::time::interval(period);
                    // The first tick completes immediately
                    interval.tick().await;

                    loop {
                        interval.tick().await;
                        if !*is_running.read().await {
                            break;
                        }

                        let normalizer = normalizer.clone();
                        match tokio::task::spawn_blocking(move || normalizer.try_run_pass()).await
                        {
                            Ok(Ok(Some(report))) => metrics.record_normalization(&report),
                            Ok(Ok(None)) => debug!("Normalization already in flight"),
                            Ok(Err(e)) => warn!("Scheduled normalization failed: {}", e),
                            Err(e) => error!("Normalization task panicked: {}", e),
                        }
                    }

                    info!("Normalization task stopped");
                });
                self.background_tasks.push(task);
            }
            None => info!("Interval normalization disabled"),
        }

        info!("{} service started", self.config.service.name);
        Ok(())
    }

    /// Stop background tasks, waiting up to the configured shutdown timeout
    pub async fn stop(&mut self) -> Result<(), ServiceError> {
        info!("Stopping {} service", self.config.service.name);

        *self.is_running.write().await = false;

        let task_count = self.background_tasks.len();
        let deadline = self.config.shutdown_timeout();
        for task in self.background_tasks.drain(..) {
            task.abort();
            match tokio::time::timeout(deadline, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => {
                    return Err(ServiceError::BackgroundTask {
                        message: e.to_string(),
                    })
                }
                Err(_) => {
                    return Err(ServiceError::BackgroundTask {
                        message: format!("Task did not stop within {:?}", deadline),
                    })
                }
            }
        }

        info!("Stopped {} background tasks", task_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RankingError;
    use crate::matchmaking::{MatchKind, ScriptedSource};
    use crate::rating::MockContestantStorage;
    use std::time::Duration;

    fn state_with(names: &[&str], config: AppConfig) -> (AppState, Vec<ContestantId>) {
        let state = AppState::new(config).unwrap();
        let ids = names
            .iter()
            .map(|name| state.add_contestant(name).unwrap().id)
            .collect();
        (state, ids)
    }

    fn state(names: &[&str]) -> (AppState, Vec<ContestantId>) {
        state_with(names, AppConfig::default())
    }

    #[tokio::test]
    async fn test_vote_updates_scores_history_and_metrics() {
        let (state, ids) = state(&["Akira", "Bebop"]);

        let outcome = BattleOutcome::parse("story", ids[1], ids[0]).unwrap();
        let record = state.record_vote(&outcome).await.unwrap();

        assert_eq!(record.first.new_score, 1230.0);
        assert_eq!(record.second.new_score, 1170.0);
        assert_eq!(state.contestant(ids[1]).unwrap().score(Category::Story), 1230.0);

        let history = state.recent_battles(10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, record.id);

        assert_eq!(
            state
                .metrics()
                .rating()
                .battles_resolved_total
                .with_label_values(&["story", "win"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_rejected_vote_is_counted() {
        let (state, ids) = state(&["Akira", "Bebop"]);

        let outcome = BattleOutcome {
            category: Category::Fun,
            winner: ids[0],
            loser: 999,
        };
        let err = state.record_vote(&outcome).await.unwrap_err();
        assert_eq!(err, RankingError::ContestantNotFound { id: 999 });
        assert!(state.recent_battles(10).unwrap().is_empty());
        assert_eq!(
            state
                .metrics()
                .rating()
                .battles_failed_total
                .with_label_values(&["not_found"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_draw_between_equals_is_neutral() {
        let (state, ids) = state(&["Akira", "Bebop"]);
        let record = state
            .record_draw(Category::Voice, ids[0], ids[1])
            .await
            .unwrap();
        assert_eq!(record.first.new_score, 1200.0);
        assert_eq!(
            state.contestant(ids[0]).unwrap().rating(Category::Voice).games_played,
            1
        );
    }

    #[test]
    fn test_scripted_matchup_and_preview() {
        let (state, ids) = state(&["Akira", "Bebop", "Clannad"]);

        // category, first contestant, roll, opponent
        let mut rng = ScriptedSource::new([0.1], [2, 0, 1]);
        let matchup = state
            .next_matchup_with(&MatchRequest::default(), &mut rng)
            .unwrap();
        assert_eq!(matchup.category, Category::Ost);
        assert_eq!(matchup.first.id, ids[0]);
        assert_eq!(matchup.kind, MatchKind::Rival);
        assert_ne!(matchup.first.id, matchup.second.id);

        let preview = state.preview(&matchup).unwrap();
        assert_eq!(preview.first.win_probability, 0.5);
        assert_eq!(preview.first.rank.total, 3);
        assert_eq!(
            state
                .metrics()
                .matchmaking()
                .matchups_total
                .with_label_values(&["rival"])
                .get(),
            1
        );
    }

    #[test]
    fn test_matchup_needs_two_contestants() {
        let (state, _) = state(&["Akira"]);
        assert_eq!(
            state.next_matchup(&MatchRequest::default()).unwrap_err(),
            RankingError::InsufficientContestants { available: 1 }
        );
    }

    #[tokio::test]
    async fn test_normalize_now_and_leaderboard() {
        let (state, ids) = state(&["Akira", "Bebop"]);
        for _ in 0..3 {
            let outcome = BattleOutcome {
                category: Category::Visual,
                winner: ids[0],
                loser: ids[1],
            };
            state.record_vote(&outcome).await.unwrap();
        }

        let report = state.normalize_now().unwrap();
        // Elo updates are zero-sum, so the mean stays anchored
        assert!(!report.changed());

        let board = state.leaderboard(SortKey::Category(Category::Visual)).unwrap();
        assert_eq!(board.standings[0].id, ids[0]);
        assert_eq!(board.standings[0].total_games, 3);

        let buckets = state.histogram(Category::Visual).unwrap();
        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[tokio::test]
    async fn test_conflicted_vote_is_counted_and_not_applied() {
        let storage = Arc::new(MockContestantStorage::new());
        let state = AppState::with_storage(AppConfig::default(), storage.clone()).unwrap();
        let a = state.add_contestant("Akira").unwrap().id;
        let b = state.add_contestant("Bebop").unwrap().id;

        storage.inject_conflicts(2);
        let err = state
            .record_vote(&BattleOutcome {
                category: Category::Visual,
                winner: a,
                loser: b,
            })
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let metrics = state.metrics();
        assert_eq!(metrics.rating().rating_conflicts_retried_total.get(), 1);
        assert_eq!(
            metrics
                .rating()
                .battles_failed_total
                .with_label_values(&["conflict"])
                .get(),
            1
        );
        let akira = state.contestant(a).unwrap();
        assert_eq!(akira.score(Category::Visual), 1200.0);
        assert_eq!(akira.rating(Category::Visual).games_played, 0);
        assert!(state.recent_battles(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_battle_count_trigger_runs_pass() {
        let mut config = AppConfig::default();
        config.normalization.every_n_battles = 2;
        let (state, ids) = state_with(&["Akira", "Bebop"], config);

        for _ in 0..2 {
            let outcome = BattleOutcome {
                category: Category::Story,
                winner: ids[0],
                loser: ids[1],
            };
            state.record_vote(&outcome).await.unwrap();
        }

        let metrics = state.metrics();
        let passes = &metrics.normalization().normalization_passes_total;
        for _ in 0..100 {
            if passes.get() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(passes.get(), 1);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let mut config = AppConfig::default();
        config.normalization.interval_seconds = 1;
        let mut state = AppState::new(config).unwrap();

        assert!(!state.is_running().await);
        state.start().await.unwrap();
        assert!(state.is_running().await);
        state.stop().await.unwrap();
        assert!(!state.is_running().await);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.matchmaking.rival_match_probability = 1.5;
        assert!(matches!(
            AppState::new(config),
            Err(ServiceError::Configuration { .. })
        ));
    }
}
