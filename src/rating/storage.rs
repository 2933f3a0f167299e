//! Contestant storage interface and implementations
//!
//! This module defines the storage contract the rating core consumes, with an
//! in-memory implementation and a mock for exercising failure paths.

use crate::error::{RankingError, Result};
use crate::types::{BattleRecord, Category, CategoryRating, Contestant, ContestantId};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A single score write to one contestant-category pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWrite {
    pub new_score: f64,
    pub increment_games: bool,
    /// When set, the write only applies if the stored revision still matches
    pub expected_revision: Option<u64>,
}

impl ScoreWrite {
    /// Guarded write made after a battle
    pub fn battle(new_score: f64, expected_revision: u64) -> Self {
        Self {
            new_score,
            increment_games: true,
            expected_revision: Some(expected_revision),
        }
    }

    /// Unconditional score overwrite that leaves games played alone
    pub fn overwrite(new_score: f64) -> Self {
        Self {
            new_score,
            increment_games: false,
            expected_revision: None,
        }
    }
}

/// Trait for contestant persistence
///
/// Every write to a contestant-category pair is applied atomically; the
/// returned rating is the committed state.
pub trait ContestantStorage: Send + Sync {
    /// Get a contestant by id
    fn get_contestant(&self, id: ContestantId) -> Result<Contestant>;

    /// Get every contestant, ordered by id
    fn list_contestants(&self) -> Result<Vec<Contestant>>;

    /// Write a new score for one category of one contestant
    fn update_category_score(
        &self,
        id: ContestantId,
        category: Category,
        write: ScoreWrite,
    ) -> Result<CategoryRating>;

    /// Apply both sides of a battle in one category, all or nothing
    ///
    /// Every row is checked before any is written, so a missing contestant or
    /// a stale revision on either side leaves both rows untouched.
    fn commit_battle(
        &self,
        category: Category,
        writes: [(ContestantId, ScoreWrite); 2],
    ) -> Result<[CategoryRating; 2]>;

    /// Add `delta` to one category score without touching games played
    fn shift_category_score(
        &self,
        id: ContestantId,
        category: Category,
        delta: f64,
    ) -> Result<CategoryRating>;

    /// Get total number of contestants
    fn count(&self) -> Result<usize>;

    /// Create a contestant with every category at `initial_score`
    fn create_contestant(&self, name: &str, initial_score: f64) -> Result<Contestant>;

    fn rename_contestant(&self, id: ContestantId, name: &str) -> Result<Contestant>;

    /// Remove a contestant, returning whether it existed
    fn remove_contestant(&self, id: ContestantId) -> Result<bool>;

    /// Append a resolved battle to the audit history
    fn log_battle(&self, record: BattleRecord) -> Result<()>;

    /// Most recent battles, newest first
    fn recent_battles(&self, limit: usize) -> Result<Vec<BattleRecord>>;
}

/// Trim a contestant name, refusing empty results
pub fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RankingError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn check_revision(
    id: ContestantId,
    category: Category,
    rating: &CategoryRating,
    write: &ScoreWrite,
) -> Result<()> {
    match write.expected_revision {
        Some(expected) if rating.revision != expected => {
            Err(RankingError::ConcurrentUpdateConflict { id, category })
        }
        _ => Ok(()),
    }
}

fn apply_write(
    contestant: &mut Contestant,
    category: Category,
    write: ScoreWrite,
) -> CategoryRating {
    let rating = contestant.ratings.get_mut(category);
    rating.score = write.new_score;
    if write.increment_games {
        rating.games_played += 1;
    }
    rating.revision += 1;
    let committed = *rating;
    contestant.updated_at = Utc::now();
    committed
}

fn unavailable(what: &str) -> RankingError {
    RankingError::StorageUnavailable {
        message: format!("Failed to acquire {} lock", what),
    }
}

/// In-memory contestant storage implementation
#[derive(Debug)]
pub struct InMemoryContestantStorage {
    contestants: RwLock<BTreeMap<ContestantId, Contestant>>,
    history: RwLock<VecDeque<BattleRecord>>,
    next_id: AtomicU64,
    max_history: usize,
}

impl InMemoryContestantStorage {
    /// Create a new in-memory storage keeping up to `max_history` battle records
    pub fn new(max_history: usize) -> Self {
        Self {
            contestants: RwLock::new(BTreeMap::new()),
            history: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            max_history,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<ContestantId, Contestant>>> {
        self.contestants.read().map_err(|_| unavailable("contestants read"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<ContestantId, Contestant>>> {
        self.contestants
            .write()
            .map_err(|_| unavailable("contestants write"))
    }
}

impl Default for InMemoryContestantStorage {
    fn default() -> Self {
        Self::new(10_000) // Default to 10,000 history entries
    }
}

impl ContestantStorage for InMemoryContestantStorage {
    fn get_contestant(&self, id: ContestantId) -> Result<Contestant> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or(RankingError::ContestantNotFound { id })
    }

    fn list_contestants(&self) -> Result<Vec<Contestant>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn update_category_score(
        &self,
        id: ContestantId,
        category: Category,
        write: ScoreWrite,
    ) -> Result<CategoryRating> {
        let mut contestants = self.write()?;
        let contestant = contestants
            .get_mut(&id)
            .ok_or(RankingError::ContestantNotFound { id })?;

        check_revision(id, category, &contestant.rating(category), &write)?;
        Ok(apply_write(contestant, category, write))
    }

    fn commit_battle(
        &self,
        category: Category,
        writes: [(ContestantId, ScoreWrite); 2],
    ) -> Result<[CategoryRating; 2]> {
        let [(first_id, first_write), (second_id, second_write)] = writes;
        if first_id == second_id {
            return Err(RankingError::SelfMatch { id: first_id });
        }

        let mut contestants = self.write()?;
        for (id, write) in &writes {
            let rating = contestants
                .get(id)
                .ok_or(RankingError::ContestantNotFound { id: *id })?
                .rating(category);
            check_revision(*id, category, &rating, write)?;
        }

        let mut apply = |id: ContestantId, write: ScoreWrite| -> Result<CategoryRating> {
            let contestant = contestants
                .get_mut(&id)
                .ok_or(RankingError::ContestantNotFound { id })?;
            Ok(apply_write(contestant, category, write))
        };
        let first = apply(first_id, first_write)?;
        let second = apply(second_id, second_write)?;

        Ok([first, second])
    }

    fn shift_category_score(
        &self,
        id: ContestantId,
        category: Category,
        delta: f64,
    ) -> Result<CategoryRating> {
        let mut contestants = self.write()?;
        let contestant = contestants
            .get_mut(&id)
            .ok_or(RankingError::ContestantNotFound { id })?;

        let rating = contestant.ratings.get_mut(category);
        rating.score += delta;
        rating.revision += 1;
        let committed = *rating;
        contestant.updated_at = Utc::now();

        Ok(committed)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    fn create_contestant(&self, name: &str, initial_score: f64) -> Result<Contestant> {
        let name = normalize_name(name)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let contestant = Contestant::new(id, name, initial_score);

        self.write()?.insert(id, contestant.clone());
        Ok(contestant)
    }

    fn rename_contestant(&self, id: ContestantId, name: &str) -> Result<Contestant> {
        let name = normalize_name(name)?;
        let mut contestants = self.write()?;
        let contestant = contestants
            .get_mut(&id)
            .ok_or(RankingError::ContestantNotFound { id })?;

        contestant.name = name;
        contestant.updated_at = Utc::now();
        Ok(contestant.clone())
    }

    fn remove_contestant(&self, id: ContestantId) -> Result<bool> {
        Ok(self.write()?.remove(&id).is_some())
    }

    fn log_battle(&self, record: BattleRecord) -> Result<()> {
        if self.max_history == 0 {
            return Ok(());
        }

        let mut history = self.history.write().map_err(|_| unavailable("history write"))?;
        history.push_back(record);
        while history.len() > self.max_history {
            history.pop_front();
        }
        Ok(())
    }

    fn recent_battles(&self, limit: usize) -> Result<Vec<BattleRecord>> {
        let history = self.history.read().map_err(|_| unavailable("history read"))?;
        Ok(history.iter().rev().take(limit).cloned().collect())
    }
}

/// Mock contestant storage for testing
///
/// Delegates to an in-memory store while recording score writes, and can be
/// told to reject guarded writes with a conflict or to fail every call.
#[derive(Debug, Default)]
pub struct MockContestantStorage {
    inner: InMemoryContestantStorage,
    score_writes: Mutex<Vec<(ContestantId, Category, ScoreWrite)>>,
    pending_conflicts: AtomicU32,
    unavailable: AtomicBool,
    failing_ids: Mutex<HashSet<ContestantId>>,
}

impl MockContestantStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` guarded writes with a conflict
    pub fn inject_conflicts(&self, count: u32) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// Make every call fail with `StorageUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every score write touching `id` fail with `StorageUnavailable`
    pub fn fail_writes_for(&self, id: ContestantId) {
        if let Ok(mut failing) = self.failing_ids.lock() {
            failing.insert(id);
        }
    }

    /// Get all score writes made (for testing)
    pub fn get_score_writes(&self) -> Vec<(ContestantId, Category, ScoreWrite)> {
        self.score_writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    /// Clear recorded writes (for testing)
    pub fn clear_score_writes(&self) {
        if let Ok(mut writes) = self.score_writes.lock() {
            writes.clear();
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RankingError::StorageUnavailable {
                message: "Mock storage is offline".to_string(),
            });
        }
        Ok(())
    }

    fn check_writable(&self, id: ContestantId) -> Result<()> {
        let failing = self
            .failing_ids
            .lock()
            .map(|failing| failing.contains(&id))
            .unwrap_or(false);
        if failing {
            return Err(RankingError::StorageUnavailable {
                message: format!("Writes to contestant {} are failing", id),
            });
        }
        Ok(())
    }

    fn take_conflict(&self) -> bool {
        self.pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl ContestantStorage for MockContestantStorage {
    fn get_contestant(&self, id: ContestantId) -> Result<Contestant> {
        self.check_available()?;
        self.inner.get_contestant(id)
    }

    fn list_contestants(&self) -> Result<Vec<Contestant>> {
        self.check_available()?;
        self.inner.list_contestants()
    }

    fn update_category_score(
        &self,
        id: ContestantId,
        category: Category,
        write: ScoreWrite,
    ) -> Result<CategoryRating> {
        self.check_available()?;

        // Record the call for testing
        if let Ok(mut writes) = self.score_writes.lock() {
            writes.push((id, category, write));
        }

        self.check_writable(id)?;
        if write.expected_revision.is_some() && self.take_conflict() {
            return Err(RankingError::ConcurrentUpdateConflict { id, category });
        }

        self.inner.update_category_score(id, category, write)
    }

    fn commit_battle(
        &self,
        category: Category,
        writes: [(ContestantId, ScoreWrite); 2],
    ) -> Result<[CategoryRating; 2]> {
        self.check_available()?;

        if let Ok(mut recorded) = self.score_writes.lock() {
            recorded.extend(writes.iter().map(|(id, write)| (*id, category, *write)));
        }

        for (id, _) in &writes {
            self.check_writable(*id)?;
        }
        let guarded = writes.iter().any(|(_, w)| w.expected_revision.is_some());
        if guarded && self.take_conflict() {
            return Err(RankingError::ConcurrentUpdateConflict {
                id: writes[0].0,
                category,
            });
        }

        self.inner.commit_battle(category, writes)
    }

    fn shift_category_score(
        &self,
        id: ContestantId,
        category: Category,
        delta: f64,
    ) -> Result<CategoryRating> {
        self.check_available()?;
        self.inner.shift_category_score(id, category, delta)
    }

    fn count(&self) -> Result<usize> {
        self.check_available()?;
        self.inner.count()
    }

    fn create_contestant(&self, name: &str, initial_score: f64) -> Result<Contestant> {
        self.check_available()?;
        self.inner.create_contestant(name, initial_score)
    }

    fn rename_contestant(&self, id: ContestantId, name: &str) -> Result<Contestant> {
        self.check_available()?;
        self.inner.rename_contestant(id, name)
    }

    fn remove_contestant(&self, id: ContestantId) -> Result<bool> {
        self.check_available()?;
        self.inner.remove_contestant(id)
    }

    fn log_battle(&self, record: BattleRecord) -> Result<()> {
        self.check_available()?;
        self.inner.log_battle(record)
    }

    fn recent_battles(&self, limit: usize) -> Result<Vec<BattleRecord>> {
        self.check_available()?;
        self.inner.recent_battles(limit)
    }
}
