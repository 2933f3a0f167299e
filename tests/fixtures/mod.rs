//! Test fixtures and storage wrappers for integration testing

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use versus_rank::error::Result;
use versus_rank::matchmaking::ScriptedSource;
use versus_rank::rating::{ContestantStorage, InMemoryContestantStorage, ScoreWrite};
use versus_rank::types::{BattleRecord, Category, CategoryRating, Contestant, ContestantId};

/// Draws for an explicit category, first pick, rival roll and opponent pick
pub fn rival_draws(category: Category, first: usize, opponent: usize) -> ScriptedSource {
    ScriptedSource::new([0.0], [category.index(), first, opponent])
}

/// Draws that take the random-opponent branch
pub fn random_draws(category: Category, first: usize, opponent: usize) -> ScriptedSource {
    ScriptedSource::new([0.99], [category.index(), first, opponent])
}

/// Storage with one contestant per score, every category at 1200 except `category`
pub fn storage_with_scores(
    category: Category,
    scores: &[f64],
) -> (Arc<InMemoryContestantStorage>, Vec<ContestantId>) {
    let storage = Arc::new(InMemoryContestantStorage::default());
    let ids = scores
        .iter()
        .enumerate()
        .map(|(i, score)| {
            let id = storage
                .create_contestant(&format!("Contestant {}", i + 1), 1200.0)
                .unwrap()
                .id;
            storage
                .update_category_score(id, category, ScoreWrite::overwrite(*score))
                .unwrap();
            id
        })
        .collect();
    (storage, ids)
}

pub fn score_of(storage: &dyn ContestantStorage, id: ContestantId, category: Category) -> f64 {
    storage.get_contestant(id).unwrap().score(category)
}

pub fn games_of(storage: &dyn ContestantStorage, id: ContestantId, category: Category) -> u64 {
    storage
        .get_contestant(id)
        .unwrap()
        .rating(category)
        .games_played
}

type Interleaved = Box<dyn FnOnce(&InMemoryContestantStorage) + Send>;

/// Storage that runs a concurrent commit right before the first guarded write
/// or score shift
///
/// The hook runs against the inner store after the caller has read its rows
/// and before its own write lands.
pub struct InterleavingStorage {
    inner: Arc<InMemoryContestantStorage>,
    hook: Mutex<Option<Interleaved>>,
}

impl InterleavingStorage {
    pub fn new(inner: Arc<InMemoryContestantStorage>) -> Self {
        Self {
            inner,
            hook: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> Arc<InMemoryContestantStorage> {
        self.inner.clone()
    }

    pub fn interleave(&self, hook: impl FnOnce(&InMemoryContestantStorage) + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn hook_pending(&self) -> bool {
        self.hook.lock().unwrap().is_some()
    }

    fn run_hook(&self) {
        let hook = self.hook.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(&self.inner);
        }
    }
}

impl ContestantStorage for InterleavingStorage {
    fn get_contestant(&self, id: ContestantId) -> Result<Contestant> {
        self.inner.get_contestant(id)
    }

    fn list_contestants(&self) -> Result<Vec<Contestant>> {
        self.inner.list_contestants()
    }

    fn update_category_score(
        &self,
        id: ContestantId,
        category: Category,
        write: ScoreWrite,
    ) -> Result<CategoryRating> {
        if write.expected_revision.is_some() {
            self.run_hook();
        }
        self.inner.update_category_score(id, category, write)
    }

    fn commit_battle(
        &self,
        category: Category,
        writes: [(ContestantId, ScoreWrite); 2],
    ) -> Result<[CategoryRating; 2]> {
        if writes.iter().any(|(_, w)| w.expected_revision.is_some()) {
            self.run_hook();
        }
        self.inner.commit_battle(category, writes)
    }

    fn shift_category_score(
        &self,
        id: ContestantId,
        category: Category,
        delta: f64,
    ) -> Result<CategoryRating> {
        self.run_hook();
        self.inner.shift_category_score(id, category, delta)
    }

    fn count(&self) -> Result<usize> {
        self.inner.count()
    }

    fn create_contestant(&self, name: &str, initial_score: f64) -> Result<Contestant> {
        self.inner.create_contestant(name, initial_score)
    }

    fn rename_contestant(&self, id: ContestantId, name: &str) -> Result<Contestant> {
        self.inner.rename_contestant(id, name)
    }

    fn remove_contestant(&self, id: ContestantId) -> Result<bool> {
        self.inner.remove_contestant(id)
    }

    fn log_battle(&self, record: BattleRecord) -> Result<()> {
        self.inner.log_battle(record)
    }

    fn recent_battles(&self, limit: usize) -> Result<Vec<BattleRecord>> {
        self.inner.recent_battles(limit)
    }
}
