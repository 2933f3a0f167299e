//! Per-category mean anchoring
//!
//! A pass reads a snapshot of every contestant, computes each category's
//! deviation from the anchor, and shifts every score in that category by the
//! (optionally damped) deviation. Shifts are additive storage writes, so a
//! battle committed mid-pass is never overwritten; its effect is simply not
//! reflected in this pass's mean.

use crate::config::NormalizationConfig;
use crate::error::{RankingError, Result};
use crate::rating::storage::ContestantStorage;
use crate::types::Category;
use crate::utils::{current_timestamp, mean};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use tracing::{debug, info, warn};

/// Drift measured and corrected in one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryDrift {
    pub category: Category,
    pub mean_before: f64,
    /// `anchor - mean_before`
    pub deviation: f64,
    /// Shift applied to every score; 0 when the deviation was negligible
    pub applied_shift: f64,
    pub contestants_shifted: usize,
}

/// Outcome of one normalization pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub contestants: usize,
    pub categories: Vec<CategoryDrift>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl NormalizationReport {
    /// Whether any category was shifted
    pub fn changed(&self) -> bool {
        self.categories.iter().any(|d| d.applied_shift != 0.0)
    }

    pub fn drift(&self, category: Category) -> Option<&CategoryDrift> {
        self.categories.iter().find(|d| d.category == category)
    }
}

/// Measure one category's drift; `None` for an empty population
pub fn category_drift(
    category: Category,
    scores: &[f64],
    config: &NormalizationConfig,
) -> Option<CategoryDrift> {
    let mean_before = mean(scores)?;
    let deviation = config.anchor - mean_before;
    let applied_shift = if deviation.abs() <= config.min_deviation {
        0.0
    } else {
        config.damping * deviation
    };

    Some(CategoryDrift {
        category,
        mean_before,
        deviation,
        applied_shift,
        contestants_shifted: 0,
    })
}

/// Runs normalization passes, at most one at a time
pub struct Normalizer {
    storage: Arc<dyn ContestantStorage>,
    config: NormalizationConfig,
    pass_lock: Mutex<()>,
}

impl Normalizer {
    pub fn new(storage: Arc<dyn ContestantStorage>, config: NormalizationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            storage,
            config,
            pass_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    /// Run one pass, waiting for any pass already in flight
    pub fn run_pass(&self) -> Result<NormalizationReport> {
        let _guard = self
            .pass_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.pass()
    }

    /// Run one pass unless another is in flight
    pub fn try_run_pass(&self) -> Result<Option<NormalizationReport>> {
        let _guard = match self.pass_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                debug!("Normalization pass already in flight, skipping");
                return Ok(None);
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        self.pass().map(Some)
    }

    fn pass(&self) -> Result<NormalizationReport> {
        let started_at = current_timestamp();
        let snapshot = self.storage.list_contestants()?;

        let mut categories = Vec::with_capacity(Category::COUNT);
        for category in Category::ALL {
            let scores: Vec<f64> = snapshot.iter().map(|c| c.score(category)).collect();
            let Some(mut drift) = category_drift(category, &scores, &self.config) else {
                continue;
            };

            if drift.applied_shift != 0.0 {
                for contestant in &snapshot {
                    match self.storage.shift_category_score(
                        contestant.id,
                        category,
                        drift.applied_shift,
                    ) {
                        Ok(_) => drift.contestants_shifted += 1,
                        Err(RankingError::ContestantNotFound { id }) => {
                            warn!("Contestant {} removed during normalization, skipping", id);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }

            debug!(
                "Category {} mean {:.3}, deviation {:.3}, shift {:.3}",
                category, drift.mean_before, drift.deviation, drift.applied_shift
            );
            categories.push(drift);
        }

        let report = NormalizationReport {
            contestants: snapshot.len(),
            categories,
            started_at,
            finished_at: current_timestamp(),
        };

        if report.changed() {
            info!(
                "Normalization pass shifted {} categories across {} contestants",
                report
                    .categories
                    .iter()
                    .filter(|d| d.applied_shift != 0.0)
                    .count(),
                report.contestants
            );
        }

        Ok(report)
    }
}
