//! Mean anchoring against long-run score drift
//!
//! The normalizer exposes a single pass over the whole population; the
//! triggers that decide when to run it live alongside but are independent.

pub mod normalizer;
pub mod trigger;

pub use normalizer::{category_drift, CategoryDrift, NormalizationReport, Normalizer};
pub use trigger::BattleCountTrigger;
