//! Battle-count trigger for normalization passes

use std::sync::atomic::{AtomicU64, Ordering};

/// Fires once every `every` recorded battles; never fires when `every` is 0
#[derive(Debug, Default)]
pub struct BattleCountTrigger {
    every: u64,
    seen: AtomicU64,
}

impl BattleCountTrigger {
    pub fn new(every: u64) -> Self {
        Self {
            every,
            seen: AtomicU64::new(0),
        }
    }

    /// Count one battle, returning whether a pass is due
    pub fn record_battle(&self) -> bool {
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        self.every > 0 && seen % self.every == 0
    }

    pub fn battles_seen(&self) -> u64 {
        self.seen.load(Ordering::SeqCst)
    }
}
