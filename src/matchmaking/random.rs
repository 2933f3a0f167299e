//! Injectable randomness for matchmaking

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Source of the random draws the matchmaker makes
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `0..len`; `len` is never zero
    fn next_index(&mut self, len: usize) -> usize;
}

/// Adapter over any `rand` generator
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    /// Deterministic generator for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RngSource<ThreadRng> {
    pub fn thread() -> Self {
        Self(rand::thread_rng())
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }

    fn next_index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

/// Replays fixed draws; once exhausted, units are 0.0 and indices are 0
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    units: VecDeque<f64>,
    indices: VecDeque<usize>,
}

impl ScriptedSource {
    pub fn new(units: impl IntoIterator<Item = f64>, indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            units: units.into_iter().collect(),
            indices: indices.into_iter().collect(),
        }
    }
}

impl RandomSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(0.0)
    }

    fn next_index(&mut self, len: usize) -> usize {
        self.indices.pop_front().unwrap_or(0) % len
    }
}
