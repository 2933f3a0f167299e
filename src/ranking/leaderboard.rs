//! Leaderboards, rank lookups and score histograms

use crate::error::{RankingError, Result};
use crate::types::{Category, Contestant, ContestantId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Histogram bucket width used by the ranking views
pub const DEFAULT_BUCKET_WIDTH: f64 = 50.0;

/// What a leaderboard is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    /// Mean of the six category scores
    Overall,
    Category(Category),
}

impl SortKey {
    pub fn score_of(&self, contestant: &Contestant) -> f64 {
        match self {
            SortKey::Overall => contestant.overall_score(),
            SortKey::Category(category) => contestant.score(*category),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Overall => write!(f, "total"),
            SortKey::Category(category) => write!(f, "{}", category),
        }
    }
}

impl FromStr for SortKey {
    type Err = RankingError;

    fn from_str(key: &str) -> Result<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "total" | "overall" => Ok(SortKey::Overall),
            other => other.parse().map(SortKey::Category),
        }
    }
}

/// One row of a leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based position
    pub position: usize,
    pub id: ContestantId,
    pub name: String,
    /// Score under the leaderboard's sort key
    pub score: f64,
    pub overall_score: f64,
    pub total_games: u64,
}

/// Contestants ordered by descending score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    pub sort_key: SortKey,
    pub standings: Vec<Standing>,
}

impl Leaderboard {
    /// Rank `contestants` by `sort_key`; ties are broken by name, then id
    pub fn build(contestants: &[Contestant], sort_key: SortKey) -> Self {
        let mut sorted: Vec<&Contestant> = contestants.iter().collect();
        sorted.sort_by(|a, b| {
            sort_key
                .score_of(b)
                .total_cmp(&sort_key.score_of(a))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });

        let standings = sorted
            .into_iter()
            .enumerate()
            .map(|(i, c)| Standing {
                position: i + 1,
                id: c.id,
                name: c.name.clone(),
                score: sort_key.score_of(c),
                overall_score: c.overall_score(),
                total_games: c.total_games(),
            })
            .collect();

        Self {
            sort_key,
            standings,
        }
    }

    pub fn top(&self, n: usize) -> &[Standing] {
        &self.standings[..n.min(self.standings.len())]
    }

    pub fn position_of(&self, id: ContestantId) -> Option<usize> {
        self.standings
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.position)
    }

    pub fn scores(&self) -> Vec<f64> {
        self.standings.iter().map(|s| s.score).collect()
    }
}

/// Where a score places within a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankInfo {
    /// 1 + number of contestants with a strictly higher score
    pub rank: usize,
    pub total: usize,
}

pub fn rank_of(contestants: &[Contestant], category: Category, score: f64) -> RankInfo {
    let higher = contestants
        .iter()
        .filter(|c| c.score(category).partial_cmp(&score) == Some(Ordering::Greater))
        .count();
    RankInfo {
        rank: higher + 1,
        total: contestants.len(),
    }
}

/// Half-open score bucket `[lower, upper)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Upper bound on the buckets one histogram may hold
pub const MAX_HISTOGRAM_BUCKETS: usize = 1_000;

/// Contiguous buckets from the one holding the minimum to the one past the maximum
///
/// Each score is bucketed once. When the score span would need more than
/// [`MAX_HISTOGRAM_BUCKETS`] buckets, the width grows by a whole multiple of
/// `bucket_width` until it fits. Non-finite scores are ignored.
pub fn score_histogram(scores: &[f64], bucket_width: f64) -> Vec<HistogramBucket> {
    if !(bucket_width > 0.0) {
        return Vec::new();
    }

    let finite: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
    if finite.is_empty() {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let limit = MAX_HISTOGRAM_BUCKETS as f64;
    let buckets_for = |width: f64| (max / width).floor() - (min / width).floor() + 1.0;
    let mut width = bucket_width;
    if buckets_for(width) > limit {
        let mut multiple = (buckets_for(bucket_width) / limit).ceil();
        while buckets_for(bucket_width * multiple) > limit {
            multiple += 1.0;
        }
        width = bucket_width * multiple;
    }

    let first = (min / width).floor();
    let len = ((max / width).floor() - first) as usize + 1;
    let mut counts = vec![0usize; len];
    for score in finite {
        let index = ((score / width).floor() - first) as usize;
        counts[index.min(len - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let lower = (first + i as f64) * width;
            HistogramBucket {
                lower,
                upper: lower + width,
                count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contestant(id: ContestantId, name: &str, story: f64, fun: f64) -> Contestant {
        let mut c = Contestant::new(id, name, 1200.0);
        c.ratings.get_mut(Category::Story).score = story;
        c.ratings.get_mut(Category::Fun).score = fun;
        c
    }

    fn sample() -> Vec<Contestant> {
        vec![
            contestant(1, "Bebop", 1300.0, 1100.0),
            contestant(2, "Akira", 1250.0, 1500.0),
            contestant(3, "Clannad", 1300.0, 1200.0),
        ]
    }

    #[test]
    fn test_category_leaderboard_orders_descending_with_name_ties() {
        let board = Leaderboard::build(&sample(), SortKey::Category(Category::Story));
        let ids: Vec<_> = board.standings.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(board.standings[0].position, 1);
        assert_eq!(board.position_of(2), Some(3));
        assert_eq!(board.top(2).len(), 2);
        assert_eq!(board.top(10).len(), 3);
    }

    #[test]
    fn test_overall_leaderboard_uses_mean() {
        let board = Leaderboard::build(&sample(), SortKey::Overall);
        assert_eq!(board.standings[0].id, 2);
        let expected = (1250.0 + 1500.0 + 4.0 * 1200.0) / 6.0;
        assert!((board.standings[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("total".parse::<SortKey>().unwrap(), SortKey::Overall);
        assert_eq!(
            "ost".parse::<SortKey>().unwrap(),
            SortKey::Category(Category::Ost)
        );
        assert!(matches!(
            "bogus".parse::<SortKey>(),
            Err(RankingError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn test_rank_of_counts_strictly_higher() {
        let contestants = sample();
        assert_eq!(
            rank_of(&contestants, Category::Story, 1300.0),
            RankInfo { rank: 1, total: 3 }
        );
        assert_eq!(rank_of(&contestants, Category::Story, 1250.0).rank, 3);
        assert_eq!(rank_of(&contestants, Category::Story, 2000.0).rank, 1);
        assert_eq!(rank_of(&[], Category::Story, 1200.0), RankInfo { rank: 1, total: 0 });
    }

    #[test]
    fn test_histogram_buckets() {
        let buckets = score_histogram(&[1010.0, 1049.9, 1050.0, 1180.0], 50.0);
        let lowers: Vec<_> = buckets.iter().map(|b| b.lower).collect();
        assert_eq!(lowers, vec![1000.0, 1050.0, 1100.0, 1150.0]);
        let counts: Vec<_> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1, 0, 1]);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), 4);
    }

    #[test]
    fn test_histogram_edge_cases() {
        assert!(score_histogram(&[], 50.0).is_empty());
        assert!(score_histogram(&[1200.0], 0.0).is_empty());

        let single = score_histogram(&[1200.0], DEFAULT_BUCKET_WIDTH);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].lower, 1200.0);
        assert_eq!(single[0].count, 1);
    }

    #[test]
    fn test_histogram_outlier_is_bounded() {
        let scores = [1180.0, 1210.0, 1240.0, 1e9];
        let buckets = score_histogram(&scores, DEFAULT_BUCKET_WIDTH);

        assert!(buckets.len() <= MAX_HISTOGRAM_BUCKETS);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), scores.len());
        assert!(buckets[0].lower <= 1180.0);
        assert!(buckets[buckets.len() - 1].upper > 1e9);

        // Widened buckets are still whole multiples of the requested width
        let width = buckets[0].upper - buckets[0].lower;
        assert_eq!((width / DEFAULT_BUCKET_WIDTH).fract(), 0.0);
        assert!(buckets.windows(2).all(|w| w[0].upper == w[1].lower));
    }

    #[test]
    fn test_histogram_ignores_non_finite_scores() {
        let buckets = score_histogram(&[1200.0, f64::NAN, f64::INFINITY], 50.0);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 1);
        assert!(score_histogram(&[f64::NAN], 50.0).is_empty());
    }
}
