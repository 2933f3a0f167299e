//! Performance benchmarks for battle resolution, matchmaking and normalization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use versus_rank::config::{MatchmakingConfig, NormalizationConfig, RatingConfig};
use versus_rank::matchmaking::{MatchRequest, Matchmaker, RngSource};
use versus_rank::normalization::Normalizer;
use versus_rank::rating::{
    ContestantStorage, EloCalculator, InMemoryContestantStorage, RatingEngine, ScoreWrite,
};
use versus_rank::types::{BattleOutcome, Category, ContestantId};

fn create_bench_storage(size: usize) -> (Arc<InMemoryContestantStorage>, Vec<ContestantId>) {
    let storage = Arc::new(InMemoryContestantStorage::new(1_000));
    let ids = (0..size)
        .map(|i| {
            let id = storage
                .create_contestant(&format!("Contestant {}", i), 1200.0)
                .unwrap()
                .id;
            for category in Category::ALL {
                let score = 900.0 + ((i * 37 + category.index() * 11) % 600) as f64;
                storage
                    .update_category_score(id, category, ScoreWrite::overwrite(score))
                    .unwrap();
            }
            id
        })
        .collect();
    (storage, ids)
}

fn bench_elo_calculations(c: &mut Criterion) {
    let calculator = EloCalculator::new(RatingConfig::default()).unwrap();

    c.bench_function("elo_decisive_update", |b| {
        b.iter(|| {
            black_box(calculator.decisive(
                black_box(1350.0),
                black_box(4),
                black_box(1210.0),
                black_box(27),
            ))
        })
    });
}

fn bench_battle_resolution(c: &mut Criterion) {
    let (storage, ids) = create_bench_storage(100);
    let engine = RatingEngine::new(storage, RatingConfig::default()).unwrap();
    let mut round = 0usize;

    c.bench_function("resolve_battle", |b| {
        b.iter(|| {
            round += 1;
            let winner = ids[round % ids.len()];
            let loser = ids[(round * 7 + 1) % ids.len()];
            if winner != loser {
                let outcome = BattleOutcome {
                    category: Category::ALL[round % Category::COUNT],
                    winner,
                    loser,
                };
                black_box(engine.resolve(&outcome).unwrap());
            }
        })
    });
}

fn bench_matchmaking(c: &mut Criterion) {
    let matchmaker = Matchmaker::new(MatchmakingConfig::default()).unwrap();
    let mut group = c.benchmark_group("select_matchup");

    for size in [10, 100, 1_000] {
        let (storage, _) = create_bench_storage(size);
        let pool = storage.list_contestants().unwrap();
        let mut rng = RngSource::seeded(7);

        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| {
                black_box(
                    matchmaker
                        .select(pool, &MatchRequest::default(), &mut rng)
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

fn bench_normalization(c: &mut Criterion) {
    let (storage, _) = create_bench_storage(1_000);
    let normalizer = Normalizer::new(
        storage,
        NormalizationConfig {
            damping: 0.5,
            ..Default::default()
        },
    )
    .unwrap();

    c.bench_function("normalization_pass_1000", |b| {
        b.iter(|| black_box(normalizer.run_pass().unwrap()))
    });
}

criterion_group!(
    benches,
    bench_elo_calculations,
    bench_battle_resolution,
    bench_matchmaking,
    bench_normalization
);
criterion_main!(benches);
