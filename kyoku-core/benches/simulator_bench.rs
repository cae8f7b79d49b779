use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use kyoku_core::{run_batch_simple, BatchConfig, FirstActionSelector, MatchRunner};
use kyoku_engine::replay::replay_round;
use kyoku_engine::round::wall::Wall;
use kyoku_engine::scoring::ScoringAdapter;
use kyoku_engine::seeding::seed_from_u64;
use kyoku_engine::tile::parse_tiles;
use kyoku_engine::{GameLength, GameRule, StandardOracle};

fn east() -> GameRule {
    GameRule {
        length: GameLength::East,
        ..GameRule::default()
    }
}

fn bench_single_match(c: &mut Criterion) {
    c.bench_function("east_match_first_action", |b| {
        b.iter(|| {
            let mut runner = MatchRunner::new(seed_from_u64(42), east(), Arc::new(StandardOracle)).unwrap();
            runner.run_to_completion(&mut FirstActionSelector).unwrap();
            runner.scores()
        });
    });
}

fn bench_batch_100(c: &mut Criterion) {
    let config = BatchConfig {
        num_games: 100,
        base_seed: 7,
        rule: east(),
        ..Default::default()
    };
    c.bench_function("batch_100_east_matches", |b| {
        b.iter(|| run_batch_simple(&config));
    });
}

fn bench_wall_build(c: &mut Criterion) {
    c.bench_function("wall_build_1000x", |b| {
        b.iter(|| {
            for i in 0..1000u64 {
                std::hint::black_box(Wall::build(seed_from_u64(i)));
            }
        });
    });
}

fn bench_waits(c: &mut Criterion) {
    let adapter = ScoringAdapter::default();
    let hand = parse_tiles("1112345678999m").unwrap();
    c.bench_function("waits_chuuren_1000x", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                std::hint::black_box(adapter.waits(&hand));
            }
        });
    });
}

fn bench_replay(c: &mut Criterion) {
    let mut runner = MatchRunner::new(seed_from_u64(3), east(), Arc::new(StandardOracle)).unwrap();
    runner.run_to_completion(&mut FirstActionSelector).unwrap();
    let logs = runner.take_logs();
    c.bench_function("replay_east_match", |b| {
        b.iter(|| {
            for log in &logs {
                replay_round(&log.events).unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_single_match, bench_batch_100, bench_wall_build, bench_waits, bench_replay);
criterion_main!(benches);
