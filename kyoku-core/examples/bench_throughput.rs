use std::time::Instant;

use kyoku_core::export::write_match_jsonl_gz;
use kyoku_core::{BatchConfig, BatchSimulator, MatchRunner, RandomSelector, SelectorKind};
use kyoku_engine::seeding::seed_from_u64;
use kyoku_engine::{GameRule, StandardOracle, Termination};

/// Self-play throughput over hanchan matches with random selectors.
///
/// `cargo run --release --example bench_throughput [out.jsonl.gz]` also
/// writes the logs of one sample match.
fn main() -> anyhow::Result<()> {
    let num_cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);

    // --- Single thread ---
    let single = BatchSimulator::new(Some(1))?;
    let config = BatchConfig {
        num_games: 100,
        base_seed: 1,
        rule: GameRule::default(),
        selector: SelectorKind::Random,
        ..Default::default()
    };
    let start = Instant::now();
    let results = single.run_batch(&config);
    let elapsed = start.elapsed();
    report("SINGLE THREAD", &results, elapsed, 1);

    // --- All cores ---
    let all = BatchSimulator::new(None)?;
    let config = BatchConfig {
        num_games: 1000,
        ..config
    };
    let start = Instant::now();
    let results = all.run_batch(&config);
    let elapsed = start.elapsed();
    report("ALL CORES", &results, elapsed, num_cpus);

    if let Some(path) = std::env::args().nth(1) {
        let mut runner = MatchRunner::new(seed_from_u64(0), GameRule::default(), std::sync::Arc::new(StandardOracle))?;
        runner.run_to_completion(&mut RandomSelector::new(0))?;
        write_match_jsonl_gz(runner.logs(), &path)?;
        println!("Wrote {} rounds to {path}", runner.logs().len());
    }
    Ok(())
}

fn report(label: &str, results: &[kyoku_core::GameResult], elapsed: std::time::Duration, threads: usize) {
    let total_actions: u64 = results.iter().map(|r| r.total_actions as u64).sum();
    let rounds: u64 = results.iter().map(|r| r.rounds_played as u64).sum();
    let faults = results
        .iter()
        .filter(|r| matches!(r.termination, Termination::Fault { .. }))
        .count();
    let gps = results.len() as f64 / elapsed.as_secs_f64();

    println!("=== {label} ({threads} threads, {} matches) ===", results.len());
    println!("Time:             {:.2?}", elapsed);
    println!("Avg rounds/match: {:.1}", rounds as f64 / results.len() as f64);
    println!("Avg actions:      {:.0}", total_actions as f64 / results.len() as f64);
    println!("Faults:           {faults}");
    println!("Matches/sec:      {:.1}", gps);
    println!("Per-thread/hour:  {:.0}", gps * 3600.0 / threads as f64);
    println!();
}
