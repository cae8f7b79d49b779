//! Batch self-play with rayon parallelism.
//!
//! Runs N complete matches in parallel, one match per task. Matches share
//! nothing but the scoring oracle.

use std::sync::Arc;

use kyoku_engine::seeding::{seed_from_u64, SessionRng};
use kyoku_engine::{GameRule, ScoringOracle, StandardOracle, Termination};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::game_loop::{ActionSelector, FirstActionSelector, MatchRunner, RandomSelector};

/// Which reference selector drives every seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    #[default]
    First,
    /// Seeded per match from the match seed.
    Random,
}

/// Configuration for a batch simulation run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of matches to simulate.
    pub num_games: usize,
    /// Session seed; match seeds are derived from it in order.
    pub base_seed: u64,
    /// Threads in the rayon pool. None = rayon default (num CPUs).
    pub num_threads: Option<usize>,
    pub rule: GameRule,
    pub selector: SelectorKind,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            num_games: 100,
            base_seed: 0,
            num_threads: None,
            rule: GameRule::default(),
            selector: SelectorKind::First,
        }
    }
}

/// Result from a single completed match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub scores: [i32; 4],
    /// Rounds played, renchan repeats included.
    pub rounds_played: u32,
    /// Decisions taken across all rounds.
    pub total_actions: u32,
    pub seed: [u8; 32],
    pub termination: Termination,
}

/// Match seeds for a batch, identical no matter how the batch is scheduled.
fn match_seeds(config: &BatchConfig) -> Vec<[u8; 32]> {
    let mut session = SessionRng::new(seed_from_u64(config.base_seed));
    (0..config.num_games).map(|_| session.next_match_seed()).collect()
}

fn simulate_single_game(seed: [u8; 32], config: &BatchConfig, oracle: Arc<dyn ScoringOracle>) -> GameResult {
    let mut selector: Box<dyn ActionSelector> = match config.selector {
        SelectorKind::First => Box::new(FirstActionSelector),
        SelectorKind::Random => {
            let mut head = [0u8; 8];
            head.copy_from_slice(&seed[..8]);
            Box::new(RandomSelector::new(u64::from_le_bytes(head)))
        }
    };
    let fault = |message: String| GameResult {
        scores: [config.rule.starting_score; 4],
        rounds_played: 0,
        total_actions: 0,
        seed,
        termination: Termination::Fault { message },
    };

    let mut runner = match MatchRunner::new(seed, config.rule, oracle) {
        Ok(r) => r,
        Err(e) => return fault(e.to_string()),
    };
    let outcome = runner.run_to_completion(selector.as_mut());
    let termination = match (outcome, runner.termination()) {
        (_, Some(t)) => t.clone(),
        (Err(e), None) => Termination::Fault { message: e.to_string() },
        (Ok(()), None) => Termination::Fault {
            message: "runner stopped before the match ended".into(),
        },
    };
    GameResult {
        scores: runner.scores(),
        rounds_played: runner.rounds_played() as u32,
        total_actions: runner.total_actions(),
        seed,
        termination,
    }
}

/// Parallel batch simulator using a dedicated rayon ThreadPool.
pub struct BatchSimulator {
    pool: rayon::ThreadPool,
    oracle: Arc<dyn ScoringOracle>,
}

impl BatchSimulator {
    /// Create a new batch simulator with the given thread count.
    pub fn new(num_threads: Option<usize>) -> anyhow::Result<Self> {
        Self::with_oracle(num_threads, Arc::new(StandardOracle))
    }

    /// Pool sized from `config.num_threads`.
    pub fn for_config(config: &BatchConfig) -> anyhow::Result<Self> {
        Self::new(config.num_threads)
    }

    pub fn with_oracle(num_threads: Option<usize>, oracle: Arc<dyn ScoringOracle>) -> anyhow::Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = num_threads {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))?;
        Ok(Self { pool, oracle })
    }

    /// Run a batch of matches in parallel. Results come back in seed order.
    pub fn run_batch(&self, config: &BatchConfig) -> Vec<GameResult> {
        let seeds = match_seeds(config);
        self.pool.install(|| {
            seeds
                .into_par_iter()
                .map(|seed| simulate_single_game(seed, config, Arc::clone(&self.oracle)))
                .collect()
        })
    }
}

/// Convenience: run a batch without constructing a BatchSimulator.
/// Uses rayon's global thread pool and the standard oracle.
pub fn run_batch_simple(config: &BatchConfig) -> Vec<GameResult> {
    let oracle: Arc<dyn ScoringOracle> = Arc::new(StandardOracle);
    match_seeds(config)
        .into_par_iter()
        .map(|seed| simulate_single_game(seed, config, Arc::clone(&oracle)))
        .collect()
}
