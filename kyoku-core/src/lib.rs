//! Kyoku match driver
//!
//! Runs `kyoku-engine` matches end to end: the decision-collaborator trait
//! and reference selectors, a rayon batch simulator for self-play, and
//! round-log export.

pub mod export;
pub mod game_loop;
pub mod simulator;

pub use game_loop::{ActionSelector, FirstActionSelector, MatchRunner, RandomSelector};
pub use simulator::{run_batch_simple, BatchConfig, BatchSimulator, GameResult, SelectorKind};
