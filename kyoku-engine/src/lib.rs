//! Deterministic four-player Riichi Mahjong match engine.
//!
//! A [`Match`] sequences rounds; each [`RoundState`] is driven one decision
//! at a time through `draw` and `apply`, records every tile movement as an
//! [`Event`], and can be replayed from that log alone.

pub mod action;
pub mod calls;
pub mod errors;
pub mod event;
pub mod game;
pub mod ledger;
pub mod observation;
pub mod replay;
pub mod round;
pub mod rule;
pub mod score;
pub mod scoring;
pub mod seeding;
pub mod tile;
pub mod types;

pub use action::{Action, ActionType};
pub use errors::{EngineError, EngineResult};
pub use event::{Event, EventRecorder, RecordedEvent};
pub use game::{GameState, Match, RoundLog, RoundSummary, Termination};
pub use observation::Observation;
pub use round::wall::{Wall, WallExhausted};
pub use round::{RoundEnd, RoundPhase, RoundSetup, RoundState, StepOutcome};
pub use rule::{GameLength, GameRule, RonPolicy};
pub use scoring::{HandValue, OracleError, ScoringAdapter, ScoringOracle, StandardOracle, WinContext, WinRequest};
pub use tile::{Tile, TileType};
pub use types::{Meld, MeldKind, Seat, Wind};
