//! Match orchestration: round sequencing, dealer rotation and termination.

use std::sync::Arc;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::event::RecordedEvent;
use crate::round::wall::Wall;
use crate::round::{RoundEnd, RoundSetup, RoundState};
use crate::rule::GameRule;
use crate::scoring::{ScoringAdapter, ScoringOracle};
use crate::seeding::derive_round_seed;
use crate::types::{next_seat, Seat, Wind, NUM_PLAYERS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Termination {
    /// The configured number of rounds was played.
    Completed,
    /// A score went below zero.
    Bust { seat: Seat },
    /// Cancelled from outside.
    Aborted { reason: String },
    /// Stopped on an invariant violation.
    Fault { message: String },
}

/// One finished round as the match saw it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Rounds started before this one, renchan included.
    pub index: u64,
    pub round_wind: Wind,
    pub kyoku: u8,
    pub honba: u8,
    pub dealer: Seat,
    pub outcome: RoundEnd,
    pub deltas: [i32; NUM_PLAYERS],
    pub scores: [i32; NUM_PLAYERS],
    pub wall_digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundLog {
    pub summary: RoundSummary,
    /// Wall seed; absent when the wall was supplied directly.
    pub seed: Option<[u8; 32]>,
    pub events: Vec<RecordedEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub scores: [i32; NUM_PLAYERS],
    pub dealer: Seat,
    pub round_wind: Wind,
    /// 0-3 within the round wind.
    pub kyoku: u8,
    pub honba: u8,
    pub riichi_pool: u32,
    pub round_index: u64,
    pub history: Vec<RoundSummary>,
    pub termination: Option<Termination>,
}

impl GameState {
    fn new(rule: &GameRule) -> Self {
        Self {
            scores: [rule.starting_score; NUM_PLAYERS],
            dealer: 0,
            round_wind: Wind::East,
            kyoku: 0,
            honba: 0,
            riichi_pool: 0,
            round_index: 0,
            history: Vec::new(),
            termination: None,
        }
    }

    /// Kyoku counted from East 1, ignoring honba.
    pub fn rounds_elapsed(&self) -> u8 {
        self.round_wind as u8 * NUM_PLAYERS as u8 + self.kyoku
    }
}

/// A four-player match. Owns its rule, its oracle handle and at most one
/// live round.
#[derive(Debug)]
pub struct Match {
    seed: [u8; 32],
    rule: GameRule,
    adapter: ScoringAdapter,
    state: GameState,
    round: Option<RoundState>,
    round_seed: Option<[u8; 32]>,
}

impl Match {
    pub fn new(seed: [u8; 32], rule: GameRule, oracle: Arc<dyn ScoringOracle>) -> EngineResult<Self> {
        rule.validate()?;
        Ok(Self {
            seed,
            state: GameState::new(&rule),
            rule,
            adapter: ScoringAdapter::new(oracle),
            round: None,
            round_seed: None,
        })
    }

    pub fn seed(&self) -> [u8; 32] {
        self.seed
    }

    pub fn rule(&self) -> &GameRule {
        &self.rule
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.termination.is_some()
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.state.termination.as_ref()
    }

    pub fn round(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    pub fn round_mut(&mut self) -> Option<&mut RoundState> {
        self.round.as_mut()
    }

    /// Seats ordered by score, highest first; ties go to the lower seat.
    pub fn standings(&self) -> [(Seat, i32); NUM_PLAYERS] {
        let mut order: [(Seat, i32); NUM_PLAYERS] = std::array::from_fn(|s| (s as Seat, self.state.scores[s]));
        order.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        order
    }

    /// Starts the next round on a wall derived from the match seed.
    pub fn start_round(&mut self) -> EngineResult<&mut RoundState> {
        let seed = derive_round_seed(&self.seed, self.state.round_index, self.state.kyoku, self.state.honba);
        self.open_round(Wall::build(seed), Some(seed))
    }

    /// Starts the next round on a caller-supplied wall.
    pub fn start_round_with_wall(&mut self, wall: Wall) -> EngineResult<&mut RoundState> {
        self.open_round(wall, None)
    }

    fn open_round(&mut self, wall: Wall, seed: Option<[u8; 32]>) -> EngineResult<&mut RoundState> {
        if self.is_finished() {
            return Err(EngineError::InvalidPhase {
                expected: "a running match",
                found: "finished".into(),
            });
        }
        if self.round.is_some() {
            return Err(EngineError::InvalidPhase {
                expected: "no round in progress",
                found: "round in progress".into(),
            });
        }
        let setup = RoundSetup {
            round_wind: self.state.round_wind,
            kyoku: self.state.kyoku,
            honba: self.state.honba,
            riichi_pool: self.state.riichi_pool,
            dealer: self.state.dealer,
            scores: self.state.scores,
        };
        let round = RoundState::new(setup, wall, self.rule, self.adapter.clone())?;
        self.round_seed = seed;
        Ok(self.round.insert(round))
    }

    /// Takes the finished round, applies its result and moves the match on.
    pub fn finish_round(&mut self) -> EngineResult<RoundLog> {
        match &self.round {
            Some(round) if round.is_ended() => {}
            Some(round) => {
                return Err(EngineError::InvalidPhase {
                    expected: "round_ended",
                    found: round.phase().name().to_string(),
                })
            }
            None => {
                return Err(EngineError::InvalidPhase {
                    expected: "round_ended",
                    found: "no round".into(),
                })
            }
        }
        self.close_round()
    }

    /// Cancels the match. A live round is aborted with its deposits returned,
    /// so scores stay where the round started; its log is handed back.
    pub fn abort(&mut self, reason: impl Into<String>) -> Option<RoundLog> {
        let reason = reason.into();
        let log = match self.round.as_mut() {
            Some(round) => {
                round.abort(reason.clone());
                self.close_round().ok()
            }
            None => None,
        };
        if self.state.termination.is_none() {
            error!("match aborted: {reason}");
            self.state.termination = Some(Termination::Aborted { reason });
        }
        log
    }

    fn close_round(&mut self) -> EngineResult<RoundLog> {
        let Some(mut round) = self.round.take() else {
            return Err(EngineError::invariant("no round to close"));
        };
        let (Some(outcome), Some(settlement)) = (round.outcome().cloned(), round.settlement().cloned()) else {
            return Err(EngineError::invariant("round ended without a settlement"));
        };
        let setup = round.setup().clone();
        let summary = RoundSummary {
            index: self.state.round_index,
            round_wind: setup.round_wind,
            kyoku: setup.kyoku,
            honba: setup.honba,
            dealer: setup.dealer,
            outcome: outcome.clone(),
            deltas: settlement.deltas,
            scores: round.scores(),
            wall_digest: round.wall().digest().to_string(),
        };
        let log = RoundLog {
            summary: summary.clone(),
            seed: self.round_seed.take(),
            events: round.take_log(),
        };

        self.state.scores = round.scores();
        self.state.riichi_pool = round.riichi_pool();
        self.state.round_index += 1;
        self.state.history.push(summary);

        if let Some(message) = round.fault() {
            error!("match stopped on fault: {message}");
            self.state.termination = Some(Termination::Fault {
                message: message.to_string(),
            });
            return Ok(log);
        }
        if let RoundEnd::Aborted { reason } = outcome {
            self.state.termination = Some(Termination::Aborted { reason });
            return Ok(log);
        }

        self.advance(settlement.renchan, settlement.honba_after);
        self.check_termination();
        Ok(log)
    }

    fn advance(&mut self, renchan: bool, honba_after: u8) {
        self.state.honba = honba_after;
        if renchan {
            return;
        }
        self.state.dealer = next_seat(self.state.dealer);
        self.state.kyoku += 1;
        if self.state.kyoku == NUM_PLAYERS as u8 {
            self.state.kyoku = 0;
            self.state.round_wind = Wind::from(self.state.round_wind as u8 + 1);
        }
    }

    fn check_termination(&mut self) {
        let bust = self
            .state
            .scores
            .iter()
            .position(|&s| s < 0)
            .filter(|_| self.rule.bust_ends_game);
        let termination = if let Some(seat) = bust {
            Termination::Bust { seat: seat as Seat }
        } else if self.state.rounds_elapsed() >= self.rule.length.rounds() {
            Termination::Completed
        } else {
            debug!(
                "next round {:?}-{} honba {} dealer {}",
                self.state.round_wind,
                self.state.kyoku + 1,
                self.state.honba,
                self.state.dealer
            );
            return;
        };

        if self.rule.leftover_sticks_to_top && self.state.riichi_pool > 0 {
            let (top, _) = self.standings()[0];
            self.state.scores[top as usize] += self.state.riichi_pool as i32 * self.rule.riichi_deposit;
            self.state.riichi_pool = 0;
        }
        info!("match over: {termination:?} scores {:?}", self.state.scores);
        self.state.termination = Some(termination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::rule::GameLength;
    use crate::scoring::StandardOracle;

    fn new_match(rule: GameRule) -> Match {
        Match::new([7u8; 32], rule, Arc::new(StandardOracle)).unwrap()
    }

    /// Passes every call and discards the first legal tile.
    fn play_round(round: &mut RoundState) {
        while !round.is_ended() {
            if round.pending_seats().is_empty() {
                round.draw().unwrap();
                continue;
            }
            let seat = round.pending_seats()[0];
            let legal = round.legal_actions(seat);
            let action = legal
                .iter()
                .find(|a| matches!(a, Action::Pass | Action::Discard { .. }))
                .cloned()
                .unwrap();
            round.apply(seat, action).unwrap();
        }
    }

    fn total_points(m: &Match) -> i32 {
        m.state().scores.iter().sum::<i32>() + m.state().riichi_pool as i32 * m.rule().riichi_deposit
    }

    #[test]
    fn invalid_rule_is_refused() {
        let rule = GameRule {
            starting_score: 0,
            ..GameRule::default()
        };
        assert!(matches!(
            Match::new([0; 32], rule, Arc::new(StandardOracle)),
            Err(EngineError::Config { .. })
        ));
    }

    #[test]
    fn single_round_match_completes() {
        let mut m = new_match(GameRule {
            length: GameLength::Single,
            ..GameRule::default()
        });
        play_round(m.start_round().unwrap());
        let log = m.finish_round().unwrap();
        assert!(m.is_finished());
        assert_eq!(log.summary.index, 0);
        assert!(log.seed.is_some());
        assert_eq!(log.events.first().map(|e| e.event.kind()), Some("start_round"));
        assert_eq!(log.events.last().map(|e| e.event.kind()), Some("round_end"));
        assert_eq!(total_points(&m), 4 * m.rule().starting_score);
    }

    #[test]
    fn second_round_refused_while_one_is_live() {
        let mut m = new_match(GameRule::default());
        m.start_round().unwrap();
        assert!(matches!(m.start_round(), Err(EngineError::InvalidPhase { .. })));
        assert!(matches!(m.finish_round(), Err(EngineError::InvalidPhase { .. })));
    }

    #[test]
    fn east_match_plays_to_completion_conserving_points() {
        let mut m = new_match(GameRule {
            length: GameLength::East,
            ..GameRule::default()
        });
        let mut rounds = 0;
        while !m.is_finished() {
            play_round(m.start_round().unwrap());
            m.finish_round().unwrap();
            rounds += 1;
            assert!(rounds < 200, "match does not terminate");
        }
        assert_eq!(m.state().history.len(), rounds);
        assert_eq!(total_points(&m), 4 * m.rule().starting_score);
        assert!(matches!(
            m.termination(),
            Some(Termination::Completed | Termination::Bust { .. })
        ));
    }

    #[test]
    fn same_seed_same_match() {
        let run = || {
            let mut m = new_match(GameRule {
                length: GameLength::East,
                ..GameRule::default()
            });
            let mut logs = Vec::new();
            while !m.is_finished() {
                play_round(m.start_round().unwrap());
                logs.push(m.finish_round().unwrap());
            }
            serde_json::to_string(&logs).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn dealer_rotates_and_wind_advances() {
        let mut m = new_match(GameRule::default());
        m.advance(false, 0);
        assert_eq!((m.state.dealer, m.state.kyoku), (1, 1));
        m.advance(true, 1);
        assert_eq!((m.state.dealer, m.state.kyoku, m.state.honba), (1, 1, 1));
        m.advance(false, 2);
        m.advance(false, 0);
        m.advance(false, 0);
        assert_eq!(m.state.round_wind, Wind::South);
        assert_eq!((m.state.dealer, m.state.kyoku), (0, 0));
    }

    #[test]
    fn bust_ends_match_and_leftover_goes_to_top() {
        let mut m = new_match(GameRule::default());
        m.state.scores = [52_000, -1_000, 25_000, 22_000];
        m.state.riichi_pool = 2;
        m.check_termination();
        assert_eq!(m.termination(), Some(&Termination::Bust { seat: 1 }));
        assert_eq!(m.state.scores[0], 54_000);
        assert_eq!(m.state.riichi_pool, 0);
    }

    #[test]
    fn standings_break_ties_by_seat() {
        let mut m = new_match(GameRule::default());
        m.state.scores = [20_000, 30_000, 30_000, 20_000];
        let order: Vec<Seat> = m.standings().iter().map(|(s, _)| *s).collect();
        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    #[test]
    fn invariant_violation_ends_the_match_in_fault() {
        let mut m = new_match(GameRule::default());
        let round = m.start_round().unwrap();
        round.misdeal_tile(1, 2);
        let err = round.draw().unwrap_err();
        assert!(err.is_fatal());

        let log = m.finish_round().unwrap();
        assert!(matches!(log.summary.outcome, RoundEnd::Aborted { .. }));
        assert_eq!(log.events.last().map(|e| e.event.kind()), Some("round_end"));
        assert!(matches!(m.termination(), Some(Termination::Fault { message }) if message.contains("seat 1")));
        assert_eq!(m.state().scores, [25_000; 4]);
        assert!(m.start_round().is_err());
    }

    #[test]
    fn abort_keeps_round_start_scores() {
        let mut m = new_match(GameRule::default());
        m.start_round().unwrap();
        let log = m.abort("shutdown").unwrap();
        assert!(matches!(log.summary.outcome, RoundEnd::Aborted { .. }));
        assert_eq!(m.state().scores, [25_000; 4]);
        assert_eq!(
            m.termination(),
            Some(&Termination::Aborted {
                reason: "shutdown".into()
            })
        );
        assert!(m.start_round().is_err());
    }
}
