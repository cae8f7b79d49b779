//! Match runner: performs draws, asks selectors for decisions and collects
//! the per-round logs.

use std::sync::Arc;

use kyoku_engine::seeding::SessionRng;
use kyoku_engine::{
    Action, EngineError, EngineResult, GameRule, Match, Observation, RoundLog, ScoringOracle, Seat,
    StepOutcome, Termination,
};
use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Decision collaborator for one or more seats.
/// Implemented by random agents, scripted players, inference clients.
pub trait ActionSelector {
    /// Pick one of `legal` for `seat`. Returning anything else counts as an
    /// illegal attempt and the runner asks again.
    fn select_action(&mut self, seat: Seat, obs: &Observation, legal: &[Action]) -> Action;
}

/// Always picks the first legal action.
pub struct FirstActionSelector;

impl ActionSelector for FirstActionSelector {
    fn select_action(&mut self, _seat: Seat, _obs: &Observation, legal: &[Action]) -> Action {
        legal[0]
    }
}

/// Uniform choice over the legal actions from a seeded ChaCha8 stream.
pub struct RandomSelector {
    rng: ChaCha8Rng,
}

impl RandomSelector {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl ActionSelector for RandomSelector {
    fn select_action(&mut self, _seat: Seat, _obs: &Observation, legal: &[Action]) -> Action {
        legal[self.rng.random_range(0..legal.len())]
    }
}

/// Hard cap on decisions per match.
pub const MAX_STEPS: u32 = 50_000;
/// Illegal answers tolerated per decision before the match is aborted.
pub const MAX_ILLEGAL_RETRIES: u32 = 3;

/// Runs one match to completion.
pub struct MatchRunner {
    game: Match,
    logs: Vec<RoundLog>,
    total_actions: u32,
    /// Win claims the scoring oracle refused.
    rejected_claims: u32,
    max_steps: u32,
}

impl MatchRunner {
    pub fn new(seed: [u8; 32], rule: GameRule, oracle: Arc<dyn ScoringOracle>) -> EngineResult<Self> {
        Ok(Self::from_match(Match::new(seed, rule, oracle)?))
    }

    /// Takes the next match seed from a session stream.
    pub fn with_session(
        session: &mut SessionRng,
        rule: GameRule,
        oracle: Arc<dyn ScoringOracle>,
    ) -> EngineResult<Self> {
        Self::new(session.next_match_seed(), rule, oracle)
    }

    pub fn from_match(game: Match) -> Self {
        Self {
            game,
            logs: Vec::new(),
            total_actions: 0,
            rejected_claims: 0,
            max_steps: MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn game(&self) -> &Match {
        &self.game
    }

    pub fn is_done(&self) -> bool {
        self.game.is_finished()
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.game.termination()
    }

    pub fn total_actions(&self) -> u32 {
        self.total_actions
    }

    pub fn rejected_claims(&self) -> u32 {
        self.rejected_claims
    }

    pub fn rounds_played(&self) -> usize {
        self.game.state().history.len()
    }

    pub fn scores(&self) -> [i32; 4] {
        self.game.state().scores
    }

    pub fn logs(&self) -> &[RoundLog] {
        &self.logs
    }

    pub fn take_logs(&mut self) -> Vec<RoundLog> {
        std::mem::take(&mut self.logs)
    }

    /// Advances by one draw, one decision or one round transition.
    /// Returns `Ok(false)` once the match is over.
    ///
    /// An invariant violation finishes the match with `Termination::Fault`
    /// and is returned after the faulty round's log has been kept.
    pub fn step_once(&mut self, selector: &mut dyn ActionSelector) -> EngineResult<bool> {
        if self.game.is_finished() {
            return Ok(false);
        }
        if self.total_actions >= self.max_steps {
            self.abort(format!("step budget of {} exhausted", self.max_steps));
            return Ok(false);
        }

        let Some(round) = self.game.round_mut() else {
            self.game.start_round()?;
            return Ok(true);
        };
        if round.is_ended() {
            let log = self.game.finish_round()?;
            debug!(
                "round {} done: {:?}",
                log.summary.index,
                log.summary.deltas
            );
            self.logs.push(log);
            return Ok(!self.game.is_finished());
        }

        let Some(&seat) = round.pending_seats().first() else {
            let drawn = round.draw();
            return self.settle_step(drawn.map(|_| ()));
        };
        let obs = round.observe(seat);
        let legal = round.legal_actions(seat);
        if legal.is_empty() {
            return self.settle_step(Err(EngineError::invariant(format!(
                "seat {seat} is pending with no legal action"
            ))));
        }

        let mut attempts = 0;
        loop {
            let action = selector.select_action(seat, &obs, &legal);
            let Some(round) = self.game.round_mut() else {
                return Err(EngineError::invariant("round vanished mid-decision"));
            };
            match round.apply(seat, action) {
                Ok(StepOutcome::ClaimRejected(reason)) => {
                    debug!("{reason}");
                    self.rejected_claims += 1;
                    break;
                }
                Ok(_) => break,
                Err(EngineError::IllegalAction { .. }) if attempts < MAX_ILLEGAL_RETRIES => {
                    attempts += 1;
                    warn!("seat {seat} picked illegal {action}, retry {attempts}");
                }
                Err(EngineError::IllegalAction { message, .. }) => {
                    self.abort(format!("seat {seat} kept choosing illegal actions: {message}"));
                    return Ok(false);
                }
                Err(e) => return self.settle_step(Err(e)),
            }
        }
        self.total_actions += 1;
        Ok(true)
    }

    /// Passes a successful step through; on a fatal error keeps the round
    /// log (the round has already ended as aborted) and ends the match.
    fn settle_step(&mut self, result: EngineResult<()>) -> EngineResult<bool> {
        match result {
            Ok(()) => Ok(true),
            Err(e) if e.is_fatal() => {
                if let Ok(log) = self.game.finish_round() {
                    self.logs.push(log);
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn abort(&mut self, reason: String) {
        if let Some(log) = self.game.abort(reason) {
            self.logs.push(log);
        }
    }

    /// Runs until the match ends.
    pub fn run_to_completion(&mut self, selector: &mut dyn ActionSelector) -> EngineResult<()> {
        while self.step_once(selector)? {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyoku_engine::seeding::seed_from_u64;
    use kyoku_engine::{GameLength, StandardOracle};

    fn runner(seed: u64, length: GameLength) -> MatchRunner {
        let rule = GameRule {
            length,
            ..GameRule::default()
        };
        MatchRunner::new(seed_from_u64(seed), rule, Arc::new(StandardOracle)).unwrap()
    }

    /// Declares ron on its own turn, which is never legal.
    struct Stubborn;

    impl ActionSelector for Stubborn {
        fn select_action(&mut self, _seat: Seat, _obs: &Observation, _legal: &[Action]) -> Action {
            Action::Ron
        }
    }

    #[test]
    fn match_completes_with_first_action() {
        let mut r = runner(42, GameLength::East);
        r.run_to_completion(&mut FirstActionSelector).unwrap();
        assert!(r.is_done());
        assert!(r.total_actions() > 20, "got {} actions", r.total_actions());
        assert_eq!(r.logs().len(), r.rounds_played());
    }

    #[test]
    fn random_selector_matches_conserve_points() {
        for seed in 0..4 {
            let mut r = runner(seed, GameLength::East);
            r.run_to_completion(&mut RandomSelector::new(seed)).unwrap();
            let state = r.game().state();
            let total = state.scores.iter().sum::<i32>() + state.riichi_pool as i32 * 1000;
            assert_eq!(total, 100_000, "seed {seed}");
        }
    }

    #[test]
    fn session_seeded_matches_are_deterministic() {
        let play = || {
            let mut session = SessionRng::new([42u8; 32]);
            let mut r = MatchRunner::with_session(&mut session, GameRule::default(), Arc::new(StandardOracle)).unwrap();
            r.run_to_completion(&mut RandomSelector::new(7)).unwrap();
            (r.scores(), r.total_actions(), serde_json::to_string(r.logs()).unwrap())
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn repeated_illegal_choices_abort_the_match() {
        let mut r = runner(3, GameLength::East);
        r.run_to_completion(&mut Stubborn).unwrap();
        assert!(matches!(r.termination(), Some(Termination::Aborted { .. })));
        assert_eq!(r.scores(), [25_000; 4]);
        assert_eq!(r.logs().len(), 1);
    }

    #[test]
    fn step_budget_aborts() {
        let mut r = runner(5, GameLength::Hanchan).with_max_steps(10);
        r.run_to_completion(&mut FirstActionSelector).unwrap();
        assert!(matches!(r.termination(), Some(Termination::Aborted { .. })));
        assert!(r.total_actions() <= 10);
    }
}
