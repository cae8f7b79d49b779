//! One kyoku: deal, turns, calls and the round result.
//!
//! [`RoundState`] is a phase machine driven by two entry points. `draw`
//! advances `AwaitingDraw`; `apply` takes a player's decision in
//! `AwaitingDiscard`, `AwaitingCalls` or `AwaitingKanResponse`. Every action
//! is checked against `legal_actions` before anything is touched, so a
//! rejected action leaves the state exactly as it was.

pub mod hand;
mod legal_actions;
pub mod wall;

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::calls::{self, kuikae_kinds, CallWindow, Resolution};
use crate::errors::{EngineError, EngineResult};
use crate::event::{Event, EventRecorder, RecordedEvent};
use crate::ledger::{self, SettleInput, Settlement};
use crate::observation::Observation;
use crate::rule::GameRule;
use crate::score::{calculate_score, Score};
use crate::scoring::{HandValue, ScoringAdapter, WinContext};
use crate::tile::{Tile, NUM_TILES_136};
use crate::types::{next_seat, seat_distance, Meld, MeldKind, Seat, Wind, NUM_PLAYERS};

use hand::{DiscardEntry, Hand};
use wall::{Wall, WallExhausted};

/// Tiles dealt to each player.
pub const HAND_SIZE: usize = 13;
const MAX_KANS: usize = 4;

/// Table state carried into a round from the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSetup {
    pub round_wind: Wind,
    /// 0-3 within the round wind.
    pub kyoku: u8,
    pub honba: u8,
    pub riichi_pool: u32,
    pub dealer: Seat,
    pub scores: [i32; NUM_PLAYERS],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortiveDraw {
    KyushuKyuhai,
    /// Four riichi declarations.
    SuuchaRiichi,
    /// Four kans by more than one player.
    SuukanSanra,
    /// Four identical wind discards on the first go-around.
    SuufonRenda,
    /// Three players declared ron on one discard.
    SanchaHou,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRecord {
    pub seat: Seat,
    /// Discarder (or added-kan declarer); the winner for a tsumo.
    pub from: Seat,
    pub tile: Tile,
    pub tsumo: bool,
    pub value: HandValue,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RoundEnd {
    /// Winners, nearest to the discarder first.
    Win { winners: Vec<WinRecord> },
    /// Live wall ran out.
    Exhaustive { tenpai: [bool; NUM_PLAYERS] },
    Abortive { draw: AbortiveDraw },
    /// Cancelled from outside, or stopped on an invariant violation.
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RoundPhase {
    AwaitingDraw {
        seat: Seat,
    },
    AwaitingDiscard {
        seat: Seat,
    },
    AwaitingCalls {
        discarder: Seat,
        tile: Tile,
        /// Seats that still owe a response, nearest first.
        pending: Vec<Seat>,
    },
    /// Chankan window after an added kan.
    AwaitingKanResponse {
        seat: Seat,
        tile: Tile,
        pending: Vec<Seat>,
    },
    RoundEnded(RoundEnd),
}

impl RoundPhase {
    pub fn name(&self) -> &'static str {
        match self {
            RoundPhase::AwaitingDraw { .. } => "awaiting_draw",
            RoundPhase::AwaitingDiscard { .. } => "awaiting_discard",
            RoundPhase::AwaitingCalls { .. } => "awaiting_calls",
            RoundPhase::AwaitingKanResponse { .. } => "awaiting_kan_response",
            RoundPhase::RoundEnded(_) => "round_ended",
        }
    }
}

/// Result of one successful `draw` or `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// The scoring oracle refused a win. The claim counts as not made and
    /// the round goes on. Always `EngineError::ScoringRejected`.
    ClaimRejected(EngineError),
    RoundEnded,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundState {
    setup: RoundSetup,
    rule: GameRule,
    #[serde(skip)]
    adapter: ScoringAdapter,
    wall: Wall,
    hands: [Hand; NUM_PLAYERS],
    phase: RoundPhase,
    /// Live scores: riichi deposits are taken as they are accepted.
    scores: [i32; NUM_PLAYERS],
    riichi_pool: u32,
    deposited: [bool; NUM_PLAYERS],
    /// Discards made this round.
    turn: u32,
    /// No call (including closed kans) has happened yet.
    uninterrupted: bool,
    last_discard: Option<(Seat, Tile)>,
    pending_riichi: Option<Seat>,
    /// Responses collected in the open window.
    responses: Vec<(Seat, Action)>,
    /// Accepted ron values, waiting for the window to close.
    ron_values: Vec<(Seat, HandValue)>,
    candidates: [Vec<Action>; NUM_PLAYERS],
    /// The acting seat's tile came from the dead wall.
    after_kan: bool,
    /// A win by this seat was refused since its last discard.
    rejected: [bool; NUM_PLAYERS],
    /// The pon an added kan upgraded, while the chankan window is open.
    kakan_pon: Option<Meld>,
    settlement: Option<Settlement>,
    fault: Option<String>,
    recorder: EventRecorder,
}

impl RoundState {
    /// Deals 13 tiles to each seat (dealer first, three passes of four and a
    /// pass of one) and waits for the dealer's first draw.
    pub fn new(setup: RoundSetup, mut wall: Wall, rule: GameRule, adapter: ScoringAdapter) -> EngineResult<Self> {
        let mut dealt: [Vec<Tile>; NUM_PLAYERS] = Default::default();
        for pass in 0..4 {
            let per_seat = if pass < 3 { 4 } else { 1 };
            for i in 0..NUM_PLAYERS as u8 {
                let seat = (setup.dealer + i) % NUM_PLAYERS as u8;
                for _ in 0..per_seat {
                    let tile = wall
                        .draw_live()
                        .map_err(|_| EngineError::invariant("wall too short to deal"))?;
                    dealt[seat as usize].push(tile);
                }
            }
        }

        let mut recorder = EventRecorder::new();
        recorder.record(
            0,
            Event::StartRound {
                round_wind: setup.round_wind,
                kyoku: setup.kyoku,
                honba: setup.honba,
                riichi_pool: setup.riichi_pool,
                dealer: setup.dealer,
                scores: setup.scores,
                dora_indicator: wall.dora_indicators()[0],
                hands: dealt.clone().map(|mut h| {
                    h.sort();
                    h
                }),
                wall_digest: wall.digest().to_string(),
            },
        );
        debug!(
            "round start {:?}-{} honba {} dealer {} wall {}",
            setup.round_wind,
            setup.kyoku + 1,
            setup.honba,
            setup.dealer,
            &wall.digest()[..12]
        );

        Ok(Self {
            scores: setup.scores,
            riichi_pool: setup.riichi_pool,
            phase: RoundPhase::AwaitingDraw { seat: setup.dealer },
            hands: dealt.map(Hand::new),
            setup,
            rule,
            adapter,
            wall,
            deposited: [false; NUM_PLAYERS],
            turn: 0,
            uninterrupted: true,
            last_discard: None,
            pending_riichi: None,
            responses: Vec::new(),
            ron_values: Vec::new(),
            candidates: Default::default(),
            after_kan: false,
            rejected: [false; NUM_PLAYERS],
            kakan_pon: None,
            settlement: None,
            fault: None,
            recorder,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn setup(&self) -> &RoundSetup {
        &self.setup
    }

    pub fn rule(&self) -> &GameRule {
        &self.rule
    }

    pub fn phase(&self) -> &RoundPhase {
        &self.phase
    }

    pub fn hand(&self, seat: Seat) -> &Hand {
        &self.hands[seat as usize]
    }

    pub fn hands(&self) -> &[Hand; NUM_PLAYERS] {
        &self.hands
    }

    pub fn wall(&self) -> &Wall {
        &self.wall
    }

    pub fn scores(&self) -> [i32; NUM_PLAYERS] {
        self.scores
    }

    pub fn riichi_pool(&self) -> u32 {
        self.riichi_pool
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn dealer(&self) -> Seat {
        self.setup.dealer
    }

    pub fn last_discard(&self) -> Option<(Seat, Tile)> {
        self.last_discard
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.phase, RoundPhase::RoundEnded(_))
    }

    pub fn outcome(&self) -> Option<&RoundEnd> {
        match &self.phase {
            RoundPhase::RoundEnded(end) => Some(end),
            _ => None,
        }
    }

    /// Score movement of the finished round.
    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    /// Set when the round was stopped by an invariant violation.
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn events(&self) -> &[RecordedEvent] {
        self.recorder.events()
    }

    /// Hands the recorded log out. Meant for round end.
    pub fn take_log(&mut self) -> Vec<RecordedEvent> {
        self.recorder.take()
    }

    /// Seats whose decision the round is waiting on.
    pub fn pending_seats(&self) -> Vec<Seat> {
        match &self.phase {
            RoundPhase::AwaitingDiscard { seat } => vec![*seat],
            RoundPhase::AwaitingCalls { pending, .. } | RoundPhase::AwaitingKanResponse { pending, .. } => {
                pending.clone()
            }
            RoundPhase::AwaitingDraw { .. } | RoundPhase::RoundEnded(_) => Vec::new(),
        }
    }

    pub fn observe(&self, seat: Seat) -> Observation {
        Observation::new(self, seat)
    }

    fn kan_count(&self) -> usize {
        self.hands
            .iter()
            .flat_map(|h| h.melds())
            .filter(|m| m.kind.is_kan())
            .count()
    }

    /// A new kan has both a replacement tile and a live tile to shift.
    pub(crate) fn kan_available(&self) -> bool {
        self.kan_count() < MAX_KANS && self.wall.live_remaining() > 0
    }

    // -----------------------------------------------------------------------
    // Driving the round
    // -----------------------------------------------------------------------

    /// Draws for the seat in `AwaitingDraw`. An empty live wall ends the
    /// round in an exhaustive draw.
    pub fn draw(&mut self) -> EngineResult<StepOutcome> {
        let RoundPhase::AwaitingDraw { seat } = self.phase else {
            return Err(self.phase_error("awaiting_draw"));
        };
        let outcome = match self.wall.draw_live() {
            Ok(tile) => {
                log::trace!("seat {seat} draws {tile}");
                let hand = &mut self.hands[seat as usize];
                hand.add(tile);
                hand.drawn = Some(tile);
                self.after_kan = false;
                self.record(Event::Draw {
                    seat,
                    tile,
                    rinshan: false,
                });
                self.phase = RoundPhase::AwaitingDiscard { seat };
                StepOutcome::Continue
            }
            Err(WallExhausted) => {
                let tenpai = std::array::from_fn(|s| {
                    let hand = &self.hands[s];
                    hand.size_units() == HAND_SIZE && self.adapter.is_tenpai(hand.concealed())
                });
                self.end_round(RoundEnd::Exhaustive { tenpai });
                StepOutcome::RoundEnded
            }
        };
        self.check_invariants()?;
        Ok(outcome)
    }

    /// Applies `action` for `seat`. Illegal actions, including any action
    /// sent while the round waits on a draw or has ended, are refused with
    /// `IllegalAction` and change nothing.
    pub fn apply(&mut self, seat: Seat, action: Action) -> EngineResult<StepOutcome> {
        // Outside a decision phase nothing is legal, so a late call on a
        // resolved discard lands here too.
        if !self.legal_actions(seat).contains(&action) {
            warn!("seat {seat} illegal {action} in {}", self.phase.name());
            return Err(EngineError::illegal(
                seat,
                format!("{action} is not legal in {}", self.phase.name()),
            ));
        }
        let result = match self.phase {
            RoundPhase::AwaitingDiscard { .. } => self.apply_turn_action(seat, action),
            _ => self.apply_response(seat, action),
        };
        match result {
            Ok(outcome) => {
                self.check_invariants()?;
                Ok(outcome)
            }
            Err(e) if e.is_fatal() => Err(self.fail(e)),
            Err(e) => Err(e),
        }
    }

    /// Stops the round from outside. The settlement refunds this round's
    /// deposits, so the match scores are left untouched.
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.is_ended() {
            return;
        }
        let reason = reason.into();
        warn!("round aborted: {reason}");
        self.end_round(RoundEnd::Aborted { reason });
    }

    /// Tile conservation and hand sizes. A violation ends the round as
    /// `Aborted` and is returned as `InvariantViolation`.
    pub fn check_invariants(&mut self) -> EngineResult<()> {
        match self.verify() {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Read-only form of [`check_invariants`](Self::check_invariants).
    pub fn verify(&self) -> EngineResult<()> {
        self.wall.check_accounting()?;
        let in_hands: usize = self.hands.iter().map(|h| h.tile_count()).sum();
        let in_ponds: usize = self
            .hands
            .iter()
            .flat_map(|h| h.discards())
            .filter(|d| !d.called)
            .count();
        let total = self.wall.live_remaining() + self.wall.dead_count() + in_hands + in_ponds;
        if total != NUM_TILES_136 {
            return Err(EngineError::invariant(format!(
                "tile conservation: live {} + dead {} + hands {in_hands} + ponds {in_ponds} = {total}",
                self.wall.live_remaining(),
                self.wall.dead_count()
            )));
        }
        let acting = match self.phase {
            RoundPhase::AwaitingDiscard { seat } => Some(seat),
            _ => None,
        };
        for (s, hand) in self.hands.iter().enumerate() {
            let units = hand.size_units();
            let ok = match (&self.phase, acting) {
                (RoundPhase::RoundEnded(_), _) => units == HAND_SIZE || units == HAND_SIZE + 1,
                (_, Some(a)) if a as usize == s => units == HAND_SIZE + 1,
                _ => units == HAND_SIZE,
            };
            if !ok {
                return Err(EngineError::invariant(format!(
                    "seat {s} holds {units} tiles in {}",
                    self.phase.name()
                )));
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Turn actions
    // -----------------------------------------------------------------------

    fn apply_turn_action(&mut self, seat: Seat, action: Action) -> EngineResult<StepOutcome> {
        match action {
            Action::Discard { tile } => self.discard(seat, tile, false),
            Action::Riichi { tile } => {
                let double = self.uninterrupted && self.hands[seat as usize].discards().is_empty();
                self.hands[seat as usize].declare_riichi(self.turn, double);
                self.pending_riichi = Some(seat);
                self.record(Event::Riichi { seat });
                self.discard(seat, tile, true)
            }
            Action::Tsumo => self.tsumo(seat),
            Action::Ankan { tiles } => {
                let hand = &mut self.hands[seat as usize];
                for t in tiles {
                    if !hand.remove(t) {
                        return Err(EngineError::invariant(format!("ankan tile {t} missing from hand")));
                    }
                }
                hand.drawn = None;
                hand.push_meld(Meld::new(MeldKind::ClosedKan, tiles.to_vec(), seat, None, None, self.turn));
                self.record(Event::Kan {
                    seat,
                    kind: MeldKind::ClosedKan,
                    tiles: tiles.to_vec(),
                });
                self.break_ippatsu();
                self.draw_replacement(seat)?;
                Ok(StepOutcome::Continue)
            }
            Action::Kakan { tile } => self.declare_kakan(seat, tile),
            Action::KyushuKyuhai => {
                self.end_round(RoundEnd::Abortive {
                    draw: AbortiveDraw::KyushuKyuhai,
                });
                Ok(StepOutcome::RoundEnded)
            }
            other => Err(EngineError::illegal(seat, format!("{other} is a response"))),
        }
    }

    fn discard(&mut self, seat: Seat, tile: Tile, riichi: bool) -> EngineResult<StepOutcome> {
        let hand = &mut self.hands[seat as usize];
        if !hand.remove(tile) {
            return Err(EngineError::invariant(format!("discard {tile} missing from hand")));
        }
        let tsumogiri = hand.drawn == Some(tile);
        hand.drawn = None;
        hand.kuikae.clear();
        hand.temporary_furiten = false;
        if !riichi {
            hand.ippatsu = false;
        }
        hand.push_discard(DiscardEntry {
            tile,
            tsumogiri,
            riichi,
            called: false,
        });
        self.turn += 1;
        self.rejected = [false; NUM_PLAYERS];
        self.after_kan = false;
        self.last_discard = Some((seat, tile));
        self.record(Event::Discard {
            seat,
            tile,
            tsumogiri,
            riichi,
        });

        let window = CallWindow {
            discarder: seat,
            tile,
            calls_allowed: self.wall.live_remaining() > 0,
            kan_allowed: self.kan_available(),
            kuikae_forbidden: self.rule.kuikae_forbidden,
        };
        let can_ron = std::array::from_fn(|s| s as Seat != seat && self.can_ron(s as Seat, tile));
        self.candidates = calls::call_candidates(&self.hands, can_ron, &window);
        let mut pending: Vec<Seat> = (0..NUM_PLAYERS as Seat)
            .filter(|&s| !self.candidates[s as usize].is_empty())
            .collect();
        pending.sort_by_key(|&s| seat_distance(seat, s));
        self.responses.clear();
        self.ron_values.clear();
        if pending.is_empty() {
            return self.discard_passed(seat);
        }
        self.phase = RoundPhase::AwaitingCalls {
            discarder: seat,
            tile,
            pending,
        };
        Ok(StepOutcome::Continue)
    }

    fn tsumo(&mut self, seat: Seat) -> EngineResult<StepOutcome> {
        let hand = &self.hands[seat as usize];
        let Some(tile) = hand.drawn else {
            return Err(EngineError::illegal(seat, "tsumo without a drawn tile"));
        };
        let mut rest = hand.clone();
        rest.remove(tile);
        let context = WinContext {
            is_tsumo: true,
            haitei: self.wall.live_remaining() == 0 && !self.after_kan,
            rinshan: self.after_kan,
            first_draw: self.uninterrupted && hand.discards().is_empty(),
            ..self.win_context(seat)
        };
        let request = self.adapter.build_request(
            seat,
            &rest,
            tile,
            context,
            self.wall.dora_indicators(),
            self.wall.ura_indicators(),
        );
        match self.adapter.evaluate(&request) {
            Ok(value) => {
                let winners = vec![self.win_record(seat, seat, tile, true, value)];
                self.end_round(RoundEnd::Win { winners });
                Ok(StepOutcome::RoundEnded)
            }
            Err(e) => {
                warn!("seat {seat} tsumo rejected: {e}");
                self.rejected[seat as usize] = true;
                Ok(StepOutcome::ClaimRejected(EngineError::rejected(seat, &e)))
            }
        }
    }

    fn declare_kakan(&mut self, seat: Seat, tile: Tile) -> EngineResult<StepOutcome> {
        let turn = self.turn;
        let hand = &mut self.hands[seat as usize];
        let Some(idx) = hand
            .melds()
            .iter()
            .position(|m| m.kind == MeldKind::Pon && m.base_kind() == tile.kind())
        else {
            return Err(EngineError::invariant(format!("kakan {tile} without a pon")));
        };
        if !hand.remove(tile) {
            return Err(EngineError::invariant(format!("kakan tile {tile} missing from hand")));
        }
        hand.drawn = None;
        let pon = hand.melds()[idx].clone();
        let mut tiles = pon.tiles.clone();
        tiles.push(tile);
        hand.melds_mut()[idx] = Meld::new(MeldKind::AddedKan, tiles, seat, pon.from, Some(tile), turn);
        self.record(Event::Kan {
            seat,
            kind: MeldKind::AddedKan,
            tiles: vec![tile],
        });

        let mut pending: Vec<Seat> = (1..NUM_PLAYERS as Seat)
            .map(|d| (seat + d) % NUM_PLAYERS as Seat)
            .filter(|&s| self.can_ron(s, tile))
            .collect();
        pending.sort_by_key(|&s| seat_distance(seat, s));
        self.responses.clear();
        self.ron_values.clear();
        for (s, c) in self.candidates.iter_mut().enumerate() {
            *c = if pending.contains(&(s as Seat)) {
                vec![Action::Ron, Action::Pass]
            } else {
                Vec::new()
            };
        }
        if pending.is_empty() {
            self.break_ippatsu();
            self.draw_replacement(seat)?;
            return Ok(StepOutcome::Continue);
        }
        self.kakan_pon = Some(pon);
        self.phase = RoundPhase::AwaitingKanResponse { seat, tile, pending };
        Ok(StepOutcome::Continue)
    }

    // -----------------------------------------------------------------------
    // Responses
    // -----------------------------------------------------------------------

    fn apply_response(&mut self, seat: Seat, action: Action) -> EngineResult<StepOutcome> {
        let (from, tile, chankan) = match &self.phase {
            RoundPhase::AwaitingCalls { discarder, tile, .. } => (*discarder, *tile, false),
            RoundPhase::AwaitingKanResponse { seat: declarer, tile, .. } => (*declarer, *tile, true),
            _ => return Err(self.phase_error("a call window")),
        };

        let mut outcome = StepOutcome::Continue;
        let mut recorded = action;
        if action == Action::Ron {
            let hand = &self.hands[seat as usize];
            let context = WinContext {
                houtei: !chankan && self.wall.live_remaining() == 0,
                chankan,
                ..self.win_context(seat)
            };
            let request = self.adapter.build_request(
                seat,
                hand,
                tile,
                context,
                self.wall.dora_indicators(),
                self.wall.ura_indicators(),
            );
            match self.adapter.evaluate(&request) {
                Ok(value) => self.ron_values.push((seat, value)),
                Err(e) => {
                    warn!("seat {seat} ron on {tile} rejected: {e}");
                    self.rejected[seat as usize] = true;
                    recorded = Action::Pass;
                    outcome = StepOutcome::ClaimRejected(EngineError::rejected(seat, &e));
                }
            }
        }
        self.responses.push((seat, recorded));
        self.candidates[seat as usize].clear();

        let still_pending = match &mut self.phase {
            RoundPhase::AwaitingCalls { pending, .. } | RoundPhase::AwaitingKanResponse { pending, .. } => {
                pending.retain(|&s| s != seat);
                !pending.is_empty()
            }
            _ => false,
        };
        if still_pending {
            return Ok(outcome);
        }

        let resolved = self.close_window(from, tile, chankan)?;
        Ok(match outcome {
            StepOutcome::ClaimRejected(_) => outcome,
            _ => resolved,
        })
    }

    fn close_window(&mut self, from: Seat, tile: Tile, chankan: bool) -> EngineResult<StepOutcome> {
        let resolution = calls::resolve(&self.responses, from, &self.rule);
        if !matches!(resolution, Resolution::Ron(_) | Resolution::TripleRon) {
            self.mark_missed_wins(tile);
        }
        let robbed_pon = self.kakan_pon.take();
        match resolution {
            Resolution::Ron(seats) => {
                if let Some(pon) = robbed_pon.filter(|_| chankan) {
                    self.restore_robbed_pon(from, tile, pon)?;
                }
                let winners = seats
                    .iter()
                    .filter_map(|&s| {
                        let value = self.ron_values.iter().find(|(w, _)| *w == s)?.1.clone();
                        Some(self.win_record(s, from, tile, false, value))
                    })
                    .collect();
                self.end_round(RoundEnd::Win { winners });
                Ok(StepOutcome::RoundEnded)
            }
            Resolution::TripleRon => {
                self.end_round(RoundEnd::Abortive {
                    draw: AbortiveDraw::SanchaHou,
                });
                Ok(StepOutcome::RoundEnded)
            }
            Resolution::Call { seat, action } if !chankan => {
                self.accept_pending_riichi();
                self.apply_call(seat, action, from, tile)?;
                Ok(StepOutcome::Continue)
            }
            _ if chankan => {
                self.break_ippatsu();
                self.draw_replacement(from)?;
                Ok(StepOutcome::Continue)
            }
            _ => self.discard_passed(from),
        }
    }

    /// A robbed added kan never completes: the pon comes back and the added
    /// tile returns to the declarer's concealed tiles.
    fn restore_robbed_pon(&mut self, declarer: Seat, tile: Tile, pon: Meld) -> EngineResult<()> {
        let hand = &mut self.hands[declarer as usize];
        let Some(meld) = hand
            .melds_mut()
            .iter_mut()
            .find(|m| m.kind == MeldKind::AddedKan && m.tiles.contains(&tile))
        else {
            return Err(EngineError::invariant(format!("robbed kan on {tile} not found")));
        };
        *meld = pon;
        hand.add(tile);
        debug!("seat {declarer} loses its added kan on {tile}");
        Ok(())
    }

    /// Seats that passed a tile they could have won on become furiten.
    fn mark_missed_wins(&mut self, tile: Tile) {
        let passed: Vec<Seat> = self
            .responses
            .iter()
            .filter(|(_, a)| *a == Action::Pass)
            .map(|(s, _)| *s)
            .collect();
        for seat in passed {
            if self.could_ron_shape(seat, tile) {
                let hand = &mut self.hands[seat as usize];
                hand.temporary_furiten = true;
                if hand.is_riichi() {
                    hand.riichi_furiten = true;
                }
            }
        }
    }

    fn apply_call(&mut self, seat: Seat, action: Action, from: Seat, tile: Tile) -> EngineResult<()> {
        let (kind, consumed): (MeldKind, Vec<Tile>) = match action {
            Action::Chi { consumed } => (MeldKind::Chi, consumed.to_vec()),
            Action::Pon { consumed } => (MeldKind::Pon, consumed.to_vec()),
            Action::Daiminkan { consumed } => (MeldKind::OpenKan, consumed.to_vec()),
            other => return Err(EngineError::invariant(format!("{other} resolved as a call"))),
        };
        debug!("seat {seat} calls {action} on {tile} from seat {from}");
        let hand = &mut self.hands[seat as usize];
        for &t in &consumed {
            if !hand.remove(t) {
                return Err(EngineError::invariant(format!("call tile {t} missing from hand")));
            }
        }
        let mut tiles = consumed.clone();
        tiles.push(tile);
        hand.push_meld(Meld::new(kind, tiles, seat, Some(from), Some(tile), self.turn));
        hand.drawn = None;
        if self.rule.kuikae_forbidden && kind != MeldKind::OpenKan {
            hand.kuikae = kuikae_kinds(tile, &consumed, kind == MeldKind::Chi);
        }
        self.hands[from as usize].mark_last_discard_called();
        self.record(Event::Call {
            seat,
            from,
            kind,
            tile,
            consumed,
        });
        self.break_ippatsu();
        self.phase = RoundPhase::AwaitingDiscard { seat };
        if kind == MeldKind::OpenKan {
            self.draw_replacement(seat)?;
        }
        Ok(())
    }

    /// The discard went unclaimed: settle a pending riichi, check the
    /// abortive draws and pass the turn on.
    fn discard_passed(&mut self, discarder: Seat) -> EngineResult<StepOutcome> {
        self.accept_pending_riichi();

        if let Some(draw) = self.abortive_draw() {
            self.end_round(RoundEnd::Abortive { draw });
            return Ok(StepOutcome::RoundEnded);
        }
        if self.turn >= NUM_PLAYERS as u32 {
            self.uninterrupted = false;
        }
        self.phase = RoundPhase::AwaitingDraw {
            seat: next_seat(discarder),
        };
        Ok(StepOutcome::Continue)
    }

    fn abortive_draw(&self) -> Option<AbortiveDraw> {
        if self.rule.suucha_riichi && self.hands.iter().all(|h| h.is_riichi()) {
            return Some(AbortiveDraw::SuuchaRiichi);
        }
        if self.rule.suufon_renda && self.uninterrupted && self.turn == NUM_PLAYERS as u32 {
            let firsts: Vec<Tile> = self.hands.iter().filter_map(|h| h.discards().first().map(|d| d.tile)).collect();
            if firsts.len() == NUM_PLAYERS
                && firsts[0].kind().is_wind()
                && firsts.iter().all(|t| t.kind() == firsts[0].kind())
            {
                return Some(AbortiveDraw::SuufonRenda);
            }
        }
        if self.rule.suukan_sanra && self.kan_count() == MAX_KANS {
            let kan_owners = self
                .hands
                .iter()
                .filter(|h| h.melds().iter().any(|m| m.kind.is_kan()))
                .count();
            if kan_owners > 1 {
                return Some(AbortiveDraw::SuukanSanra);
            }
        }
        None
    }

    fn accept_pending_riichi(&mut self) {
        let Some(seat) = self.pending_riichi.take() else {
            return;
        };
        let s = seat as usize;
        self.hands[s].accept_riichi();
        self.scores[s] -= self.rule.riichi_deposit;
        self.riichi_pool += 1;
        self.deposited[s] = true;
        self.record(Event::RiichiAccepted {
            seat,
            riichi_pool: self.riichi_pool,
            score: self.scores[s],
        });
    }

    fn draw_replacement(&mut self, seat: Seat) -> EngineResult<()> {
        let tile = self
            .wall
            .draw_kan_replacement()
            .map_err(|_| EngineError::invariant("kan declared without a replacement tile"))?;
        self.uninterrupted = false;
        if let Some(&indicator) = self.wall.dora_indicators().last() {
            self.record(Event::Dora { indicator });
        }
        let hand = &mut self.hands[seat as usize];
        hand.add(tile);
        hand.drawn = Some(tile);
        self.after_kan = true;
        self.record(Event::Draw {
            seat,
            tile,
            rinshan: true,
        });
        self.phase = RoundPhase::AwaitingDiscard { seat };
        Ok(())
    }

    fn break_ippatsu(&mut self) {
        self.uninterrupted = false;
        for hand in &mut self.hands {
            hand.ippatsu = false;
        }
    }

    // -----------------------------------------------------------------------
    // Wins and round end
    // -----------------------------------------------------------------------

    /// Ron shape on `tile` with no furiten.
    pub(crate) fn can_ron(&self, seat: Seat, tile: Tile) -> bool {
        let hand = &self.hands[seat as usize];
        if self.rejected[seat as usize] || hand.size_units() != HAND_SIZE {
            return false;
        }
        let waits = self.adapter.waits(hand.concealed());
        waits.contains(&tile.kind()) && !hand.is_furiten(&waits)
    }

    fn could_ron_shape(&self, seat: Seat, tile: Tile) -> bool {
        let hand = &self.hands[seat as usize];
        hand.size_units() == HAND_SIZE && self.adapter.waits(hand.concealed()).contains(&tile.kind())
    }

    fn win_context(&self, seat: Seat) -> WinContext {
        let hand = &self.hands[seat as usize];
        let riichi = hand.riichi();
        WinContext {
            is_dealer: seat == self.setup.dealer,
            seat_wind: Wind::of_seat(seat, self.setup.dealer),
            round_wind: self.setup.round_wind,
            riichi: riichi.is_some(),
            double_riichi: riichi.is_some_and(|r| r.double),
            ippatsu: hand.ippatsu(),
            aka_dora: self.rule.aka_dora,
            open_tanyao: self.rule.open_tanyao,
            ..WinContext::default()
        }
    }

    fn win_record(&self, seat: Seat, from: Seat, tile: Tile, tsumo: bool, value: HandValue) -> WinRecord {
        let score = calculate_score(
            value.han,
            value.fu,
            seat == self.setup.dealer,
            tsumo,
            self.setup.honba,
            self.rule.honba_bonus,
        );
        WinRecord {
            seat,
            from,
            tile,
            tsumo,
            value,
            score,
        }
    }

    fn end_round(&mut self, outcome: RoundEnd) {
        if let RoundEnd::Win { winners } = &outcome {
            for w in winners {
                self.record(Event::Win {
                    seat: w.seat,
                    from: w.from,
                    tile: w.tile,
                    tsumo: w.tsumo,
                    value: w.value.clone(),
                    score: w.score,
                });
            }
        }
        let settlement = ledger::settle(&SettleInput {
            outcome: &outcome,
            dealer: self.setup.dealer,
            honba: self.setup.honba,
            riichi_pool: self.riichi_pool,
            deposited: self.deposited,
            rule: &self.rule,
        });
        let mut scores = self.scores;
        for (score, delta) in scores.iter_mut().zip(settlement.deltas) {
            *score += delta;
        }
        debug!("round end {} deltas {:?}", outcome_name(&outcome), settlement.deltas);
        self.record(Event::RoundEnd {
            outcome: outcome.clone(),
            deltas: settlement.deltas,
            scores,
        });
        self.scores = scores;
        self.riichi_pool = settlement.riichi_pool;
        self.settlement = Some(settlement);
        self.pending_riichi = None;
        self.phase = RoundPhase::RoundEnded(outcome);
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        error!("{err}");
        if !self.is_ended() {
            self.fault = Some(err.to_string());
            self.end_round(RoundEnd::Aborted {
                reason: err.to_string(),
            });
        }
        err
    }

    fn record(&mut self, event: Event) {
        self.recorder.record(self.turn, event);
    }

    fn phase_error(&self, expected: &'static str) -> EngineError {
        EngineError::InvalidPhase {
            expected,
            found: self.phase.name().to_string(),
        }
    }
}

fn outcome_name(outcome: &RoundEnd) -> &'static str {
    match outcome {
        RoundEnd::Win { .. } => "win",
        RoundEnd::Exhaustive { .. } => "exhaustive",
        RoundEnd::Abortive { .. } => "abortive",
        RoundEnd::Aborted { .. } => "aborted",
    }
}
