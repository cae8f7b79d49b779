//! Rebuilds public and private round state from a recorded log.
//!
//! The replay needs nothing but the events: the deal is in `start_round`,
//! every tile movement after that has its own event. Tile conservation is
//! checked after each one.

use serde::Serialize;

use crate::errors::{EngineError, EngineResult};
use crate::event::{Event, RecordedEvent};
use crate::round::hand::DiscardEntry;
use crate::round::wall::DEAD_WALL_SIZE;
use crate::round::{RoundEnd, HAND_SIZE};
use crate::tile::{Tile, NUM_TILES_136};
use crate::types::{Meld, MeldKind, Seat, Wind, NUM_PLAYERS};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayState {
    pub round_wind: Wind,
    pub kyoku: u8,
    pub honba: u8,
    pub dealer: Seat,
    pub scores: [i32; NUM_PLAYERS],
    pub riichi_pool: u32,
    pub hands: [Vec<Tile>; NUM_PLAYERS],
    pub melds: [Vec<Meld>; NUM_PLAYERS],
    pub discards: [Vec<DiscardEntry>; NUM_PLAYERS],
    pub riichi: [bool; NUM_PLAYERS],
    pub dora_indicators: Vec<Tile>,
    pub live_remaining: usize,
    pub outcome: Option<RoundEnd>,
    /// The last pon upgraded to an added kan, in case the kan is robbed.
    kakan_pon: Option<Meld>,
    last_seq: Option<u64>,
    started: bool,
}

fn take_tile(hand: &mut Vec<Tile>, tile: Tile, seat: Seat) -> EngineResult<()> {
    match hand.iter().position(|&t| t == tile) {
        Some(pos) => {
            hand.remove(pos);
            Ok(())
        }
        None => Err(EngineError::invariant(format!("replay: seat {seat} does not hold {tile}"))),
    }
}

impl ReplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, recorded: &RecordedEvent) -> EngineResult<()> {
        if self.last_seq.is_some_and(|last| recorded.seq <= last) {
            return Err(EngineError::invariant(format!(
                "replay: event #{} out of order after #{:?}",
                recorded.seq, self.last_seq
            )));
        }
        self.last_seq = Some(recorded.seq);

        match &recorded.event {
            Event::StartRound {
                round_wind,
                kyoku,
                honba,
                riichi_pool,
                dealer,
                scores,
                dora_indicator,
                hands,
                ..
            } => {
                *self = Self {
                    round_wind: *round_wind,
                    kyoku: *kyoku,
                    honba: *honba,
                    dealer: *dealer,
                    scores: *scores,
                    riichi_pool: *riichi_pool,
                    hands: hands.clone(),
                    dora_indicators: vec![*dora_indicator],
                    live_remaining: NUM_TILES_136 - DEAD_WALL_SIZE - NUM_PLAYERS * HAND_SIZE,
                    last_seq: self.last_seq,
                    started: true,
                    ..Self::default()
                };
                for hand in &mut self.hands {
                    hand.sort();
                }
                return Ok(());
            }
            _ if !self.started => {
                return Err(EngineError::invariant("replay: log does not begin with start_round"));
            }
            Event::Draw { seat, tile, .. } => {
                if self.live_remaining == 0 {
                    return Err(EngineError::invariant("replay: draw from an empty wall"));
                }
                // A kan replacement also shortens the live wall by one.
                self.live_remaining -= 1;
                let hand = &mut self.hands[*seat as usize];
                let pos = hand.partition_point(|t| t < tile);
                hand.insert(pos, *tile);
            }
            Event::Discard {
                seat,
                tile,
                tsumogiri,
                riichi,
            } => {
                take_tile(&mut self.hands[*seat as usize], *tile, *seat)?;
                self.discards[*seat as usize].push(DiscardEntry {
                    tile: *tile,
                    tsumogiri: *tsumogiri,
                    riichi: *riichi,
                    called: false,
                });
            }
            Event::Call {
                seat,
                from,
                kind,
                tile,
                consumed,
            } => {
                for &t in consumed {
                    take_tile(&mut self.hands[*seat as usize], t, *seat)?;
                }
                match self.discards[*from as usize].last_mut() {
                    Some(last) if last.tile == *tile && !last.called => last.called = true,
                    _ => {
                        return Err(EngineError::invariant(format!(
                            "replay: seat {seat} calls {tile} which is not seat {from}'s last discard"
                        )))
                    }
                }
                let mut tiles = consumed.clone();
                tiles.push(*tile);
                self.melds[*seat as usize].push(Meld::new(*kind, tiles, *seat, Some(*from), Some(*tile), recorded.turn));
            }
            Event::Riichi { seat } => self.riichi[*seat as usize] = true,
            Event::RiichiAccepted {
                seat,
                riichi_pool,
                score,
            } => {
                self.scores[*seat as usize] = *score;
                self.riichi_pool = *riichi_pool;
            }
            Event::Kan { seat, kind, tiles } => {
                let s = *seat as usize;
                for &t in tiles {
                    take_tile(&mut self.hands[s], t, *seat)?;
                }
                match kind {
                    MeldKind::ClosedKan => {
                        self.melds[s].push(Meld::new(*kind, tiles.clone(), *seat, None, None, recorded.turn));
                    }
                    MeldKind::AddedKan => {
                        let added = tiles.first().copied();
                        let pon = self.melds[s]
                            .iter_mut()
                            .find(|m| m.kind == MeldKind::Pon && Some(m.base_kind()) == added.map(|t| t.kind()));
                        let (Some(pon), Some(added)) = (pon, added) else {
                            return Err(EngineError::invariant(format!("replay: seat {seat} adds to a missing pon")));
                        };
                        self.kakan_pon = Some(pon.clone());
                        let mut all = pon.tiles.clone();
                        all.push(added);
                        *pon = Meld::new(MeldKind::AddedKan, all, *seat, pon.from, Some(added), recorded.turn);
                    }
                    other => {
                        return Err(EngineError::invariant(format!("replay: kan event with {other:?}")));
                    }
                }
            }
            Event::Dora { indicator } => self.dora_indicators.push(*indicator),
            Event::RoundEnd { outcome, scores, .. } => {
                self.scores = *scores;
                self.outcome = Some(outcome.clone());
            }
            Event::Win {
                from,
                tile,
                tsumo: false,
                ..
            } => {
                // Chankan: the added kan reverts to its pon, the tile goes
                // back to the declarer. Later winners on the same kan skip this.
                let s = *from as usize;
                let robbed = self.melds[s]
                    .iter()
                    .position(|m| m.kind == MeldKind::AddedKan && m.tiles.contains(tile));
                if let Some(idx) = robbed {
                    let Some(pon) = self.kakan_pon.take() else {
                        return Err(EngineError::invariant(format!("replay: robbed kan on {tile} has no pon")));
                    };
                    self.melds[s][idx] = pon;
                    let hand = &mut self.hands[s];
                    let pos = hand.partition_point(|t| t < tile);
                    hand.insert(pos, *tile);
                }
            }
            Event::Win { .. } | Event::Unknown => {}
        }
        Ok(())
    }

    /// Live wall + dead wall + hands + melds + unclaimed discards == 136,
    /// and no physical tile is in two places at once.
    pub fn check_conservation(&self) -> EngineResult<()> {
        let mut seen = [false; NUM_TILES_136];
        let placed = self
            .hands
            .iter()
            .flatten()
            .chain(self.melds.iter().flatten().flat_map(|m| m.tiles.iter()))
            .chain(self.discards.iter().flatten().filter(|d| !d.called).map(|d| &d.tile))
            .chain(self.dora_indicators.iter());
        for t in placed {
            if std::mem::replace(&mut seen[t.id() as usize], true) {
                return Err(EngineError::invariant(format!("replay: {t} is in two places")));
            }
        }
        let hands: usize = self.hands.iter().map(Vec::len).sum();
        let melds: usize = self.melds.iter().flatten().map(|m| m.tiles.len()).sum();
        let ponds = self.discards.iter().flatten().filter(|d| !d.called).count();
        let total = self.live_remaining + DEAD_WALL_SIZE + hands + melds + ponds;
        if total != NUM_TILES_136 {
            return Err(EngineError::invariant(format!(
                "replay conservation: live {} + dead {DEAD_WALL_SIZE} + hands {hands} + melds {melds} + ponds {ponds} = {total}",
                self.live_remaining
            )));
        }
        Ok(())
    }
}

/// Replays a whole round log, checking conservation after every event.
pub fn replay_round(events: &[RecordedEvent]) -> EngineResult<ReplayState> {
    let mut state = ReplayState::new();
    for ev in events {
        state.apply(ev)?;
        state.check_conservation()?;
    }
    Ok(state)
}
