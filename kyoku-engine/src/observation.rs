//! Per-seat view of a round.
//!
//! Everything public at the table plus the observer's own concealed tiles.
//! Opponents' hands, the wall order and ura indicators are never included.

use serde::{Deserialize, Serialize};

use crate::round::hand::DiscardEntry;
use crate::round::RoundState;
use crate::tile::Tile;
use crate::types::{Meld, Seat, Wind, NUM_PLAYERS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// The player whose perspective this is.
    pub seat: Seat,
    /// Name of the current round phase.
    pub phase: String,
    pub round_wind: Wind,
    pub seat_wind: Wind,
    pub kyoku: u8,
    pub honba: u8,
    pub riichi_pool: u32,
    pub dealer: Seat,
    pub scores: [i32; NUM_PLAYERS],
    /// Observer's concealed tiles, sorted.
    pub hand: Vec<Tile>,
    pub drawn: Option<Tile>,
    pub melds: [Vec<Meld>; NUM_PLAYERS],
    pub discards: [Vec<DiscardEntry>; NUM_PLAYERS],
    pub riichi: [bool; NUM_PLAYERS],
    pub dora_indicators: Vec<Tile>,
    pub live_remaining: usize,
    /// The tile currently open to claims, with its discarder.
    pub last_discard: Option<(Seat, Tile)>,
    pub turn: u32,
}

impl Observation {
    pub fn new(round: &RoundState, seat: Seat) -> Self {
        let setup = round.setup();
        let own = round.hand(seat);
        Self {
            seat,
            phase: round.phase().name().to_string(),
            round_wind: setup.round_wind,
            seat_wind: Wind::of_seat(seat, setup.dealer),
            kyoku: setup.kyoku,
            honba: setup.honba,
            riichi_pool: round.riichi_pool(),
            dealer: setup.dealer,
            scores: round.scores(),
            hand: own.concealed().to_vec(),
            drawn: own.drawn(),
            melds: std::array::from_fn(|s| round.hand(s as Seat).melds().to_vec()),
            discards: std::array::from_fn(|s| round.hand(s as Seat).discards().to_vec()),
            riichi: std::array::from_fn(|s| round.hand(s as Seat).is_riichi()),
            dora_indicators: round.wall().dora_indicators(),
            live_remaining: round.wall().live_remaining(),
            last_discard: round.last_discard(),
            turn: round.turn(),
        }
    }

    /// Seats counted from the observer: 0 = self, 1 = next (shimocha).
    pub fn relative(&self, seat: Seat) -> u8 {
        crate::types::seat_distance(self.seat, seat)
    }
}
