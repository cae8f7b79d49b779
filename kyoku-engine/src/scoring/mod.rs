//! Boundary to the hand-scoring oracle.
//!
//! The round state machine never evaluates yaku or fu itself. It assembles a
//! [`WinRequest`], hands it to the [`ScoringAdapter`], and either receives a
//! [`HandValue`] or a refusal that turns the claim into a rejection.
//! [`StandardOracle`] is the bundled reference implementation.

pub mod agari;
pub mod shanten;
mod yaku;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::round::hand::Hand;
use crate::tile::{kind_counts, Tile, TileType};
use crate::types::{Meld, Seat, Wind};

pub use yaku::StandardOracle;

/// Why an oracle refused to value a hand.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("hand is complete but has no yaku")]
    NoYaku,
    #[error("tiles do not form a winning hand")]
    NotAgari,
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Situational flags that affect the value of a win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WinContext {
    pub is_tsumo: bool,
    pub is_dealer: bool,
    pub seat_wind: Wind,
    pub round_wind: Wind,
    pub riichi: bool,
    pub double_riichi: bool,
    pub ippatsu: bool,
    pub rinshan: bool,
    pub chankan: bool,
    /// Tsumo on the last live tile.
    pub haitei: bool,
    /// Ron on the last discard.
    pub houtei: bool,
    /// Tsumo on the player's uninterrupted first draw (tenhou / chiihou).
    pub first_draw: bool,
    pub aka_dora: bool,
    /// Tanyao is allowed on an open hand.
    pub open_tanyao: bool,
}

/// Everything the oracle needs to value one win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinRequest {
    pub seat: Seat,
    /// Concealed tiles, excluding `win_tile`.
    pub concealed: Vec<Tile>,
    pub melds: Vec<Meld>,
    pub win_tile: Tile,
    pub dora_indicators: Vec<Tile>,
    /// Empty unless the winner is in riichi.
    pub ura_indicators: Vec<Tile>,
    pub context: WinContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandValue {
    pub han: u8,
    pub fu: u8,
    /// Yaku names, dora entries last.
    pub yaku: Vec<String>,
    /// Dora, aka and ura counted into `han`.
    pub dora: u8,
    pub yakuman: bool,
    /// Base points (`fu * 2^(han+2)` or the limit value).
    pub cost: u32,
}

/// A hand-scoring oracle. Implementations must be stateless with respect to
/// any one match: the same oracle is shared by parallel matches.
pub trait ScoringOracle: Send + Sync {
    /// Shanten of the concealed tiles; called sets are implied by the count.
    fn shanten(&self, tiles: &[Tile]) -> i8;

    fn hand_value(&self, request: &WinRequest) -> Result<HandValue, OracleError>;
}

/// The round's handle on the oracle.
#[derive(Clone)]
pub struct ScoringAdapter {
    oracle: Arc<dyn ScoringOracle>,
}

impl fmt::Debug for ScoringAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringAdapter").finish_non_exhaustive()
    }
}

impl Default for ScoringAdapter {
    fn default() -> Self {
        Self::new(Arc::new(StandardOracle))
    }
}

impl ScoringAdapter {
    pub fn new(oracle: Arc<dyn ScoringOracle>) -> Self {
        Self { oracle }
    }

    pub fn shanten(&self, tiles: &[Tile]) -> i8 {
        self.oracle.shanten(tiles)
    }

    /// `3n + 2` concealed tiles forming a complete shape.
    pub fn is_complete(&self, tiles: &[Tile]) -> bool {
        tiles.len() % 3 == 2 && self.oracle.shanten(tiles) == -1
    }

    /// `3n + 1` concealed tiles one tile from complete, with at least one
    /// wait the hand does not already hold four of.
    pub fn is_tenpai(&self, tiles: &[Tile]) -> bool {
        !self.waits(tiles).is_empty()
    }

    /// Tile kinds that complete `tiles` (`3n + 1` concealed tiles).
    pub fn waits(&self, tiles: &[Tile]) -> Vec<TileType> {
        if tiles.len() % 3 != 1 || self.oracle.shanten(tiles) > 0 {
            return Vec::new();
        }
        let counts = kind_counts(tiles);
        let mut probe = tiles.to_vec();
        probe.push(tiles[0]);
        let last = probe.len() - 1;
        TileType::all()
            .filter(|k| counts[k.index()] < 4)
            .filter(|&k| {
                probe[last] = Tile::from_kind(k, 3);
                self.oracle.shanten(&probe) == -1
            })
            .collect()
    }

    /// Assembles the request for `seat` winning on `win_tile`. `hand` must
    /// not contain the winning tile. Ura indicators are only passed for
    /// riichi winners.
    pub fn build_request(
        &self,
        seat: Seat,
        hand: &Hand,
        win_tile: Tile,
        context: WinContext,
        dora_indicators: Vec<Tile>,
        ura_indicators: Vec<Tile>,
    ) -> WinRequest {
        WinRequest {
            seat,
            concealed: hand.concealed().to_vec(),
            melds: hand.melds().to_vec(),
            win_tile,
            dora_indicators,
            ura_indicators: if context.riichi { ura_indicators } else { Vec::new() },
            context,
        }
    }

    pub fn evaluate(&self, request: &WinRequest) -> Result<HandValue, OracleError> {
        let value = self.oracle.hand_value(request)?;
        if value.han == 0 {
            return Err(OracleError::NoYaku);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::parse_tiles;

    fn tiles(s: &str) -> Vec<Tile> {
        parse_tiles(s).unwrap()
    }

    struct RefuseAll;

    impl ScoringOracle for RefuseAll {
        fn shanten(&self, tiles: &[Tile]) -> i8 {
            StandardOracle.shanten(tiles)
        }

        fn hand_value(&self, _: &WinRequest) -> Result<HandValue, OracleError> {
            Err(OracleError::NoYaku)
        }
    }

    #[test]
    fn waits_of_two_sided_hand() {
        let adapter = ScoringAdapter::default();
        let waits = adapter.waits(&tiles("123456789m23p99s"));
        let ids: Vec<u8> = waits.iter().map(|k| k.id()).collect();
        assert_eq!(ids, vec![9, 12]);
        assert!(adapter.is_tenpai(&tiles("123456789m23p99s")));
        assert!(!adapter.is_tenpai(&tiles("123456789m28p99s")));
    }

    #[test]
    fn four_held_is_no_wait() {
        let adapter = ScoringAdapter::default();
        // Only wait would be the fifth 1z.
        assert!(adapter.waits(&tiles("1111z")).is_empty());
    }

    #[test]
    fn complete_needs_3n_plus_2() {
        let adapter = ScoringAdapter::default();
        assert!(adapter.is_complete(&tiles("123456789m123p99s")));
        assert!(!adapter.is_complete(&tiles("123456789m123p9s")));
    }

    proptest::proptest! {
        #[test]
        fn every_wait_completes_the_hand(seed in 0u64..5000) {
            let adapter = ScoringAdapter::default();
            let ids = crate::seeding::shuffled_tile_ids(crate::seeding::seed_from_u64(seed));
            let hand: Vec<Tile> = ids[..13].iter().map(|&id| Tile::new(id).unwrap()).collect();
            for kind in adapter.waits(&hand) {
                let mut full = hand.clone();
                full.push(Tile::from_kind(kind, 3));
                proptest::prop_assert!(adapter.is_complete(&full), "{kind} does not complete");
            }
        }
    }

    #[test]
    fn custom_oracle_refusal_surfaces() {
        let adapter = ScoringAdapter::new(Arc::new(RefuseAll));
        let hand = Hand::new(tiles("123456789m23p99s"));
        let req = adapter.build_request(
            0,
            &hand,
            tiles("1p")[0],
            WinContext::default(),
            tiles("1z"),
            tiles("2z"),
        );
        assert!(req.ura_indicators.is_empty());
        assert_eq!(adapter.evaluate(&req), Err(OracleError::NoYaku));
    }
}
