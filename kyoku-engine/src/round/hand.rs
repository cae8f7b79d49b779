use serde::{Deserialize, Serialize};

use crate::tile::{kind_counts, Tile, TileType, NUM_TILE_TYPES};
use crate::types::Meld;

/// One entry in a player's discard pile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardEntry {
    pub tile: Tile,
    /// The tile discarded was the one just drawn.
    pub tsumogiri: bool,
    /// This discard declared riichi.
    pub riichi: bool,
    /// Claimed by another player; it no longer lies in the pond.
    pub called: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiichiInfo {
    /// Round turn counter at the declaring discard.
    pub turn: u32,
    pub double: bool,
    /// The declaring discard passed without a ron and the deposit was paid.
    pub accepted: bool,
}

/// A player's tiles and per-round flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    concealed: Vec<Tile>,
    melds: Vec<Meld>,
    discards: Vec<DiscardEntry>,
    riichi: Option<RiichiInfo>,
    pub(crate) ippatsu: bool,
    /// Last tile drawn by this player, while it is still in the hand.
    pub(crate) drawn: Option<Tile>,
    /// Passed a winning tile since the last own discard.
    pub(crate) temporary_furiten: bool,
    /// Passed a winning tile while in riichi; lasts for the round.
    pub(crate) riichi_furiten: bool,
    /// Kinds that may not be discarded this turn (kuikae).
    pub(crate) kuikae: Vec<TileType>,
}

impl Hand {
    pub fn new(mut tiles: Vec<Tile>) -> Self {
        tiles.sort();
        Self {
            concealed: tiles,
            ..Self::default()
        }
    }

    pub fn concealed(&self) -> &[Tile] {
        &self.concealed
    }

    pub fn melds(&self) -> &[Meld] {
        &self.melds
    }

    pub fn discards(&self) -> &[DiscardEntry] {
        &self.discards
    }

    pub fn riichi(&self) -> Option<&RiichiInfo> {
        self.riichi.as_ref()
    }

    pub fn is_riichi(&self) -> bool {
        self.riichi.is_some()
    }

    pub fn ippatsu(&self) -> bool {
        self.ippatsu
    }

    pub fn drawn(&self) -> Option<Tile> {
        self.drawn
    }

    /// No meld other than closed kans.
    pub fn is_closed(&self) -> bool {
        self.melds.iter().all(|m| !m.is_open())
    }

    /// Concealed tiles plus three per meld: 13 at rest, 14 while the
    /// player owes a discard.
    pub fn size_units(&self) -> usize {
        self.concealed.len() + 3 * self.melds.len()
    }

    /// Physical tiles held, including the fourth tile of each kan.
    pub fn tile_count(&self) -> usize {
        self.concealed.len() + self.melds.iter().map(|m| m.tiles.len()).sum::<usize>()
    }

    pub fn counts(&self) -> [u8; NUM_TILE_TYPES] {
        kind_counts(&self.concealed)
    }

    pub fn count_kind(&self, kind: TileType) -> usize {
        self.concealed.iter().filter(|t| t.kind() == kind).count()
    }

    pub fn contains(&self, tile: Tile) -> bool {
        self.concealed.binary_search(&tile).is_ok()
    }

    /// Kinds this player has ever discarded, called or not.
    pub fn discarded_kind(&self, kind: TileType) -> bool {
        self.discards.iter().any(|d| d.tile.kind() == kind)
    }

    pub fn is_furiten(&self, waits: &[TileType]) -> bool {
        self.temporary_furiten || self.riichi_furiten || waits.iter().any(|&k| self.discarded_kind(k))
    }

    pub(crate) fn add(&mut self, tile: Tile) {
        let pos = self.concealed.binary_search(&tile).unwrap_or_else(|p| p);
        self.concealed.insert(pos, tile);
    }

    pub(crate) fn remove(&mut self, tile: Tile) -> bool {
        match self.concealed.binary_search(&tile) {
            Ok(pos) => {
                self.concealed.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Concealed copies of `kind`, lowest id first.
    pub fn tiles_of_kind(&self, kind: TileType) -> Vec<Tile> {
        self.concealed.iter().copied().filter(|t| t.kind() == kind).collect()
    }

    /// Concealed tiles without `tile`.
    pub fn without(&self, tile: Tile) -> Vec<Tile> {
        let mut rest = self.concealed.clone();
        if let Ok(pos) = rest.binary_search(&tile) {
            rest.remove(pos);
        }
        rest
    }

    pub(crate) fn push_meld(&mut self, meld: Meld) {
        self.melds.push(meld);
    }

    pub(crate) fn melds_mut(&mut self) -> &mut Vec<Meld> {
        &mut self.melds
    }

    pub(crate) fn push_discard(&mut self, entry: DiscardEntry) {
        self.discards.push(entry);
    }

    pub(crate) fn mark_last_discard_called(&mut self) {
        if let Some(last) = self.discards.last_mut() {
            last.called = true;
        }
    }

    pub(crate) fn declare_riichi(&mut self, turn: u32, double: bool) {
        self.riichi = Some(RiichiInfo {
            turn,
            double,
            accepted: false,
        });
    }

    pub(crate) fn accept_riichi(&mut self) {
        if let Some(info) = self.riichi.as_mut() {
            info.accepted = true;
        }
        self.ippatsu = true;
    }
}
