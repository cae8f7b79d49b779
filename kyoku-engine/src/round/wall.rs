use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::errors::{EngineError, EngineResult};
use crate::seeding::shuffled_tile_ids;
use crate::tile::{Tile, NUM_TILES_136};

/// Tiles reserved in the dead wall.
pub const DEAD_WALL_SIZE: usize = 14;
/// Replacement tiles available for kans.
pub const MAX_KAN_REPLACEMENTS: u8 = 4;

const DEAD_START: usize = NUM_TILES_136 - DEAD_WALL_SIZE;
// Dead wall layout (offsets from DEAD_START):
//   0-3: rinshan (kan replacement) tiles
//   4 + 2i: dora indicator i (i = 0..5)
//   5 + 2i: ura dora indicator i
const RINSHAN_OFFSET: usize = 0;
const INDICATOR_OFFSET: usize = 4;

/// The live wall has run down to the dead wall.
///
/// Not an error condition for the round: it drives the exhaustive draw.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("wall exhausted")]
pub struct WallExhausted;

/// One round's wall: 136 tiles in draw order, the last 14 forming the dead
/// wall.
///
/// Every kan replacement moves the haitei boundary one tile towards the
/// front, so the dead wall always holds 14 tiles and
/// `live_remaining() + dead_count() + drawn_count() == 136`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wall {
    tiles: Vec<Tile>,
    next_live: usize,
    live_end: usize,
    rinshan_drawn: u8,
    dora_revealed: u8,
    digest: String,
}

impl Wall {
    /// Deterministically shuffled wall; equal seeds give equal walls.
    pub fn build(seed: [u8; 32]) -> Self {
        let ids = shuffled_tile_ids(seed);
        let tiles = ids.iter().filter_map(|&id| Tile::new(id)).collect();
        Self::with_order(tiles)
    }

    /// Wall in a fixed draw order. `tiles` must be a permutation of all 136
    /// physical tiles; the last 14 become the dead wall.
    pub fn from_tiles(tiles: Vec<Tile>) -> EngineResult<Self> {
        if tiles.len() != NUM_TILES_136 {
            return Err(EngineError::Config {
                message: format!("wall needs {NUM_TILES_136} tiles, got {}", tiles.len()),
            });
        }
        let mut seen = [false; NUM_TILES_136];
        for t in &tiles {
            if std::mem::replace(&mut seen[t.id() as usize], true) {
                return Err(EngineError::Config {
                    message: format!("tile {t:?} appears twice in wall"),
                });
            }
        }
        Ok(Self::with_order(tiles))
    }

    fn with_order(tiles: Vec<Tile>) -> Self {
        let mut hasher = Sha256::new();
        for t in &tiles {
            hasher.update([t.id()]);
        }
        let digest = format!("{:x}", hasher.finalize());
        Self {
            tiles,
            next_live: 0,
            live_end: DEAD_START,
            rinshan_drawn: 0,
            dora_revealed: 1,
            digest,
        }
    }

    /// Next live tile, or `WallExhausted` once only the dead wall remains.
    pub fn draw_live(&mut self) -> Result<Tile, WallExhausted> {
        if self.next_live >= self.live_end {
            return Err(WallExhausted);
        }
        let tile = self.tiles[self.next_live];
        self.next_live += 1;
        Ok(tile)
    }

    /// Kan replacement from the dead wall. Reveals the next kan-dora
    /// indicator and shifts the haitei boundary.
    pub fn draw_kan_replacement(&mut self) -> Result<Tile, WallExhausted> {
        if self.rinshan_drawn >= MAX_KAN_REPLACEMENTS || self.live_remaining() == 0 {
            return Err(WallExhausted);
        }
        let tile = self.tiles[DEAD_START + RINSHAN_OFFSET + self.rinshan_drawn as usize];
        self.rinshan_drawn += 1;
        self.live_end -= 1;
        self.dora_revealed += 1;
        Ok(tile)
    }

    /// Currently revealed dora indicators, oldest first.
    pub fn dora_indicators(&self) -> Vec<Tile> {
        (0..self.dora_revealed as usize)
            .map(|i| self.tiles[DEAD_START + INDICATOR_OFFSET + 2 * i])
            .collect()
    }

    /// Ura indicators under the revealed dora slots. Only consulted when
    /// scoring a riichi win.
    pub(crate) fn ura_indicators(&self) -> Vec<Tile> {
        (0..self.dora_revealed as usize)
            .map(|i| self.tiles[DEAD_START + INDICATOR_OFFSET + 2 * i + 1])
            .collect()
    }

    pub fn live_remaining(&self) -> usize {
        self.live_end - self.next_live
    }

    pub fn dead_count(&self) -> usize {
        DEAD_WALL_SIZE
    }

    /// Tiles that have left the wall (deals, draws and kan replacements).
    pub fn drawn_count(&self) -> usize {
        self.next_live + self.rinshan_drawn as usize
    }

    pub fn kan_replacements_drawn(&self) -> u8 {
        self.rinshan_drawn
    }

    /// SHA-256 of the full tile order, hex encoded.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub(crate) fn check_accounting(&self) -> EngineResult<()> {
        let total = self.live_remaining() + self.dead_count() + self.drawn_count();
        if total != NUM_TILES_136 {
            return Err(EngineError::invariant(format!(
                "wall accounting: live {} + dead {} + drawn {} = {total}",
                self.live_remaining(),
                self.dead_count(),
                self.drawn_count()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordered_wall() -> Wall {
        Wall::from_tiles(Tile::all().collect()).unwrap()
    }

    #[test]
    fn build_is_deterministic() {
        let a = Wall::build([9u8; 32]);
        let b = Wall::build([9u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a.digest(), Wall::build([10u8; 32]).digest());
    }

    #[test]
    fn live_draws_stop_at_dead_wall() {
        let mut wall = ordered_wall();
        let mut drawn = 0;
        while wall.draw_live().is_ok() {
            drawn += 1;
            assert!(wall.check_accounting().is_ok());
        }
        assert_eq!(drawn, 122);
        assert_eq!(wall.draw_live(), Err(WallExhausted));
        assert_eq!(wall.live_remaining(), 0);
        assert_eq!(wall.dead_count(), 14);
    }

    #[test]
    fn kan_replacement_reveals_and_shifts_haitei() {
        let mut wall = ordered_wall();
        assert_eq!(wall.dora_indicators(), vec![Tile::new(126).unwrap()]);
        let rinshan = wall.draw_kan_replacement().unwrap();
        assert_eq!(rinshan.id(), 122);
        assert_eq!(wall.dora_indicators().len(), 2);
        assert_eq!(wall.dora_indicators()[1].id(), 128);
        assert_eq!(wall.live_remaining(), 121);
        assert!(wall.check_accounting().is_ok());
        assert_eq!(wall.ura_indicators()[0].id(), 127);
    }

    #[test]
    fn at_most_four_replacements() {
        let mut wall = ordered_wall();
        for _ in 0..4 {
            assert!(wall.draw_kan_replacement().is_ok());
        }
        assert_eq!(wall.draw_kan_replacement(), Err(WallExhausted));
        assert_eq!(wall.dora_indicators().len(), 5);
        assert_eq!(wall.live_remaining(), 118);
    }

    #[test]
    fn replacement_needs_a_live_tile_to_shift() {
        let mut wall = ordered_wall();
        while wall.draw_live().is_ok() {}
        assert_eq!(wall.draw_kan_replacement(), Err(WallExhausted));
    }

    #[test]
    fn from_tiles_rejects_duplicates() {
        let mut tiles: Vec<Tile> = Tile::all().collect();
        tiles[5] = tiles[4];
        assert!(Wall::from_tiles(tiles).is_err());
        assert!(Wall::from_tiles(vec![]).is_err());
    }
}
