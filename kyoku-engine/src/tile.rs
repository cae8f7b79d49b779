//! Tile representation.
//!
//! Physical tiles are identified by a 136-format id (`kind * 4 + copy`), which
//! distinguishes the four copies of each of the 34 kinds. The 0th copy of each
//! suited five is the red five (aka-dora).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Total number of distinct tile kinds (0-33).
pub const NUM_TILE_TYPES: usize = 34;

/// Number of tiles per suited category (1-9).
pub const NUM_SUIT_TILES: usize = 9;

/// Total physical tiles in a standard mahjong set.
pub const NUM_TILES_136: usize = 136;

// Suit range starts (tile type indices).
pub const MANZU_START: u8 = 0;
pub const PINZU_START: u8 = 9;
pub const SOUZU_START: u8 = 18;
pub const JIHAI_START: u8 = 27;

// Named honor tile indices for readability.
pub const EAST: u8 = 27;
pub const SOUTH: u8 = 28;
pub const WEST: u8 = 29;
pub const NORTH: u8 = 30;
pub const HAKU: u8 = 31;
pub const HATSU: u8 = 32;
pub const CHUN: u8 = 33;

/// Red 5m in 136-format. The 0th copy of tile type 4 (5m) is red.
pub const AKA_MANZU_136: u8 = 16;
/// Red 5p in 136-format. The 0th copy of tile type 13 (5p) is red.
pub const AKA_PINZU_136: u8 = 52;
/// Red 5s in 136-format. The 0th copy of tile type 22 (5s) is red.
pub const AKA_SOUZU_136: u8 = 88;

/// Terminal and honor kinds, in kokushi order.
pub const YAOCHUU: [u8; 13] = [0, 8, 9, 17, 18, 26, 27, 28, 29, 30, 31, 32, 33];

// ---------------------------------------------------------------------------
// Suit
// ---------------------------------------------------------------------------

/// The four tile categories in Riichi Mahjong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suit {
    Manzu = 0,
    Pinzu = 1,
    Souzu = 2,
    Jihai = 3,
}

impl Suit {
    /// Returns the starting tile type index for this suit.
    #[inline]
    pub const fn start(self) -> u8 {
        match self {
            Suit::Manzu => MANZU_START,
            Suit::Pinzu => PINZU_START,
            Suit::Souzu => SOUZU_START,
            Suit::Jihai => JIHAI_START,
        }
    }
}

// ---------------------------------------------------------------------------
// TileType newtype
// ---------------------------------------------------------------------------

/// A tile kind in the range 0-33. Wraps a `u8` for type safety.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TileType(u8);

impl TryFrom<u8> for TileType {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        TileType::new(id).ok_or_else(|| format!("tile kind {id} out of range"))
    }
}

impl From<TileType> for u8 {
    fn from(kind: TileType) -> u8 {
        kind.0
    }
}

impl TileType {
    /// Creates a `TileType` if `id` is in range 0..34.
    #[inline]
    pub const fn new(id: u8) -> Option<Self> {
        if id < NUM_TILE_TYPES as u8 {
            Some(TileType(id))
        } else {
            None
        }
    }

    /// Caller guarantees `id < 34`.
    #[inline]
    pub(crate) const fn from_index(id: u8) -> Self {
        debug_assert!(id < NUM_TILE_TYPES as u8);
        TileType(id)
    }

    /// All 34 kinds in id order.
    pub fn all() -> impl Iterator<Item = TileType> {
        (0..NUM_TILE_TYPES as u8).map(TileType)
    }

    /// Raw numeric id (0-33).
    #[inline]
    pub const fn id(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Which suit this tile belongs to.
    #[inline]
    pub const fn suit(self) -> Suit {
        match self.0 {
            0..9 => Suit::Manzu,
            9..18 => Suit::Pinzu,
            18..27 => Suit::Souzu,
            _ => Suit::Jihai,
        }
    }

    /// 1-based rank within the suit (1-9); honors are ranked 1-7
    /// (E S W N, haku hatsu chun).
    #[inline]
    pub const fn rank(self) -> u8 {
        if self.0 < JIHAI_START {
            (self.0 % NUM_SUIT_TILES as u8) + 1
        } else {
            self.0 - JIHAI_START + 1
        }
    }

    /// True for 1 or 9 of any suit.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        if self.0 >= JIHAI_START {
            return false;
        }
        let num = self.0 % NUM_SUIT_TILES as u8;
        num == 0 || num == 8
    }

    /// True for wind or dragon tiles (indices 27-33).
    #[inline]
    pub const fn is_honor(self) -> bool {
        self.0 >= JIHAI_START
    }

    #[inline]
    pub const fn is_wind(self) -> bool {
        self.0 >= EAST && self.0 <= NORTH
    }

    #[inline]
    pub const fn is_dragon(self) -> bool {
        self.0 >= HAKU
    }

    /// True for terminals or honors (yaochuuhai).
    #[inline]
    pub const fn is_terminal_or_honor(self) -> bool {
        self.is_terminal() || self.is_honor()
    }

    #[inline]
    pub const fn is_suited(self) -> bool {
        self.0 < JIHAI_START
    }

    /// The kind a dora indicator of this kind points at.
    /// Suits wrap 9 -> 1, winds E->S->W->N->E, dragons haku->hatsu->chun->haku.
    #[inline]
    pub const fn dora_successor(self) -> TileType {
        let t = self.0;
        let next = if t < JIHAI_START {
            let base = t - t % NUM_SUIT_TILES as u8;
            base + (t % NUM_SUIT_TILES as u8 + 1) % NUM_SUIT_TILES as u8
        } else if t <= NORTH {
            EAST + (t - EAST + 1) % 4
        } else {
            HAKU + (t - HAKU + 1) % 3
        };
        TileType(next)
    }

    /// Same-suit neighbour at `offset`, or `None` when it leaves the suit.
    #[inline]
    pub const fn offset(self, offset: i8) -> Option<TileType> {
        if !self.is_suited() {
            return None;
        }
        let num = (self.0 % NUM_SUIT_TILES as u8) as i8 + offset;
        if num < 0 || num >= NUM_SUIT_TILES as i8 {
            return None;
        }
        Some(TileType((self.0 as i8 + offset) as u8))
    }
}

impl fmt::Debug for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileType({}={})", self.0, tile_type_name(self.0))
    }
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(tile_type_name(self.0))
    }
}

// ---------------------------------------------------------------------------
// Tile (physical instance)
// ---------------------------------------------------------------------------

/// One physical tile, 136-format id (0-135).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Tile(u8);

impl TryFrom<u8> for Tile {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Tile::new(id).ok_or_else(|| format!("tile id {id} out of range"))
    }
}

impl From<Tile> for u8 {
    fn from(tile: Tile) -> u8 {
        tile.0
    }
}

impl Tile {
    #[inline]
    pub const fn new(id: u8) -> Option<Self> {
        if (id as usize) < NUM_TILES_136 {
            Some(Tile(id))
        } else {
            None
        }
    }

    /// Physical tile for `kind` and `copy` (0-3).
    #[inline]
    pub const fn from_kind(kind: TileType, copy: u8) -> Tile {
        Tile(kind.0 * 4 + (copy & 3))
    }

    #[inline]
    pub const fn id(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn kind(self) -> TileType {
        // Each tile type has 4 copies: type = tile136 / 4
        TileType(self.0 / 4)
    }

    #[inline]
    pub const fn copy(self) -> u8 {
        self.0 % 4
    }

    #[inline]
    pub const fn suit(self) -> Suit {
        self.kind().suit()
    }

    #[inline]
    pub const fn rank(self) -> u8 {
        self.kind().rank()
    }

    /// Returns `true` for the red fives (16 = 5m, 52 = 5p, 88 = 5s).
    #[inline]
    pub const fn is_red(self) -> bool {
        matches!(self.0, AKA_MANZU_136 | AKA_PINZU_136 | AKA_SOUZU_136)
    }

    /// All 136 physical tiles in id order.
    pub fn all() -> impl Iterator<Item = Tile> {
        (0..NUM_TILES_136 as u8).map(Tile)
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tile({}={})", self.0, self)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_red() {
            // "0m" style for red fives
            let suit = &tile_type_name(self.kind().id())[1..];
            write!(f, "0{suit}")
        } else {
            f.write_str(tile_type_name(self.kind().id()))
        }
    }
}

/// Histogram of tile kinds.
pub fn kind_counts(tiles: &[Tile]) -> [u8; NUM_TILE_TYPES] {
    let mut counts = [0u8; NUM_TILE_TYPES];
    for t in tiles {
        counts[t.kind().index()] += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

const TILE_NAMES: [&str; NUM_TILE_TYPES] = [
    "1m", "2m", "3m", "4m", "5m", "6m", "7m", "8m", "9m", "1p", "2p", "3p", "4p", "5p", "6p", "7p",
    "8p", "9p", "1s", "2s", "3s", "4s", "5s", "6s", "7s", "8s", "9s", "E", "S", "W", "N", "P", "F",
    "C",
];

/// Short name for a tile kind (0-33). Out-of-range values return "??".
#[inline]
pub fn tile_type_name(tile_type: u8) -> &'static str {
    TILE_NAMES.get(tile_type as usize).copied().unwrap_or("??")
}

/// Parses a compact hand string such as `"123m456p789s11z"` into physical
/// tiles, using the lowest unused copy of each kind. `0` denotes a red five.
/// Honors use `z` with ranks 1-7.
pub fn parse_tiles(s: &str) -> Option<Vec<Tile>> {
    let mut used = [0u8; NUM_TILE_TYPES];
    let mut out = Vec::new();
    let mut pending: Vec<u8> = Vec::new();
    for c in s.chars() {
        match c {
            '0'..='9' => pending.push(c as u8 - b'0'),
            'm' | 'p' | 's' | 'z' => {
                let base = match c {
                    'm' => MANZU_START,
                    'p' => PINZU_START,
                    's' => SOUZU_START,
                    _ => JIHAI_START,
                };
                for &d in &pending {
                    let (rank, red) = if d == 0 { (5, true) } else { (d, false) };
                    if c == 'z' && (red || rank > 7) {
                        return None;
                    }
                    let kind = TileType::new(base + rank - 1)?;
                    let tile = if red {
                        if used[kind.index()] & 1 != 0 {
                            return None;
                        }
                        used[kind.index()] |= 1;
                        Tile::from_kind(kind, 0)
                    } else {
                        // copy 0 of a suited five is reserved for the red tile
                        let start = if kind.is_suited() && kind.rank() == 5 { 1 } else { 0 };
                        let copy = (start..4).find(|&c| used[kind.index()] & (1 << c) == 0)?;
                        used[kind.index()] |= 1 << copy;
                        Tile::from_kind(kind, copy)
                    };
                    out.push(tile);
                }
                pending.clear();
            }
            ' ' => {}
            _ => return None,
        }
    }
    if pending.is_empty() {
        Some(out)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_type_new_valid() {
        for i in 0..34u8 {
            assert!(TileType::new(i).is_some(), "TileType::new({i}) should be Some");
        }
        assert!(TileType::new(34).is_none());
        assert!(Tile::new(136).is_none());
        assert!(Tile::new(135).is_some());
    }

    #[test]
    fn suit_and_rank() {
        let t = Tile::new(4 * 4 + 2).unwrap(); // 5m copy 2
        assert_eq!(t.suit(), Suit::Manzu);
        assert_eq!(t.rank(), 5);
        assert_eq!(t.copy(), 2);
        let chun = Tile::from_kind(TileType::new(CHUN).unwrap(), 3);
        assert_eq!(chun.suit(), Suit::Jihai);
        assert_eq!(chun.rank(), 7);
    }

    #[test]
    fn terminal_detection() {
        for &i in &[0u8, 8, 9, 17, 18, 26] {
            let t = TileType::new(i).unwrap();
            assert!(t.is_terminal(), "tile {i} should be terminal");
            assert!(t.is_terminal_or_honor());
        }
        for &i in &[1u8, 4, 10, 14, 19, 23] {
            assert!(!TileType::new(i).unwrap().is_terminal());
        }
        for i in 27..34u8 {
            let t = TileType::new(i).unwrap();
            assert!(!t.is_terminal());
            assert!(t.is_terminal_or_honor());
        }
    }

    #[test]
    fn red_fives() {
        assert!(Tile::new(16).unwrap().is_red());
        assert!(Tile::new(52).unwrap().is_red());
        assert!(Tile::new(88).unwrap().is_red());
        assert!(!Tile::new(17).unwrap().is_red());
        assert_eq!(Tile::all().filter(|t| t.is_red()).count(), 3);
    }

    #[test]
    fn dora_wrapping() {
        let succ = |t: u8| TileType::new(t).unwrap().dora_successor().id();
        assert_eq!(succ(0), 1); // 1m -> 2m
        assert_eq!(succ(8), 0); // 9m -> 1m
        assert_eq!(succ(17), 9); // 9p -> 1p
        assert_eq!(succ(27), 28); // E -> S
        assert_eq!(succ(30), 27); // N -> E
        assert_eq!(succ(31), 32); // haku -> hatsu
        assert_eq!(succ(33), 31); // chun -> haku
    }

    #[test]
    fn offset_stays_in_suit() {
        let t = TileType::new(8).unwrap(); // 9m
        assert!(t.offset(1).is_none());
        assert_eq!(t.offset(-2).unwrap().id(), 6);
        assert!(TileType::new(EAST).unwrap().offset(1).is_none());
    }

    #[test]
    fn parse_compact_strings() {
        let tiles = parse_tiles("123m055p1z").unwrap();
        assert_eq!(tiles.len(), 7);
        assert!(tiles[3].is_red());
        assert!(!tiles[4].is_red());
        assert_eq!(tiles[6].kind().id(), EAST);
        assert!(parse_tiles("8z").is_none());
        assert!(parse_tiles("11111m").is_none());
        assert!(parse_tiles("12").is_none());
    }

    #[test]
    fn display_names() {
        assert_eq!(format!("{}", TileType::new(0).unwrap()), "1m");
        assert_eq!(format!("{}", TileType::new(33).unwrap()), "C");
        assert_eq!(format!("{}", Tile::new(16).unwrap()), "0m");
        assert_eq!(tile_type_name(99), "??");
    }
}
