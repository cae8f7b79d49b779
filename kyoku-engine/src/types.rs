use serde::{Deserialize, Serialize};

use crate::tile::{Tile, TileType, EAST};

/// Seat index 0-3, fixed for the whole match.
pub type Seat = u8;

pub const NUM_PLAYERS: usize = 4;

/// Seat after `seat` in turn order (counter-clockwise on the table, "next").
#[inline]
pub const fn next_seat(seat: Seat) -> Seat {
    (seat + 1) % NUM_PLAYERS as u8
}

/// Turn-order distance from `from` to `to` (1 = next player, 3 = previous).
#[inline]
pub const fn seat_distance(from: Seat, to: Seat) -> u8 {
    (to + NUM_PLAYERS as u8 - from) % NUM_PLAYERS as u8
}

/// Wind directions, used for seat winds and the round wind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wind {
    #[default]
    East = 0,
    South = 1,
    West = 2,
    North = 3,
}

impl From<u8> for Wind {
    fn from(val: u8) -> Self {
        match val % 4 {
            0 => Wind::East,
            1 => Wind::South,
            2 => Wind::West,
            _ => Wind::North,
        }
    }
}

impl Wind {
    /// Seat wind of `seat` when `dealer` is east.
    pub fn of_seat(seat: Seat, dealer: Seat) -> Wind {
        Wind::from(seat_distance(dealer, seat))
    }

    /// The honor tile kind for this wind.
    pub fn tile_type(self) -> TileType {
        TileType::from_index(EAST + self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeldKind {
    Chi,
    Pon,
    /// Daiminkan: kan called on a discard.
    OpenKan,
    /// Ankan: four concealed tiles.
    ClosedKan,
    /// Kakan / shouminkan: a pon upgraded with the fourth tile.
    AddedKan,
}

impl MeldKind {
    pub fn is_kan(self) -> bool {
        matches!(self, MeldKind::OpenKan | MeldKind::ClosedKan | MeldKind::AddedKan)
    }

    /// Everything except a closed kan opens the hand.
    pub fn is_open(self) -> bool {
        !matches!(self, MeldKind::ClosedKan)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meld {
    pub kind: MeldKind,
    /// All tiles in the meld, sorted by id.
    pub tiles: Vec<Tile>,
    pub caller: Seat,
    /// Discarder the tile was claimed from (chi, pon, open kan; kept when a
    /// pon is upgraded).
    pub from: Option<Seat>,
    /// The claimed discard, or the added tile for an added kan.
    pub called_tile: Option<Tile>,
    /// Round turn counter at which the meld was formed.
    pub turn: u32,
}

impl Meld {
    pub fn new(
        kind: MeldKind,
        mut tiles: Vec<Tile>,
        caller: Seat,
        from: Option<Seat>,
        called_tile: Option<Tile>,
        turn: u32,
    ) -> Self {
        tiles.sort();
        Self {
            kind,
            tiles,
            caller,
            from,
            called_tile,
            turn,
        }
    }

    /// Lowest tile kind in the meld (the run start for chi).
    pub fn base_kind(&self) -> TileType {
        self.tiles
            .iter()
            .map(|t| t.kind())
            .min()
            .unwrap_or_else(|| unreachable!("melds are never empty"))
    }

    pub fn is_open(&self) -> bool {
        self.kind.is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_arithmetic() {
        assert_eq!(next_seat(3), 0);
        assert_eq!(seat_distance(1, 2), 1);
        assert_eq!(seat_distance(1, 0), 3);
        assert_eq!(seat_distance(2, 2), 0);
    }

    #[test]
    fn seat_winds_rotate_with_dealer() {
        assert_eq!(Wind::of_seat(2, 2), Wind::East);
        assert_eq!(Wind::of_seat(3, 2), Wind::South);
        assert_eq!(Wind::of_seat(1, 2), Wind::North);
        assert_eq!(Wind::South.tile_type().id(), 28);
    }

    #[test]
    fn meld_kinds() {
        assert!(MeldKind::AddedKan.is_kan());
        assert!(!MeldKind::Pon.is_kan());
        assert!(!MeldKind::ClosedKan.is_open());
        assert!(MeldKind::Chi.is_open());
    }
}
