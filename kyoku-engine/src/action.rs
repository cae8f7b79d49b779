use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tile::Tile;

/// Where an action is legal: on the actor's own turn, or in response to
/// another player's discard / added kan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    WaitAct,
    WaitResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Discard,
    Chi,
    Pon,
    Daiminkan,
    Ron,
    Riichi,
    Tsumo,
    Pass,
    Ankan,
    Kakan,
    KyushuKyuhai,
}

impl ActionType {
    pub fn phase(self) -> Phase {
        match self {
            ActionType::Chi | ActionType::Pon | ActionType::Daiminkan | ActionType::Ron | ActionType::Pass => {
                Phase::WaitResponse
            }
            _ => Phase::WaitAct,
        }
    }

    /// Resolution priority among responses to one discard: ron beats kan and
    /// pon, which beat chi.
    pub fn call_priority(self) -> u8 {
        match self {
            ActionType::Ron => 3,
            ActionType::Daiminkan | ActionType::Pon => 2,
            ActionType::Chi => 1,
            _ => 0,
        }
    }
}

/// A player decision.
///
/// Tiles are physical tiles, so two actions that differ only in which copy
/// (e.g. a red five) is used are distinct choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Discard { tile: Tile },
    /// Declare riichi and discard `tile` in one step.
    Riichi { tile: Tile },
    Tsumo,
    Ankan { tiles: [Tile; 4] },
    /// Add `tile` to an existing pon.
    Kakan { tile: Tile },
    KyushuKyuhai,
    /// Hand tiles that join the claimed discard.
    Chi { consumed: [Tile; 2] },
    Pon { consumed: [Tile; 2] },
    Daiminkan { consumed: [Tile; 3] },
    Ron,
    Pass,
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Discard { .. } => ActionType::Discard,
            Action::Riichi { .. } => ActionType::Riichi,
            Action::Tsumo => ActionType::Tsumo,
            Action::Ankan { .. } => ActionType::Ankan,
            Action::Kakan { .. } => ActionType::Kakan,
            Action::KyushuKyuhai => ActionType::KyushuKyuhai,
            Action::Chi { .. } => ActionType::Chi,
            Action::Pon { .. } => ActionType::Pon,
            Action::Daiminkan { .. } => ActionType::Daiminkan,
            Action::Ron => ActionType::Ron,
            Action::Pass => ActionType::Pass,
        }
    }

    pub fn is_response(&self) -> bool {
        self.action_type().phase() == Phase::WaitResponse
    }

    /// Tiles leaving the concealed hand.
    pub fn consumed(&self) -> &[Tile] {
        match self {
            Action::Discard { tile } | Action::Riichi { tile } | Action::Kakan { tile } => std::slice::from_ref(tile),
            Action::Ankan { tiles } => tiles,
            Action::Chi { consumed } | Action::Pon { consumed } => consumed,
            Action::Daiminkan { consumed } => consumed,
            Action::Tsumo | Action::KyushuKyuhai | Action::Ron | Action::Pass => &[],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Discard { tile } => write!(f, "discard {tile}"),
            Action::Riichi { tile } => write!(f, "riichi {tile}"),
            Action::Tsumo => f.write_str("tsumo"),
            Action::Ankan { tiles } => write!(f, "ankan {}", tiles[0]),
            Action::Kakan { tile } => write!(f, "kakan {tile}"),
            Action::KyushuKyuhai => f.write_str("kyushu_kyuhai"),
            Action::Chi { consumed } => write!(f, "chi {}{}", consumed[0], consumed[1]),
            Action::Pon { consumed } => write!(f, "pon {}", consumed[0]),
            Action::Daiminkan { consumed } => write!(f, "daiminkan {}", consumed[0]),
            Action::Ron => f.write_str("ron"),
            Action::Pass => f.write_str("pass"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::parse_tiles;

    #[test]
    fn priorities() {
        assert!(ActionType::Ron.call_priority() > ActionType::Pon.call_priority());
        assert_eq!(ActionType::Pon.call_priority(), ActionType::Daiminkan.call_priority());
        assert!(ActionType::Pon.call_priority() > ActionType::Chi.call_priority());
    }

    #[test]
    fn json_is_tagged() {
        let t = parse_tiles("5m").unwrap()[0];
        let json = serde_json::to_string(&Action::Discard { tile: t }).unwrap();
        assert_eq!(json, format!(r#"{{"type":"discard","tile":{}}}"#, t.id()));
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Action::Discard { tile: t });
        assert_eq!(serde_json::to_string(&Action::Pass).unwrap(), r#"{"type":"pass"}"#);
    }

    #[test]
    fn consumed_tiles_and_phase() {
        let tiles = parse_tiles("34m").unwrap();
        let chi = Action::Chi {
            consumed: [tiles[0], tiles[1]],
        };
        assert_eq!(chi.consumed().len(), 2);
        assert!(chi.is_response());
        assert!(!Action::Tsumo.is_response());
        assert!(Action::Tsumo.consumed().is_empty());
        assert_eq!(chi.to_string(), "chi 3m4m");
    }
}
