use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

/// How many rounds (kyoku) a match lasts before it can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameLength {
    /// One round only.
    Single,
    /// East round only (tonpuusen).
    East,
    /// East and south rounds (hanchan).
    Hanchan,
}

impl GameLength {
    pub fn rounds(self) -> u8 {
        match self {
            GameLength::Single => 1,
            GameLength::East => 4,
            GameLength::Hanchan => 8,
        }
    }
}

/// Resolution of simultaneous ron claims on one discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RonPolicy {
    /// Only the claimant closest to the discarder (clockwise) wins.
    HeadBump,
    /// Every claimant wins (double / triple ron).
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRule {
    pub length: GameLength,
    pub starting_score: i32,

    pub ron_policy: RonPolicy,
    /// Three simultaneous rons abort the round (sanchahou).
    pub triple_ron_is_draw: bool,

    /// Dealer keeps the seat after an exhaustive draw when tenpai.
    pub renchan_on_dealer_tenpai: bool,
    /// Dealer keeps the seat after an abortive draw.
    pub renchan_on_abortive_draw: bool,
    /// Total tenpai/noten payment moved on an exhaustive draw.
    pub noten_pool: i32,
    /// Riichi deposits stay on the table after an abortive draw; when false
    /// they are returned to their owners.
    pub riichi_sticks_carry_over_on_abort: bool,
    /// Bonus per honba on a win, split per the tsumo/ron rule.
    pub honba_bonus: u32,
    pub riichi_deposit: i32,
    /// A negative score ends the match (tobi).
    pub bust_ends_game: bool,
    /// Deposits left at match end go to the top player.
    pub leftover_sticks_to_top: bool,

    pub kuikae_forbidden: bool,
    pub aka_dora: bool,
    /// Tanyao counts on an open hand (kuitan).
    pub open_tanyao: bool,

    pub kyushu_kyuhai: bool,
    pub suufon_renda: bool,
    pub suucha_riichi: bool,
    pub suukan_sanra: bool,
}

impl Default for GameRule {
    fn default() -> Self {
        Self::default_tenhou()
    }
}

impl GameRule {
    pub fn default_tenhou() -> Self {
        Self {
            length: GameLength::Hanchan,
            starting_score: 25000,

            ron_policy: RonPolicy::Multiple,
            triple_ron_is_draw: true,

            renchan_on_dealer_tenpai: true,
            renchan_on_abortive_draw: true,
            noten_pool: 3000,
            riichi_sticks_carry_over_on_abort: true,
            honba_bonus: 300,
            riichi_deposit: 1000,
            bust_ends_game: true,
            leftover_sticks_to_top: true,

            kuikae_forbidden: true,
            aka_dora: true,
            open_tanyao: true,

            kyushu_kyuhai: true,
            suufon_renda: true,
            suucha_riichi: true,
            suukan_sanra: true,
        }
    }

    pub fn default_mjsoul() -> Self {
        Self {
            triple_ron_is_draw: false,
            ..Self::default_tenhou()
        }
    }

    /// Head-bump ruleset with no abortive draws, used by simpler
    /// self-play setups.
    pub fn default_head_bump() -> Self {
        Self {
            ron_policy: RonPolicy::HeadBump,
            triple_ron_is_draw: false,
            kyushu_kyuhai: false,
            suufon_renda: false,
            suucha_riichi: false,
            suukan_sanra: false,
            ..Self::default_tenhou()
        }
    }

    /// Parses a JSON rule document. Missing fields take the tenhou defaults.
    pub fn from_json(s: &str) -> EngineResult<Self> {
        let rule: GameRule = serde_json::from_str(s).map_err(|e| EngineError::Config {
            message: e.to_string(),
        })?;
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.starting_score <= 0 {
            return Err(EngineError::Config {
                message: format!("starting_score must be positive, got {}", self.starting_score),
            });
        }
        if self.noten_pool < 0 || self.noten_pool % 6 != 0 {
            return Err(EngineError::Config {
                message: format!("noten_pool must be a non-negative multiple of 6, got {}", self.noten_pool),
            });
        }
        // Tsumo splits the honba bonus three ways.
        if self.honba_bonus % 3 != 0 {
            return Err(EngineError::Config {
                message: format!("honba_bonus must be a multiple of 3, got {}", self.honba_bonus),
            });
        }
        if self.riichi_deposit <= 0 {
            return Err(EngineError::Config {
                message: format!("riichi_deposit must be positive, got {}", self.riichi_deposit),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_from_default() {
        let rule = GameRule::from_json(r#"{"ron_policy": "head_bump", "length": "east"}"#).unwrap();
        assert_eq!(rule.ron_policy, RonPolicy::HeadBump);
        assert_eq!(rule.length, GameLength::East);
        assert_eq!(rule.noten_pool, 3000);
        assert!(rule.kuikae_forbidden);
        assert!(rule.open_tanyao);
        assert!(!GameRule::from_json(r#"{"open_tanyao": false}"#).unwrap().open_tanyao);
    }

    #[test]
    fn invalid_documents_are_config_errors() {
        assert!(matches!(
            GameRule::from_json(r#"{"noten_pool": 1000}"#),
            Err(EngineError::Config { .. })
        ));
        assert!(matches!(
            GameRule::from_json(r#"{"honba_bonus": 100}"#),
            Err(EngineError::Config { .. })
        ));
        assert_eq!(GameRule::from_json(r#"{"honba_bonus": 150}"#).unwrap().honba_bonus, 150);
        assert!(matches!(
            GameRule::from_json("not json"),
            Err(EngineError::Config { .. })
        ));
    }

    #[test]
    fn presets_differ_only_where_intended() {
        let tenhou = GameRule::default_tenhou();
        let mjsoul = GameRule::default_mjsoul();
        assert!(tenhou.triple_ron_is_draw);
        assert!(!mjsoul.triple_ron_is_draw);
        assert_eq!(tenhou.length.rounds(), 8);
        assert_eq!(GameRule::default(), tenhou);
    }
}
