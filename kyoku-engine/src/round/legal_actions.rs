use crate::action::Action;
use crate::tile::{Tile, TileType};
use crate::types::{MeldKind, Seat};

use super::{RoundPhase, RoundState};

impl RoundState {
    /// Actions `seat` may take right now, in a fixed order.
    ///
    /// Own turn: Tsumo, Discard.., Riichi.., Ankan.., Kakan.., KyushuKyuhai.
    /// Responses: Ron, Daiminkan, Pon.., Chi.., Pass. Empty when the round is
    /// not waiting on `seat`.
    pub fn legal_actions(&self, seat: Seat) -> Vec<Action> {
        match &self.phase {
            RoundPhase::AwaitingDiscard { seat: actor } if *actor == seat => self.turn_actions(seat),
            RoundPhase::AwaitingCalls { pending, .. } | RoundPhase::AwaitingKanResponse { pending, .. }
                if pending.contains(&seat) =>
            {
                self.candidates[seat as usize].clone()
            }
            _ => Vec::new(),
        }
    }

    /// One representative tile per discard choice. Identical copies collapse
    /// into one; the drawn tile stands for its kind so tsumogiri stays
    /// expressible; a red five is its own choice.
    fn discard_choices(&self, seat: Seat) -> Vec<Tile> {
        let hand = &self.hands[seat as usize];
        let drawn = hand.drawn();
        let mut out: Vec<Tile> = Vec::new();
        for &t in hand.concealed() {
            if hand.kuikae.contains(&t.kind()) {
                continue;
            }
            let same = |o: &Tile| o.kind() == t.kind() && o.is_red() == t.is_red();
            let pick = match drawn {
                Some(d) if same(&d) => d,
                _ => t,
            };
            if !out.iter().any(same) {
                out.push(pick);
            }
        }
        out
    }

    fn turn_actions(&self, seat: Seat) -> Vec<Action> {
        let hand = &self.hands[seat as usize];
        let drawn = hand.drawn();
        let mut actions = Vec::new();

        if drawn.is_some() && !self.rejected[seat as usize] && self.adapter.is_complete(hand.concealed()) {
            actions.push(Action::Tsumo);
        }

        if hand.is_riichi() {
            if let Some(tile) = drawn {
                actions.push(Action::Discard { tile });
            }
        } else {
            let choices = self.discard_choices(seat);
            actions.extend(choices.iter().map(|&tile| Action::Discard { tile }));

            let can_riichi = hand.is_closed()
                && self.scores[seat as usize] >= self.rule.riichi_deposit
                && self.wall.live_remaining() >= 4;
            if can_riichi {
                for &tile in &choices {
                    if self.adapter.is_tenpai(&hand.without(tile)) {
                        actions.push(Action::Riichi { tile });
                    }
                }
            }
        }

        if drawn.is_some() && self.kan_available() {
            let counts = hand.counts();
            for kind in TileType::all().filter(|k| counts[k.index()] == 4) {
                if hand.is_riichi() && !self.riichi_kan_keeps_waits(seat, kind) {
                    continue;
                }
                let tiles = hand.tiles_of_kind(kind);
                actions.push(Action::Ankan {
                    tiles: [tiles[0], tiles[1], tiles[2], tiles[3]],
                });
            }
            if !hand.is_riichi() {
                for meld in hand.melds().iter().filter(|m| m.kind == MeldKind::Pon) {
                    if let Some(&tile) = hand.tiles_of_kind(meld.base_kind()).first() {
                        actions.push(Action::Kakan { tile });
                    }
                }
            }
        }

        if self.rule.kyushu_kyuhai
            && drawn.is_some()
            && self.uninterrupted
            && hand.discards().is_empty()
            && distinct_terminals_and_honors(hand.concealed()) >= 9
        {
            actions.push(Action::KyushuKyuhai);
        }

        actions
    }

    /// In riichi a closed kan must use the drawn tile and leave the waits as
    /// they were.
    fn riichi_kan_keeps_waits(&self, seat: Seat, kind: TileType) -> bool {
        let hand = &self.hands[seat as usize];
        let Some(drawn) = hand.drawn() else {
            return false;
        };
        if drawn.kind() != kind {
            return false;
        }
        let before = self.adapter.waits(&hand.without(drawn));
        let after: Vec<Tile> = hand.concealed().iter().copied().filter(|t| t.kind() != kind).collect();
        !before.is_empty() && before == self.adapter.waits(&after)
    }
}

fn distinct_terminals_and_honors(tiles: &[Tile]) -> usize {
    let mut kinds: Vec<TileType> = tiles
        .iter()
        .map(|t| t.kind())
        .filter(|k| k.is_terminal_or_honor())
        .collect();
    kinds.dedup();
    kinds.len()
}
