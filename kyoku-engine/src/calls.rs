//! Response enumeration and priority resolution for a discard.

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionType};
use crate::round::hand::Hand;
use crate::rule::{GameRule, RonPolicy};
use crate::tile::{Tile, TileType};
use crate::types::{next_seat, seat_distance, Seat, NUM_PLAYERS};

/// What may be claimed on the current discard.
#[derive(Debug, Clone, Copy)]
pub struct CallWindow {
    pub discarder: Seat,
    pub tile: Tile,
    /// Chi/pon are allowed (the discard is not the last tile).
    pub calls_allowed: bool,
    /// An open kan has a replacement tile and kan slot available.
    pub kan_allowed: bool,
    pub kuikae_forbidden: bool,
}

/// Outcome of a call window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Winners, nearest to the discarder first.
    Ron(Vec<Seat>),
    Call { seat: Seat, action: Action },
    /// Three players declared ron and the rule makes that a draw.
    TripleRon,
    None,
}

/// Kinds that may not be discarded right after a call.
pub fn kuikae_kinds(called: Tile, consumed: &[Tile], chi: bool) -> Vec<TileType> {
    let c = called.kind();
    let mut kinds = vec![c];
    if chi && consumed.len() == 2 {
        let (a, b) = {
            let (x, y) = (consumed[0].kind(), consumed[1].kind());
            if x < y {
                (x, y)
            } else {
                (y, x)
            }
        };
        // c a b: the kind above the run swaps in the same wait.
        if c < a {
            if let Some(k) = b.offset(1).filter(|k| k.suit() == c.suit()) {
                kinds.push(k);
            }
        } else if c > b {
            if let Some(k) = a.offset(-1).filter(|k| k.suit() == c.suit()) {
                kinds.push(k);
            }
        }
    }
    kinds
}

/// The hand must keep something it may discard after the call.
fn leaves_discard(hand: &Hand, consumed: &[Tile], forbidden: &[TileType]) -> bool {
    let mut rest = hand.concealed().to_vec();
    for t in consumed {
        if let Some(pos) = rest.iter().position(|x| x == t) {
            rest.remove(pos);
        }
    }
    rest.iter().any(|t| !forbidden.contains(&t.kind()))
}

/// Distinct physical pairs for a pon (a red five makes a separate choice).
pub fn pon_options(hand: &Hand, tile: Tile) -> Vec<[Tile; 2]> {
    let same = hand.tiles_of_kind(tile.kind());
    let mut out: Vec<[Tile; 2]> = Vec::new();
    for i in 0..same.len() {
        for j in i + 1..same.len() {
            let pair = [same[i], same[j]];
            let key = (pair[0].is_red() || pair[1].is_red(), pair[0].kind());
            if !out.iter().any(|p| (p[0].is_red() || p[1].is_red(), p[0].kind()) == key) {
                out.push(pair);
            }
        }
    }
    out
}

pub fn daiminkan_option(hand: &Hand, tile: Tile) -> Option<[Tile; 3]> {
    let same = hand.tiles_of_kind(tile.kind());
    (same.len() == 3).then(|| [same[0], same[1], same[2]])
}

/// Chi pairs for `tile`, one per run shape and red/non-red choice.
pub fn chi_options(hand: &Hand, tile: Tile) -> Vec<[Tile; 2]> {
    let kind = tile.kind();
    if !kind.is_suited() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for (da, db) in [(-2i8, -1i8), (-1, 1), (1, 2)] {
        let (Some(ka), Some(kb)) = (kind.offset(da), kind.offset(db)) else {
            continue;
        };
        if ka.suit() != kind.suit() || kb.suit() != kind.suit() {
            continue;
        }
        let ta = hand.tiles_of_kind(ka);
        let tb = hand.tiles_of_kind(kb);
        let mut seen: Vec<(bool, bool)> = Vec::new();
        for &a in &ta {
            for &b in &tb {
                let key = (a.is_red(), b.is_red());
                if !seen.contains(&key) {
                    seen.push(key);
                    out.push([a, b]);
                }
            }
        }
    }
    out
}

/// Non-ron responses `seat` may make to the window, in Daiminkan, Pon,
/// Chi order. Riichi hands may only win or pass.
pub fn claim_options(hand: &Hand, seat: Seat, window: &CallWindow) -> Vec<Action> {
    let mut out = Vec::new();
    if seat == window.discarder || hand.is_riichi() || !window.calls_allowed {
        return out;
    }
    if window.kan_allowed {
        if let Some(consumed) = daiminkan_option(hand, window.tile) {
            out.push(Action::Daiminkan { consumed });
        }
    }
    for consumed in pon_options(hand, window.tile) {
        let forbidden = if window.kuikae_forbidden {
            kuikae_kinds(window.tile, &consumed, false)
        } else {
            Vec::new()
        };
        if leaves_discard(hand, &consumed, &forbidden) {
            out.push(Action::Pon { consumed });
        }
    }
    if seat == next_seat(window.discarder) {
        for consumed in chi_options(hand, window.tile) {
            let forbidden = if window.kuikae_forbidden {
                kuikae_kinds(window.tile, &consumed, true)
            } else {
                Vec::new()
            };
            if leaves_discard(hand, &consumed, &forbidden) {
                out.push(Action::Chi { consumed });
            }
        }
    }
    out
}

/// Per-seat responses, each list in Ron, Daiminkan, Pon, Chi, Pass order
/// and empty for seats with nothing to claim. `can_ron[s]` is decided by
/// the caller (shape plus furiten).
pub fn call_candidates(hands: &[Hand; NUM_PLAYERS], can_ron: [bool; NUM_PLAYERS], window: &CallWindow) -> [Vec<Action>; NUM_PLAYERS] {
    std::array::from_fn(|s| {
        let seat = s as Seat;
        if seat == window.discarder {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if can_ron[s] {
            actions.push(Action::Ron);
        }
        actions.extend(claim_options(&hands[s], seat, window));
        if !actions.is_empty() {
            actions.push(Action::Pass);
        }
        actions
    })
}

/// Picks the winning response(s). Ron beats kan/pon beats chi; equal
/// priority goes to the seat nearest the discarder in turn order.
pub fn resolve(responses: &[(Seat, Action)], discarder: Seat, rule: &GameRule) -> Resolution {
    let mut rons: Vec<Seat> = responses
        .iter()
        .filter(|(_, a)| *a == Action::Ron)
        .map(|(s, _)| *s)
        .collect();
    rons.sort_by_key(|&s| seat_distance(discarder, s));
    rons.dedup();
    if !rons.is_empty() {
        return match rule.ron_policy {
            RonPolicy::HeadBump => Resolution::Ron(vec![rons[0]]),
            RonPolicy::Multiple if rons.len() == 3 && rule.triple_ron_is_draw => Resolution::TripleRon,
            RonPolicy::Multiple => Resolution::Ron(rons),
        };
    }
    responses
        .iter()
        .filter(|(_, a)| a.action_type().call_priority() > 0 && a.action_type() != ActionType::Ron)
        .max_by_key(|(s, a)| {
            (
                a.action_type().call_priority(),
                std::cmp::Reverse(seat_distance(discarder, *s)),
            )
        })
        .map_or(Resolution::None, |&(seat, action)| Resolution::Call { seat, action })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::parse_tiles;

    fn t(s: &str) -> Tile {
        parse_tiles(s).unwrap()[0]
    }

    fn window(discarder: Seat, tile: Tile) -> CallWindow {
        CallWindow {
            discarder,
            tile,
            calls_allowed: true,
            kan_allowed: true,
            kuikae_forbidden: true,
        }
    }

    #[test]
    fn pon_beats_chi_regardless_of_distance() {
        let pon = Action::Pon {
            consumed: [t("5p"), t("5p")],
        };
        let chi = Action::Chi {
            consumed: [t("4p"), t("6p")],
        };
        let rule = GameRule::default();
        // Seat 1 (next) chis, seat 3 (furthest) pons.
        let res = resolve(&[(1, chi), (3, pon)], 0, &rule);
        assert_eq!(res, Resolution::Call { seat: 3, action: pon });
    }

    #[test]
    fn ron_ties_by_proximity() {
        let rule = GameRule::default_head_bump();
        let res = resolve(&[(1, Action::Ron), (3, Action::Ron)], 2, &rule);
        assert_eq!(res, Resolution::Ron(vec![3]));

        let rule = GameRule::default_mjsoul();
        let res = resolve(&[(1, Action::Ron), (3, Action::Ron)], 2, &rule);
        assert_eq!(res, Resolution::Ron(vec![3, 1]));
    }

    #[test]
    fn triple_ron_draw_when_configured() {
        let responses = [(1, Action::Ron), (2, Action::Ron), (3, Action::Ron)];
        assert_eq!(resolve(&responses, 0, &GameRule::default_tenhou()), Resolution::TripleRon);
        assert_eq!(
            resolve(&responses, 0, &GameRule::default_mjsoul()),
            Resolution::Ron(vec![1, 2, 3])
        );
    }

    #[test]
    fn passes_resolve_to_none() {
        let res = resolve(&[(1, Action::Pass), (2, Action::Pass)], 0, &GameRule::default());
        assert_eq!(res, Resolution::None);
    }

    #[test]
    fn chi_only_for_next_seat() {
        let hand = Hand::new(parse_tiles("46p123456789s11z").unwrap());
        let w = window(0, t("5p"));
        assert!(claim_options(&hand, 1, &w).iter().any(|a| matches!(a, Action::Chi { .. })));
        assert!(claim_options(&hand, 2, &w).is_empty());
    }

    #[test]
    fn chi_shapes() {
        let hand = Hand::new(parse_tiles("3467p").unwrap());
        // 5p: 34, 46, 67
        assert_eq!(chi_options(&hand, t("5p")).len(), 3);
        // honors never chi
        assert!(chi_options(&hand, t("1z")).is_empty());
        // no wrap-around between suits
        let hand = Hand::new(parse_tiles("89m1p").unwrap());
        assert!(chi_options(&hand, t("1p")).is_empty());
    }

    #[test]
    fn red_five_is_a_separate_pon_choice() {
        let hand = Hand::new(parse_tiles("055p1z").unwrap());
        assert_eq!(pon_options(&hand, t("5p")).len(), 2);
    }

    #[test]
    fn kuikae_suji_extension() {
        // Chi 4m with 56m forbids 4m and 7m.
        let kinds = kuikae_kinds(t("4m"), &[t("5m"), t("6m")], true);
        let ids: Vec<u8> = kinds.iter().map(|k| k.id()).collect();
        assert_eq!(ids, vec![3, 6]);
        // Middle tile forbids only itself.
        assert_eq!(kuikae_kinds(t("5m"), &[t("4m"), t("6m")], true).len(), 1);
    }

    #[test]
    fn kuikae_blocks_call_leaving_only_forbidden_tiles() {
        // After chi 4m with 56m only 7m would remain: forbidden.
        let hand = Hand::new(parse_tiles("567m").unwrap());
        let w = window(0, t("4m"));
        assert!(claim_options(&hand, 1, &w).is_empty());
        let mut free = w;
        free.kuikae_forbidden = false;
        assert_eq!(claim_options(&hand, 1, &free).len(), 1);
    }

    #[test]
    fn riichi_hands_cannot_claim() {
        let mut hand = Hand::new(parse_tiles("55p123456789s1z").unwrap());
        hand.declare_riichi(3, false);
        assert!(claim_options(&hand, 2, &window(0, t("5p"))).is_empty());
    }

    #[test]
    fn candidates_end_with_pass() {
        let hands: [Hand; 4] = [
            Hand::default(),
            Hand::new(parse_tiles("55p1z").unwrap()),
            Hand::default(),
            Hand::default(),
        ];
        let c = call_candidates(&hands, [false, false, true, false], &window(0, t("5p")));
        assert!(c[0].is_empty());
        assert_eq!(c[1].last(), Some(&Action::Pass));
        assert_eq!(c[2], vec![Action::Ron, Action::Pass]);
        assert!(c[3].is_empty());
    }
}
