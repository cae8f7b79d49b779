//! Score movement at the end of a round.

use serde::{Deserialize, Serialize};

use crate::round::RoundEnd;
use crate::rule::GameRule;
use crate::types::{seat_distance, Seat, NUM_PLAYERS};

/// Inputs to [`settle`].
#[derive(Debug, Clone, Copy)]
pub struct SettleInput<'a> {
    pub outcome: &'a RoundEnd,
    pub dealer: Seat,
    pub honba: u8,
    /// Deposits on the table now, including this round's.
    pub riichi_pool: u32,
    /// Seats whose riichi deposit was paid this round.
    pub deposited: [bool; NUM_PLAYERS],
    pub rule: &'a GameRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Per-seat change on top of the live scores (deposits already paid
    /// are not repeated here).
    pub deltas: [i32; NUM_PLAYERS],
    /// Deposits left on the table.
    pub riichi_pool: u32,
    /// The dealer keeps the seat.
    pub renchan: bool,
    pub honba_after: u8,
}

pub fn settle(input: &SettleInput) -> Settlement {
    let rule = input.rule;
    let deposit = rule.riichi_deposit;
    let mut deltas = [0i32; NUM_PLAYERS];

    match input.outcome {
        RoundEnd::Win { winners } => {
            for w in winners {
                let winner = w.seat as usize;
                if w.tsumo {
                    for payer in (0..NUM_PLAYERS as Seat).filter(|&p| p != w.seat) {
                        let pay = if payer == input.dealer {
                            w.score.pay_tsumo_dealer
                        } else {
                            w.score.pay_tsumo_non_dealer
                        } as i32;
                        deltas[payer as usize] -= pay;
                        deltas[winner] += pay;
                    }
                } else {
                    let pay = w.score.pay_ron as i32;
                    deltas[w.from as usize] -= pay;
                    deltas[winner] += pay;
                }
            }
            // The pool goes to the winner nearest the discarder.
            if let Some(first) = winners.iter().min_by_key(|w| seat_distance(w.from, w.seat)) {
                deltas[first.seat as usize] += input.riichi_pool as i32 * deposit;
            }
            let renchan = winners.iter().any(|w| w.seat == input.dealer);
            Settlement {
                deltas,
                riichi_pool: 0,
                renchan,
                honba_after: if renchan { input.honba.saturating_add(1) } else { 0 },
            }
        }
        RoundEnd::Exhaustive { tenpai } => {
            let count = tenpai.iter().filter(|&&t| t).count() as i32;
            if count > 0 && count < NUM_PLAYERS as i32 {
                let gain = rule.noten_pool / count;
                let loss = rule.noten_pool / (NUM_PLAYERS as i32 - count);
                for (s, &t) in tenpai.iter().enumerate() {
                    deltas[s] = if t { gain } else { -loss };
                }
            }
            let dealer_tenpai = tenpai[input.dealer as usize];
            Settlement {
                deltas,
                riichi_pool: input.riichi_pool,
                renchan: rule.renchan_on_dealer_tenpai && dealer_tenpai,
                honba_after: input.honba.saturating_add(1),
            }
        }
        RoundEnd::Abortive { .. } => {
            let mut pool = input.riichi_pool;
            if !rule.riichi_sticks_carry_over_on_abort {
                pool -= refund(&mut deltas, input.deposited, deposit);
            }
            Settlement {
                deltas,
                riichi_pool: pool,
                renchan: rule.renchan_on_abortive_draw,
                honba_after: input.honba.saturating_add(1),
            }
        }
        RoundEnd::Aborted { .. } => {
            let returned = refund(&mut deltas, input.deposited, deposit);
            Settlement {
                deltas,
                riichi_pool: input.riichi_pool - returned,
                renchan: true,
                honba_after: input.honba,
            }
        }
    }
}

/// Hands this round's deposits back; returns how many sticks left the pool.
fn refund(deltas: &mut [i32; NUM_PLAYERS], deposited: [bool; NUM_PLAYERS], deposit: i32) -> u32 {
    let mut sticks = 0;
    for (delta, paid) in deltas.iter_mut().zip(deposited) {
        if paid {
            *delta += deposit;
            sticks += 1;
        }
    }
    sticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::{AbortiveDraw, WinRecord};
    use crate::score::calculate_score;
    use crate::scoring::HandValue;
    use crate::tile::parse_tiles;

    fn win(seat: Seat, from: Seat, tsumo: bool, dealer: Seat, han: u8, fu: u8, honba: u8) -> WinRecord {
        WinRecord {
            seat,
            from,
            tile: parse_tiles("1m").unwrap()[0],
            tsumo,
            value: HandValue {
                han,
                fu,
                yaku: vec!["riichi".into()],
                dora: 0,
                yakuman: false,
                cost: 0,
            },
            score: calculate_score(han, fu, seat == dealer, tsumo, honba, 300),
        }
    }

    fn input<'a>(outcome: &'a RoundEnd, rule: &'a GameRule, pool: u32) -> SettleInput<'a> {
        SettleInput {
            outcome,
            dealer: 0,
            honba: 1,
            riichi_pool: pool,
            deposited: [false; 4],
            rule,
        }
    }

    #[test]
    fn non_dealer_tsumo_dealer_pays_double() {
        let rule = GameRule::default();
        let outcome = RoundEnd::Win {
            winners: vec![win(2, 2, true, 0, 1, 30, 0)],
        };
        let s = settle(&SettleInput {
            honba: 0,
            ..input(&outcome, &rule, 0)
        });
        assert_eq!(s.deltas, [-500, -300, 1100, -300]);
        assert!(!s.renchan);
        assert_eq!(s.honba_after, 0);
    }

    #[test]
    fn ron_paid_by_discarder_only_with_pool_and_honba() {
        let rule = GameRule::default();
        let outcome = RoundEnd::Win {
            winners: vec![win(1, 3, false, 0, 1, 30, 1)],
        };
        let s = settle(&input(&outcome, &rule, 2));
        assert_eq!(s.deltas, [0, 1300 + 2000, 0, -1300]);
        assert_eq!(s.riichi_pool, 0);
        assert_eq!(s.deltas.iter().sum::<i32>(), 2000);
    }

    #[test]
    fn double_ron_pool_to_nearest_honba_to_each() {
        let rule = GameRule::default_mjsoul();
        // Discarder 0; seat 1 is nearer than seat 3.
        let outcome = RoundEnd::Win {
            winners: vec![win(1, 0, false, 0, 1, 30, 1), win(3, 0, false, 0, 1, 30, 1)],
        };
        let s = settle(&input(&outcome, &rule, 1));
        assert_eq!(s.deltas, [-2600, 1300 + 1000, 0, 1300]);
    }

    #[test]
    fn dealer_win_is_renchan() {
        let rule = GameRule::default();
        let outcome = RoundEnd::Win {
            winners: vec![win(0, 2, false, 0, 2, 30, 1)],
        };
        let s = settle(&input(&outcome, &rule, 0));
        assert!(s.renchan);
        assert_eq!(s.honba_after, 2);
    }

    #[test]
    fn noten_payments() {
        let rule = GameRule::default();
        let one = RoundEnd::Exhaustive {
            tenpai: [false, true, false, false],
        };
        let s = settle(&input(&one, &rule, 1));
        assert_eq!(s.deltas, [-1000, 3000, -1000, -1000]);
        assert_eq!(s.riichi_pool, 1);
        assert!(!s.renchan);
        assert_eq!(s.honba_after, 2);

        let two = RoundEnd::Exhaustive {
            tenpai: [true, true, false, false],
        };
        let s = settle(&input(&two, &rule, 0));
        assert_eq!(s.deltas, [1500, 1500, -1500, -1500]);
        assert!(s.renchan);

        let three = RoundEnd::Exhaustive {
            tenpai: [true, true, true, false],
        };
        assert_eq!(settle(&input(&three, &rule, 0)).deltas, [1000, 1000, 1000, -3000]);

        let none = RoundEnd::Exhaustive { tenpai: [false; 4] };
        assert_eq!(settle(&input(&none, &rule, 0)).deltas, [0; 4]);
    }

    #[test]
    fn abortive_draw_refunds_when_sticks_do_not_carry() {
        let rule = GameRule {
            riichi_sticks_carry_over_on_abort: false,
            ..GameRule::default()
        };
        let outcome = RoundEnd::Abortive {
            draw: AbortiveDraw::SuuchaRiichi,
        };
        let s = settle(&SettleInput {
            deposited: [true; 4],
            ..input(&outcome, &rule, 5)
        });
        assert_eq!(s.deltas, [1000; 4]);
        assert_eq!(s.riichi_pool, 1);
        assert!(s.renchan);

        let carry = GameRule::default();
        let s = settle(&SettleInput {
            deposited: [true; 4],
            ..input(&outcome, &carry, 5)
        });
        assert_eq!(s.deltas, [0; 4]);
        assert_eq!(s.riichi_pool, 5);
    }

    #[test]
    fn cancellation_restores_round_start() {
        let rule = GameRule::default();
        let outcome = RoundEnd::Aborted {
            reason: "timeout".into(),
        };
        let s = settle(&SettleInput {
            deposited: [false, true, false, false],
            ..input(&outcome, &rule, 3)
        });
        assert_eq!(s.deltas, [0, 1000, 0, 0]);
        assert_eq!(s.riichi_pool, 2);
        assert_eq!(s.honba_after, 1);
    }
}
