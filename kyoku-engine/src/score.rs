//! Point table: han/fu to payments.

use serde::{Deserialize, Serialize};

/// Payment breakdown for one winner.
///
/// For a tsumo, `pay_tsumo_dealer` is what the dealer pays (zero when the
/// winner is the dealer) and `pay_tsumo_non_dealer` what each other player
/// pays. For a ron, the discarder pays `pay_ron` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    pub total: u32,
    pub pay_ron: u32,
    pub pay_tsumo_dealer: u32,
    pub pay_tsumo_non_dealer: u32,
}

/// Base points before the dealer/non-dealer multipliers. Limit hands start
/// at mangan (5 han, or anything whose fu pushes it past 2000).
pub fn base_points(han: u8, fu: u8) -> u32 {
    match han {
        0 => 0,
        1..=4 => (round_up_fu(fu) as u32 * 2u32.pow(2 + han as u32)).min(2000),
        5 => 2000,
        6 | 7 => 3000,
        8..=10 => 4000,
        11 | 12 => 6000,
        // 13 han per yakuman multiple
        _ => 8000 * (han as u32 / 13),
    }
}

/// Payments for a win of `han`/`fu`, including the honba bonus.
/// `honba_bonus` is the total per honba (300 by default): a ron takes it all
/// from the discarder, a tsumo splits it evenly over the three payers.
pub fn calculate_score(han: u8, fu: u8, is_dealer: bool, is_tsumo: bool, honba: u8, honba_bonus: u32) -> Score {
    let base = base_points(han, fu);
    let mut score = if is_tsumo {
        let (dealer, non_dealer) = if is_dealer {
            (0, ceil_100(base * 2))
        } else {
            (ceil_100(base * 2), ceil_100(base))
        };
        let total = if is_dealer { non_dealer * 3 } else { dealer + non_dealer * 2 };
        Score {
            total,
            pay_ron: 0,
            pay_tsumo_dealer: dealer,
            pay_tsumo_non_dealer: non_dealer,
        }
    } else {
        let total = ceil_100(base * if is_dealer { 6 } else { 4 });
        Score {
            total,
            pay_ron: total,
            ..Score::default()
        }
    };

    let bonus = honba as u32 * honba_bonus;
    if is_tsumo {
        let each = bonus / 3;
        if !is_dealer {
            score.pay_tsumo_dealer += each;
        }
        score.pay_tsumo_non_dealer += each;
        score.total += each * 3;
    } else {
        score.pay_ron += bonus;
        score.total += bonus;
    }
    score
}

fn round_up_fu(fu: u8) -> u8 {
    // chiitoitsu stays at 25
    if fu == 25 {
        return 25;
    }
    fu.div_ceil(10) * 10
}

fn ceil_100(val: u32) -> u32 {
    val.div_ceil(100) * 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_dealer_tsumo_dealer_pays_double() {
        let s = calculate_score(1, 30, false, true, 0, 300);
        assert_eq!(s.pay_tsumo_dealer, 500);
        assert_eq!(s.pay_tsumo_non_dealer, 300);
        assert_eq!(s.total, 1100);
    }

    #[test]
    fn ron_values() {
        assert_eq!(calculate_score(1, 30, false, false, 0, 300).pay_ron, 1000);
        assert_eq!(calculate_score(2, 25, false, false, 0, 300).pay_ron, 1600);
        assert_eq!(calculate_score(3, 30, true, false, 0, 300).pay_ron, 5800);
        assert_eq!(calculate_score(4, 40, false, false, 0, 300).pay_ron, 8000);
    }

    #[test]
    fn limits() {
        assert_eq!(calculate_score(5, 30, false, false, 0, 300).total, 8000);
        assert_eq!(calculate_score(6, 30, true, false, 0, 300).total, 18000);
        assert_eq!(calculate_score(11, 30, false, false, 0, 300).total, 24000);
        assert_eq!(calculate_score(13, 0, false, false, 0, 300).total, 32000);
        assert_eq!(calculate_score(26, 0, true, false, 0, 300).total, 96000);
    }

    #[test]
    fn dealer_tsumo_all_pay_equal() {
        let s = calculate_score(5, 30, true, true, 0, 300);
        assert_eq!(s.pay_tsumo_dealer, 0);
        assert_eq!(s.pay_tsumo_non_dealer, 4000);
        assert_eq!(s.total, 12000);
    }

    #[test]
    fn honba_bonus_split() {
        let ron = calculate_score(1, 30, false, false, 2, 300);
        assert_eq!(ron.pay_ron, 1600);
        let tsumo = calculate_score(1, 30, false, true, 2, 300);
        assert_eq!(tsumo.pay_tsumo_dealer, 700);
        assert_eq!(tsumo.pay_tsumo_non_dealer, 500);
        assert_eq!(tsumo.total, 1700);
    }
}
