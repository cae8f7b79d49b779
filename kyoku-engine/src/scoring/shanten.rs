//! Exact shanten over a 34-kind histogram.
//!
//! Regular hands are searched depth-first (sets, then partial sets, then
//! isolated tiles); seven pairs and thirteen orphans use their closed-form
//! counts. -1 means the tiles already form a complete hand.

use crate::tile::{NUM_TILE_TYPES, YAOCHUU};

/// Shanten of `counts`, where the tile count is `14 - 3k` or `13 - 3k` for
/// `k` called/declared sets. Seven pairs and kokushi are only considered for
/// closed 13/14-tile hands.
pub fn calc_shanten(counts: &[u8; NUM_TILE_TYPES]) -> i8 {
    let total: u8 = counts.iter().sum();
    let fixed_sets = 4u8.saturating_sub(total / 3);
    let mut best = regular_shanten(counts, fixed_sets);
    if total >= 13 {
        best = best.min(chiitoitsu_shanten(counts)).min(kokushi_shanten(counts));
    }
    best
}

pub fn regular_shanten(counts: &[u8; NUM_TILE_TYPES], fixed_sets: u8) -> i8 {
    let mut work = *counts;
    let mut search = Search {
        fixed_sets,
        best: 8,
    };
    search.dfs(&mut work, 0, 0, 0, false);
    search.best
}

pub fn chiitoitsu_shanten(counts: &[u8; NUM_TILE_TYPES]) -> i8 {
    let pairs = counts.iter().filter(|&&c| c >= 2).count() as i8;
    let kinds = counts.iter().filter(|&&c| c >= 1).count() as i8;
    6 - pairs + (7 - kinds).max(0)
}

pub fn kokushi_shanten(counts: &[u8; NUM_TILE_TYPES]) -> i8 {
    let distinct = YAOCHUU.iter().filter(|&&t| counts[t as usize] > 0).count() as i8;
    let has_pair = YAOCHUU.iter().any(|&t| counts[t as usize] >= 2);
    13 - distinct - i8::from(has_pair)
}

struct Search {
    fixed_sets: u8,
    best: i8,
}

impl Search {
    fn score(&self, sets: u8, partials: u8, pair: bool) -> i8 {
        let sets = sets + self.fixed_sets;
        let partials = partials.min(4u8.saturating_sub(sets));
        8 - 2 * sets as i8 - partials as i8 - i8::from(pair)
    }

    fn dfs(&mut self, counts: &mut [u8; NUM_TILE_TYPES], start: usize, sets: u8, partials: u8, pair: bool) {
        let Some(i) = (start..NUM_TILE_TYPES).find(|&i| counts[i] > 0) else {
            self.best = self.best.min(self.score(sets, partials, pair));
            return;
        };
        if self.best < 0 {
            return;
        }

        let suited = i < 27;
        let pos = i % 9;

        if counts[i] >= 3 {
            counts[i] -= 3;
            self.dfs(counts, i, sets + 1, partials, pair);
            counts[i] += 3;
        }
        if suited && pos <= 6 && counts[i + 1] > 0 && counts[i + 2] > 0 {
            counts[i] -= 1;
            counts[i + 1] -= 1;
            counts[i + 2] -= 1;
            self.dfs(counts, i, sets + 1, partials, pair);
            counts[i] += 1;
            counts[i + 1] += 1;
            counts[i + 2] += 1;
        }
        if counts[i] >= 2 {
            counts[i] -= 2;
            if !pair {
                self.dfs(counts, i, sets, partials, true);
            }
            self.dfs(counts, i, sets, partials + 1, pair);
            counts[i] += 2;
        }
        if suited && pos <= 7 && counts[i + 1] > 0 {
            counts[i] -= 1;
            counts[i + 1] -= 1;
            self.dfs(counts, i, sets, partials + 1, pair);
            counts[i] += 1;
            counts[i + 1] += 1;
        }
        if suited && pos <= 6 && counts[i + 2] > 0 {
            counts[i] -= 1;
            counts[i + 2] -= 1;
            self.dfs(counts, i, sets, partials + 1, pair);
            counts[i] += 1;
            counts[i + 2] += 1;
        }
        // Leave one copy isolated.
        counts[i] -= 1;
        self.dfs(counts, i, sets, partials, pair);
        counts[i] += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{kind_counts, parse_tiles};

    fn sh(s: &str) -> i8 {
        calc_shanten(&kind_counts(&parse_tiles(s).unwrap()))
    }

    #[test]
    fn complete_hands() {
        assert_eq!(sh("123456789m123p55s"), -1);
        assert_eq!(sh("11223344556677z"), -1);
        assert_eq!(sh("19m19p19s12345677z"), -1);
        assert_eq!(sh("111222333m11p"), -1); // one called set
    }

    #[test]
    fn tenpai_hands() {
        assert_eq!(sh("123456789m123p5s"), 0);
        assert_eq!(sh("1122334455667z"), 0);
        assert_eq!(sh("19m19p19s1234567z"), 0);
        assert_eq!(sh("13m"), 0); // four sets called, keep either tile as a tanki
    }

    #[test]
    fn far_hands() {
        assert_eq!(sh("147m258p369s1234z"), 6);
        assert_eq!(sh("123456789m13p59s"), 1);
    }

    #[test]
    fn chiitoitsu_needs_distinct_pairs() {
        let counts = kind_counts(&parse_tiles("11112233445566m").unwrap());
        assert_eq!(chiitoitsu_shanten(&counts), 1);
    }
}
