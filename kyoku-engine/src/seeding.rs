//! Where every wall comes from.
//!
//! A batch run hands each match a 32-byte seed ([`SessionRng`], or
//! [`seed_from_u64`] for a plain number). The match turns that into one seed
//! per round with [`derive_round_seed`], and [`shuffled_tile_ids`] turns a
//! round seed into the 136-tile draw order. All three steps are SHA-256 or
//! ChaCha8 and our own shuffle loop, so a logged seed rebuilds the same wall
//! on any machine and with any `rand` release.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use crate::tile::NUM_TILES_136;

/// In-place shuffle, walking from the back and swapping each slot with a
/// uniformly chosen slot at or before it.
///
/// Kept here instead of `SliceRandom::shuffle` so a `rand` upgrade cannot
/// change the walls of recorded matches.
pub fn fisher_yates_shuffle<T>(slice: &mut [T], rng: &mut impl Rng) {
    for i in (1..slice.len()).rev() {
        slice.swap(i, rng.random_range(0..=i));
    }
}

/// Wall seed of one round.
///
/// Hashes the match seed with the match-wide round counter and the kyoku
/// and honba of the round. The counter keeps a dealer repeat (same kyoku,
/// new honba) or a replayed kyoku from landing on an earlier wall.
pub fn derive_round_seed(match_seed: &[u8; 32], round_index: u64, kyoku: u8, honba: u8) -> [u8; 32] {
    Sha256::new()
        .chain_update(match_seed)
        .chain_update(round_index.to_le_bytes())
        .chain_update([kyoku, honba])
        .finalize()
        .into()
}

/// Match seed for a plain number, e.g. a CLI `--seed`.
pub fn seed_from_u64(seed: u64) -> [u8; 32] {
    Sha256::new()
        .chain_update(b"kyoku-match")
        .chain_update(seed.to_le_bytes())
        .finalize()
        .into()
}

/// Draw order of the 136 tile ids for `seed`: ids in ascending order, then
/// shuffled with a ChaCha8 stream keyed by the seed.
pub fn shuffled_tile_ids(seed: [u8; 32]) -> [u8; NUM_TILES_136] {
    let mut ids: [u8; NUM_TILES_136] = std::array::from_fn(|i| i as u8);
    fisher_yates_shuffle(&mut ids, &mut ChaCha8Rng::from_seed(seed));
    ids
}

/// Hands out match seeds for a batch: seed `n` is
/// `SHA-256(session seed, n)`, so match `n` can be rerun alone.
///
/// ```
/// use kyoku_engine::seeding::SessionRng;
///
/// let mut batch = SessionRng::new([9u8; 32]);
/// let first = batch.next_match_seed();
/// assert_ne!(first, batch.next_match_seed());
/// assert_eq!(SessionRng::new([9u8; 32]).next_match_seed(), first);
/// ```
#[derive(Debug, Clone)]
pub struct SessionRng {
    seed: [u8; 32],
    match_index: u64,
}

impl SessionRng {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            match_index: 0,
        }
    }

    /// Seeds handed out so far.
    pub fn match_index(&self) -> u64 {
        self.match_index
    }

    pub fn next_match_seed(&mut self) -> [u8; 32] {
        let seed = Sha256::new()
            .chain_update(self.seed)
            .chain_update(self.match_index.to_le_bytes())
            .finalize()
            .into();
        self.match_index += 1;
        seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaying_a_round_seed_rebuilds_its_wall() {
        let match_seed = seed_from_u64(2024);
        let first = shuffled_tile_ids(derive_round_seed(&match_seed, 5, 2, 1));
        let again = shuffled_tile_ids(derive_round_seed(&match_seed, 5, 2, 1));
        assert_eq!(first, again);
    }

    #[test]
    fn dealer_repeat_gets_a_fresh_wall() {
        let match_seed = seed_from_u64(8);
        // East 2 played twice: once at honba 0, then as a renchan at honba 1.
        let east2 = derive_round_seed(&match_seed, 1, 1, 0);
        let renchan = derive_round_seed(&match_seed, 2, 1, 1);
        assert_ne!(shuffled_tile_ids(east2), shuffled_tile_ids(renchan));
        assert_ne!(east2, derive_round_seed(&match_seed, 1, 1, 1));
        assert_ne!(east2, derive_round_seed(&seed_from_u64(9), 1, 1, 0));
    }

    #[test]
    fn wall_is_shuffled() {
        let ids = shuffled_tile_ids(seed_from_u64(0));
        let in_place = ids.iter().enumerate().filter(|&(i, &id)| i == id as usize).count();
        assert!(in_place < 20, "{in_place} ids never moved");
    }

    #[test]
    fn short_slices_survive_the_shuffle() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut none: [u8; 0] = [];
        fisher_yates_shuffle(&mut none, &mut rng);
        let mut one = ['x'];
        fisher_yates_shuffle(&mut one, &mut rng);
        assert_eq!(one, ['x']);
    }

    #[test]
    fn batch_seeds_are_indexed() {
        let mut batch = SessionRng::new(seed_from_u64(3));
        let seeds: Vec<[u8; 32]> = (0..4).map(|_| batch.next_match_seed()).collect();
        assert_eq!(batch.match_index(), 4);
        let mut rerun = SessionRng::new(seed_from_u64(3));
        assert_eq!(rerun.next_match_seed(), seeds[0]);
        let distinct: std::collections::HashSet<_> = seeds.iter().collect();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn numeric_seeds_do_not_collide() {
        assert_ne!(seed_from_u64(1), seed_from_u64(2));
        assert_eq!(seed_from_u64(7), seed_from_u64(7));
    }

    proptest::proptest! {
        #[test]
        fn every_wall_holds_each_tile_once(seed in proptest::prelude::any::<u64>()) {
            let mut ids = shuffled_tile_ids(seed_from_u64(seed));
            ids.sort_unstable();
            proptest::prop_assert!(ids.iter().copied().eq(0..NUM_TILES_136 as u8));
        }
    }
}
