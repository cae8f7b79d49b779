//! Decomposition of a complete concealed part into a pair plus sets.

use crate::tile::{TileType, NUM_TILE_TYPES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Run of three; `base` is the lowest kind.
    Sequence,
    Triplet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub base: TileType,
}

impl Block {
    pub fn contains(&self, kind: TileType) -> bool {
        match self.kind {
            BlockKind::Triplet => self.base == kind,
            BlockKind::Sequence => {
                kind.suit() == self.base.suit() && kind.id() >= self.base.id() && kind.id() <= self.base.id() + 2
            }
        }
    }

    pub fn has_terminal_or_honor(&self) -> bool {
        match self.kind {
            BlockKind::Triplet => self.base.is_terminal_or_honor(),
            BlockKind::Sequence => self.base.rank() == 1 || self.base.rank() == 7,
        }
    }

    pub fn has_honor(&self) -> bool {
        self.kind == BlockKind::Triplet && self.base.is_honor()
    }
}

/// One way of reading the concealed tiles as `pair + blocks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub pair: TileType,
    pub blocks: Vec<Block>,
}

/// All standard decompositions of `counts` (which must hold `3n + 2` tiles).
/// Empty when the tiles are not a complete regular shape.
pub fn decompose(counts: &[u8; NUM_TILE_TYPES]) -> Vec<Decomposition> {
    let total: u8 = counts.iter().sum();
    if total % 3 != 2 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for pair in TileType::all() {
        if counts[pair.index()] < 2 {
            continue;
        }
        let mut work = *counts;
        work[pair.index()] -= 2;
        let mut blocks = Vec::new();
        split_blocks(&mut work, 0, &mut blocks, &mut |blocks| {
            out.push(Decomposition {
                pair,
                blocks: blocks.to_vec(),
            })
        });
    }
    out.dedup();
    out
}

fn split_blocks(
    counts: &mut [u8; NUM_TILE_TYPES],
    start: usize,
    blocks: &mut Vec<Block>,
    emit: &mut dyn FnMut(&[Block]),
) {
    let Some(i) = (start..NUM_TILE_TYPES).find(|&i| counts[i] > 0) else {
        emit(blocks);
        return;
    };
    let kind = TileType::from_index(i as u8);
    if counts[i] >= 3 {
        counts[i] -= 3;
        blocks.push(Block {
            kind: BlockKind::Triplet,
            base: kind,
        });
        split_blocks(counts, i, blocks, emit);
        blocks.pop();
        counts[i] += 3;
    }
    if i < 27 && i % 9 <= 6 && counts[i + 1] > 0 && counts[i + 2] > 0 {
        counts[i] -= 1;
        counts[i + 1] -= 1;
        counts[i + 2] -= 1;
        blocks.push(Block {
            kind: BlockKind::Sequence,
            base: kind,
        });
        split_blocks(counts, i, blocks, emit);
        blocks.pop();
        counts[i] += 1;
        counts[i + 1] += 1;
        counts[i + 2] += 1;
    }
}

pub fn is_chiitoitsu(counts: &[u8; NUM_TILE_TYPES]) -> bool {
    counts.iter().filter(|&&c| c == 2).count() == 7
}

pub fn is_kokushi(counts: &[u8; NUM_TILE_TYPES]) -> bool {
    let yaochuu_total: u8 = TileType::all()
        .filter(|t| t.is_terminal_or_honor())
        .map(|t| counts[t.index()])
        .sum();
    let total: u8 = counts.iter().sum();
    total == 14
        && yaochuu_total == 14
        && TileType::all()
            .filter(|t| t.is_terminal_or_honor())
            .all(|t| counts[t.index()] >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{kind_counts, parse_tiles};

    fn counts(s: &str) -> [u8; NUM_TILE_TYPES] {
        kind_counts(&parse_tiles(s).unwrap())
    }

    #[test]
    fn ambiguous_hand_has_two_readings() {
        // 111222333m reads as three triplets or three identical runs.
        let d = decompose(&counts("111222333m456p77s"));
        assert_eq!(d.len(), 2);
        assert!(d.iter().all(|x| x.pair.id() == 24));
    }

    #[test]
    fn incomplete_hand_has_none() {
        assert!(decompose(&counts("123456789m123p56s")).is_empty());
        assert!(decompose(&counts("12m")).is_empty());
    }

    #[test]
    fn pair_only_after_four_calls() {
        let d = decompose(&counts("55p"));
        assert_eq!(d.len(), 1);
        assert!(d[0].blocks.is_empty());
    }

    #[test]
    fn special_shapes() {
        assert!(is_chiitoitsu(&counts("11223344556677z")));
        assert!(!is_chiitoitsu(&counts("11112233445566m")));
        assert!(is_kokushi(&counts("19m19p19s12345677z")));
        assert!(!is_kokushi(&counts("19m19p19s12345666z")));
    }

    #[test]
    fn block_membership() {
        let seq = Block {
            kind: BlockKind::Sequence,
            base: TileType::new(6).unwrap(),
        };
        assert!(seq.contains(TileType::new(8).unwrap()));
        assert!(!seq.contains(TileType::new(9).unwrap()));
        assert!(seq.has_terminal_or_honor());
    }
}
