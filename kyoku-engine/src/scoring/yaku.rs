use crate::score::base_points;
use crate::tile::{kind_counts, Suit, Tile, TileType, HAKU, HATSU, CHUN};
use crate::types::MeldKind;

use super::agari::{decompose, is_chiitoitsu, is_kokushi, Block, BlockKind};
use super::shanten::calc_shanten;
use super::{HandValue, OracleError, ScoringOracle, WinContext, WinRequest};

/// Reference oracle: exact shanten, regular/chiitoitsu/kokushi agari and the
/// common yaku set with fu.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardOracle;

impl ScoringOracle for StandardOracle {
    fn shanten(&self, tiles: &[Tile]) -> i8 {
        calc_shanten(&kind_counts(tiles))
    }

    fn hand_value(&self, request: &WinRequest) -> Result<HandValue, OracleError> {
        evaluate(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Ryanmen,
    Kanchan,
    Penchan,
    Shanpon,
    Tanki,
}

#[derive(Debug, Clone, Copy)]
struct Set {
    block: Block,
    concealed: bool,
    kan: bool,
}

#[derive(Debug, Default)]
struct Reading {
    han: u8,
    fu: u8,
    yakuman: u8,
    yaku: Vec<&'static str>,
}

impl Reading {
    fn add(&mut self, name: &'static str, han: u8) {
        self.han += han;
        self.yaku.push(name);
    }

    fn key(&self) -> (u8, u8, u8) {
        (self.yakuman, self.han, self.fu)
    }
}

fn evaluate(req: &WinRequest) -> Result<HandValue, OracleError> {
    let mut concealed = req.concealed.clone();
    concealed.push(req.win_tile);
    if concealed.len() + 3 * req.melds.len() != 14 {
        return Err(OracleError::Malformed(format!(
            "{} concealed tiles with {} melds",
            concealed.len(),
            req.melds.len()
        )));
    }
    for meld in &req.melds {
        let expected = if meld.kind.is_kan() { 4 } else { 3 };
        if meld.tiles.len() != expected {
            return Err(OracleError::Malformed(format!("{:?} meld with {} tiles", meld.kind, meld.tiles.len())));
        }
    }

    let counts = kind_counts(&concealed);
    let closed = req.melds.iter().all(|m| !m.is_open());
    let ctx = &req.context;
    let win = req.win_tile.kind();

    let called: Vec<Set> = req
        .melds
        .iter()
        .map(|m| Set {
            block: Block {
                kind: if m.kind == MeldKind::Chi {
                    BlockKind::Sequence
                } else {
                    BlockKind::Triplet
                },
                base: m.base_kind(),
            },
            concealed: !m.is_open(),
            kan: m.kind.is_kan(),
        })
        .collect();

    let mut best: Option<Reading> = None;
    let mut consider = |reading: Reading| {
        if best.as_ref().map_or(true, |b| reading.key() > b.key()) {
            best = Some(reading);
        }
    };

    if req.melds.is_empty() && is_kokushi(&counts) {
        let mut r = Reading::default();
        r.yakuman = 1;
        r.yaku.push("kokushi_musou");
        add_first_draw(&mut r, ctx);
        consider(r);
    }
    if req.melds.is_empty() && is_chiitoitsu(&counts) {
        consider(chiitoitsu_reading(&concealed, ctx));
    }
    for d in decompose(&counts) {
        // Every place the winning tile could have completed.
        let mut placements: Vec<(Option<usize>, Wait)> = Vec::new();
        if d.pair == win {
            placements.push((None, Wait::Tanki));
        }
        for (i, b) in d.blocks.iter().enumerate() {
            if !b.contains(win) {
                continue;
            }
            let wait = match b.kind {
                BlockKind::Triplet => Wait::Shanpon,
                BlockKind::Sequence => {
                    let offset = win.id() - b.base.id();
                    match (offset, b.base.rank()) {
                        (1, _) => Wait::Kanchan,
                        (0, 7) | (2, 1) => Wait::Penchan,
                        _ => Wait::Ryanmen,
                    }
                }
            };
            placements.push((Some(i), wait));
        }
        for (slot, wait) in placements {
            let mut sets: Vec<Set> = d
                .blocks
                .iter()
                .enumerate()
                .map(|(i, &block)| Set {
                    block,
                    // A triplet completed by ron counts as open.
                    concealed: !(Some(i) == slot && block.kind == BlockKind::Triplet && !ctx.is_tsumo),
                    kan: false,
                })
                .collect();
            sets.extend(called.iter().copied());
            consider(regular_reading(&sets, d.pair, wait, closed, ctx));
        }
    }

    let mut reading = best.ok_or(OracleError::NotAgari)?;
    if reading.yakuman > 0 {
        reading.han = 13 * reading.yakuman;
        reading.fu = 0;
    } else if reading.han == 0 {
        return Err(OracleError::NoYaku);
    }

    let mut dora = 0u8;
    if reading.yakuman == 0 {
        let mut all: Vec<Tile> = concealed.clone();
        all.extend(req.melds.iter().flat_map(|m| m.tiles.iter().copied()));
        let count_for = |indicators: &[Tile]| -> u8 {
            indicators
                .iter()
                .map(|ind| {
                    let target = ind.kind().dora_successor();
                    all.iter().filter(|t| t.kind() == target).count() as u8
                })
                .sum()
        };
        let plain = count_for(&req.dora_indicators);
        let aka = if ctx.aka_dora {
            all.iter().filter(|t| t.is_red()).count() as u8
        } else {
            0
        };
        let ura = if ctx.riichi { count_for(&req.ura_indicators) } else { 0 };
        for (name, n) in [("dora", plain), ("aka_dora", aka), ("ura_dora", ura)] {
            if n > 0 {
                reading.add(name, n);
                dora += n;
            }
        }
    }

    Ok(HandValue {
        han: reading.han,
        fu: reading.fu,
        yaku: reading.yaku.iter().map(|s| s.to_string()).collect(),
        dora,
        yakuman: reading.yakuman > 0,
        cost: base_points(reading.han, reading.fu),
    })
}

fn add_first_draw(r: &mut Reading, ctx: &WinContext) {
    if ctx.first_draw && ctx.is_tsumo {
        r.yakuman += 1;
        r.yaku.push(if ctx.is_dealer { "tenhou" } else { "chiihou" });
    }
}

/// Yaku that depend only on how the hand was won.
fn situational(r: &mut Reading, ctx: &WinContext, closed: bool) {
    if ctx.double_riichi {
        r.add("double_riichi", 2);
    } else if ctx.riichi {
        r.add("riichi", 1);
    }
    if ctx.riichi && ctx.ippatsu {
        r.add("ippatsu", 1);
    }
    if closed && ctx.is_tsumo {
        r.add("menzen_tsumo", 1);
    }
    if ctx.haitei && ctx.is_tsumo {
        r.add("haitei", 1);
    }
    if ctx.houtei && !ctx.is_tsumo {
        r.add("houtei", 1);
    }
    if ctx.rinshan && ctx.is_tsumo {
        r.add("rinshan_kaihou", 1);
    }
    if ctx.chankan && !ctx.is_tsumo {
        r.add("chankan", 1);
    }
}

/// Flush / half-flush over the given kinds.
fn flush(r: &mut Reading, kinds: impl Iterator<Item = TileType>, closed: bool) {
    let mut suit: Option<Suit> = None;
    let mut honors = false;
    for k in kinds {
        if k.is_honor() {
            honors = true;
        } else if suit.is_some_and(|s| s != k.suit()) {
            return;
        } else {
            suit = Some(k.suit());
        }
    }
    if suit.is_none() {
        return;
    }
    match (honors, closed) {
        (false, true) => r.add("chinitsu", 6),
        (false, false) => r.add("chinitsu", 5),
        (true, true) => r.add("honitsu", 3),
        (true, false) => r.add("honitsu", 2),
    }
}

fn chiitoitsu_reading(tiles: &[Tile], ctx: &WinContext) -> Reading {
    let mut r = Reading {
        fu: 25,
        ..Reading::default()
    };
    add_first_draw(&mut r, ctx);
    situational(&mut r, ctx, true);
    r.add("chiitoitsu", 2);
    if tiles.iter().all(|t| !t.kind().is_terminal_or_honor()) {
        r.add("tanyao", 1);
    }
    flush(&mut r, tiles.iter().map(|t| t.kind()), true);
    r
}

fn is_yakuhai(kind: TileType, ctx: &WinContext) -> bool {
    kind.is_dragon() || kind == ctx.seat_wind.tile_type() || kind == ctx.round_wind.tile_type()
}

fn regular_reading(sets: &[Set], pair: TileType, wait: Wait, closed: bool, ctx: &WinContext) -> Reading {
    let mut r = Reading::default();
    let triplets: Vec<&Set> = sets.iter().filter(|s| s.block.kind == BlockKind::Triplet).collect();
    let sequences: Vec<TileType> = sets
        .iter()
        .filter(|s| s.block.kind == BlockKind::Sequence)
        .map(|s| s.block.base)
        .collect();
    let concealed_triplets = triplets.iter().filter(|s| s.concealed).count();
    let has_triplet = |id: u8| triplets.iter().any(|s| s.block.base.id() == id);

    // Yakuman first; a yakuman reading skips the regular yaku.
    add_first_draw(&mut r, ctx);
    if concealed_triplets == 4 {
        r.yakuman += 1;
        r.yaku.push("suuankou");
    }
    if has_triplet(HAKU) && has_triplet(HATSU) && has_triplet(CHUN) {
        r.yakuman += 1;
        r.yaku.push("daisangen");
    }
    if r.yakuman > 0 {
        return r;
    }

    situational(&mut r, ctx, closed);

    let pinfu = closed && sequences.len() == 4 && !is_yakuhai(pair, ctx) && wait == Wait::Ryanmen;
    if pinfu {
        r.add("pinfu", 1);
    }

    let all_simple = !pair.is_terminal_or_honor()
        && sets.iter().all(|s| match s.block.kind {
            BlockKind::Triplet => !s.block.base.is_terminal_or_honor(),
            BlockKind::Sequence => (2..=6).contains(&s.block.base.rank()),
        });
    if all_simple && (closed || ctx.open_tanyao) {
        r.add("tanyao", 1);
    }

    if closed {
        let mut bases = sequences.clone();
        bases.sort();
        let mut pairs = 0;
        let mut i = 0;
        while i + 1 < bases.len() {
            if bases[i] == bases[i + 1] {
                pairs += 1;
                i += 2;
            } else {
                i += 1;
            }
        }
        match pairs {
            2 => r.add("ryanpeikou", 3),
            1 => r.add("iipeikou", 1),
            _ => {}
        }
    }

    for s in &triplets {
        let k = s.block.base;
        match k.id() {
            HAKU => r.add("haku", 1),
            HATSU => r.add("hatsu", 1),
            CHUN => r.add("chun", 1),
            _ => {}
        }
        if k == ctx.seat_wind.tile_type() {
            r.add("seat_wind", 1);
        }
        if k == ctx.round_wind.tile_type() {
            r.add("round_wind", 1);
        }
    }

    let dragon_triplets = [HAKU, HATSU, CHUN].iter().filter(|&&d| has_triplet(d)).count();
    if dragon_triplets == 2 && pair.is_dragon() {
        r.add("shousangen", 2);
    }
    if triplets.len() == 4 {
        r.add("toitoi", 2);
    }
    if concealed_triplets == 3 {
        r.add("sanankou", 2);
    }

    let open_penalty = u8::from(!closed);
    let sanshoku = sequences.iter().any(|b| {
        let rank = b.rank();
        [Suit::Manzu, Suit::Pinzu, Suit::Souzu]
            .iter()
            .all(|&suit| sequences.iter().any(|o| o.suit() == suit && o.rank() == rank))
    });
    if sanshoku {
        r.add("sanshoku", 2 - open_penalty);
    }
    let ittsu = [Suit::Manzu, Suit::Pinzu, Suit::Souzu].iter().any(|&suit| {
        [1, 4, 7]
            .iter()
            .all(|&rank| sequences.iter().any(|o| o.suit() == suit && o.rank() == rank))
    });
    if ittsu {
        r.add("ittsu", 2 - open_penalty);
    }

    let outside = pair.is_terminal_or_honor() && sets.iter().all(|s| s.block.has_terminal_or_honor());
    if outside && !sequences.is_empty() {
        let honors = pair.is_honor() || sets.iter().any(|s| s.block.has_honor());
        if honors {
            r.add("chanta", 2 - open_penalty);
        } else {
            r.add("junchan", 3 - open_penalty);
        }
    }

    let kinds = sets
        .iter()
        .map(|s| s.block.base)
        .chain(std::iter::once(pair));
    flush(&mut r, kinds, closed);

    r.fu = fu(sets, pair, wait, closed, pinfu, ctx);
    r
}

fn fu(sets: &[Set], pair: TileType, wait: Wait, closed: bool, pinfu: bool, ctx: &WinContext) -> u8 {
    if pinfu {
        return if ctx.is_tsumo { 20 } else { 30 };
    }
    let mut fu: u32 = 20;
    if closed && !ctx.is_tsumo {
        fu += 10;
    }
    if ctx.is_tsumo {
        fu += 2;
    }
    for s in sets.iter().filter(|s| s.block.kind == BlockKind::Triplet) {
        let mut f = 2;
        if s.concealed {
            f *= 2;
        }
        if s.block.base.is_terminal_or_honor() {
            f *= 2;
        }
        if s.kan {
            f *= 4;
        }
        fu += f;
    }
    if pair.is_dragon() {
        fu += 2;
    }
    if pair == ctx.seat_wind.tile_type() {
        fu += 2;
    }
    if pair == ctx.round_wind.tile_type() {
        fu += 2;
    }
    if matches!(wait, Wait::Kanchan | Wait::Penchan | Wait::Tanki) {
        fu += 2;
    }
    // open hand with no fu still scores 30
    if fu == 20 {
        fu = 30;
    }
    (fu.div_ceil(10) * 10) as u8
}
