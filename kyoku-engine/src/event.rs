//! Round event log.
//!
//! Events are appended by the round state machine as transitions happen and
//! are never consulted by it again. Serialized, they form the replayable
//! trace of a round.

use serde::{Deserialize, Serialize};

use crate::round::RoundEnd;
use crate::score::Score;
use crate::scoring::HandValue;
use crate::tile::Tile;
use crate::types::{MeldKind, Seat, Wind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    StartRound {
        round_wind: Wind,
        kyoku: u8,
        honba: u8,
        riichi_pool: u32,
        dealer: Seat,
        scores: [i32; 4],
        dora_indicator: Tile,
        hands: [Vec<Tile>; 4],
        wall_digest: String,
    },
    Draw {
        seat: Seat,
        tile: Tile,
        /// Kan replacement from the dead wall.
        rinshan: bool,
    },
    Discard {
        seat: Seat,
        tile: Tile,
        tsumogiri: bool,
        riichi: bool,
    },
    /// Chi, pon or open kan on a discard.
    Call {
        seat: Seat,
        from: Seat,
        kind: MeldKind,
        tile: Tile,
        consumed: Vec<Tile>,
    },
    Riichi {
        seat: Seat,
    },
    RiichiAccepted {
        seat: Seat,
        riichi_pool: u32,
        score: i32,
    },
    /// Closed kan (`tiles` = the four tiles) or added kan (`tiles` = the
    /// added tile).
    Kan {
        seat: Seat,
        kind: MeldKind,
        tiles: Vec<Tile>,
    },
    Dora {
        indicator: Tile,
    },
    Win {
        seat: Seat,
        /// Discarder for a ron; the winner for a tsumo.
        from: Seat,
        tile: Tile,
        tsumo: bool,
        value: HandValue,
        score: Score,
    },
    RoundEnd {
        outcome: RoundEnd,
        deltas: [i32; 4],
        scores: [i32; 4],
    },
    /// Any event type this build does not know.
    #[serde(other)]
    Unknown,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::StartRound { .. } => "start_round",
            Event::Draw { .. } => "draw",
            Event::Discard { .. } => "discard",
            Event::Call { .. } => "call",
            Event::Riichi { .. } => "riichi",
            Event::RiichiAccepted { .. } => "riichi_accepted",
            Event::Kan { .. } => "kan",
            Event::Dora { .. } => "dora",
            Event::Win { .. } => "win",
            Event::RoundEnd { .. } => "round_end",
            Event::Unknown => "unknown",
        }
    }
}

/// An event with its logical timestamp: `seq` orders events within the
/// round, `turn` is the round's discard counter when it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub seq: u64,
    pub turn: u32,
    pub event: Event,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventRecorder {
    events: Vec<RecordedEvent>,
    next_seq: u64,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, turn: u32, event: Event) {
        log::trace!("event #{} {}", self.next_seq, event.kind());
        self.events.push(RecordedEvent {
            seq: self.next_seq,
            turn,
            event,
        });
        self.next_seq += 1;
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Hands out the log; the recorder keeps counting from where it was.
    pub fn take(&mut self) -> Vec<RecordedEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::parse_tiles;

    #[test]
    fn sequence_numbers_are_strict() {
        let mut rec = EventRecorder::new();
        rec.record(0, Event::Riichi { seat: 1 });
        rec.record(0, Event::Riichi { seat: 2 });
        let seqs: Vec<u64> = rec.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(rec.take().len(), 2);
        assert!(rec.is_empty());
        rec.record(1, Event::Riichi { seat: 3 });
        assert_eq!(rec.events()[0].seq, 2);
    }

    #[test]
    fn json_discriminants() {
        let tile = parse_tiles("1z").unwrap()[0];
        let ev = Event::Draw {
            seat: 0,
            tile,
            rinshan: false,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "draw");
        assert_eq!(json["tile"], 108);
        assert_eq!(serde_json::to_value(Event::Dora { indicator: tile }).unwrap()["type"], "dora");
    }

    #[test]
    fn unknown_types_deserialize_to_fallback() {
        let ev: Event = serde_json::from_str(r#"{"type":"nukidora","seat":1}"#).unwrap();
        assert_eq!(ev, Event::Unknown);
        assert_eq!(ev.kind(), "unknown");
    }
}
