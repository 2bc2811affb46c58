use crate::signal::BeatEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Beat category shown on the dashboard, derived from the MIT-BIH annotation symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeatKind {
    Normal,
    Lbbb,
    Rbbb,
    Pvc,
    Apb,
    Fusion,
    VFusion,
    AFusion,
    Nodal,
    VEscape,
    Aberrant,
    Junction,
    Pacemaker,
    VAberrant,
    Unknown,
}

impl BeatKind {
    pub const ALL: [BeatKind; 15] = [
        BeatKind::Normal,
        BeatKind::Lbbb,
        BeatKind::Rbbb,
        BeatKind::Pvc,
        BeatKind::Apb,
        BeatKind::Fusion,
        BeatKind::VFusion,
        BeatKind::AFusion,
        BeatKind::Nodal,
        BeatKind::VEscape,
        BeatKind::Aberrant,
        BeatKind::Junction,
        BeatKind::Pacemaker,
        BeatKind::VAberrant,
        BeatKind::Unknown,
    ];

    pub fn from_symbol(symbol: char) -> Self {
        match symbol {
            'N' => BeatKind::Normal,
            'L' => BeatKind::Lbbb,
            'R' => BeatKind::Rbbb,
            'V' => BeatKind::Pvc,
            'A' => BeatKind::Apb,
            'F' => BeatKind::Fusion,
            '/' => BeatKind::VFusion,
            'f' => BeatKind::AFusion,
            'j' => BeatKind::Nodal,
            'E' => BeatKind::VEscape,
            'a' => BeatKind::Aberrant,
            'J' => BeatKind::Junction,
            'S' => BeatKind::Pacemaker,
            'e' => BeatKind::VAberrant,
            _ => BeatKind::Unknown,
        }
    }

    /// Wire tag, e.g. `pvc`.
    pub fn tag(&self) -> &'static str {
        match self {
            BeatKind::Normal => "normal",
            BeatKind::Lbbb => "lbbb",
            BeatKind::Rbbb => "rbbb",
            BeatKind::Pvc => "pvc",
            BeatKind::Apb => "apb",
            BeatKind::Fusion => "fusion",
            BeatKind::VFusion => "vfusion",
            BeatKind::AFusion => "afusion",
            BeatKind::Nodal => "nodal",
            BeatKind::VEscape => "vescape",
            BeatKind::Aberrant => "aberrant",
            BeatKind::Junction => "junction",
            BeatKind::Pacemaker => "pacemaker",
            BeatKind::VAberrant => "vaberrant",
            BeatKind::Unknown => "unknown",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BeatKind::Normal => "Normal beat",
            BeatKind::Lbbb => "Left bundle branch block beat",
            BeatKind::Rbbb => "Right bundle branch block beat",
            BeatKind::Pvc => "Premature ventricular contraction",
            BeatKind::Apb => "Atrial premature beat",
            BeatKind::Fusion => "Fusion beat",
            BeatKind::VFusion => "Ventricular fusion beat",
            BeatKind::AFusion => "Atrial fusion beat",
            BeatKind::Nodal => "Nodal escape beat",
            BeatKind::VEscape => "Ventricular escape beat",
            BeatKind::Aberrant => "Aberrated atrial premature beat",
            BeatKind::Junction => "Junctional escape beat",
            BeatKind::Pacemaker => "Pacemaker beat",
            BeatKind::VAberrant => "Ventricular aberrant beat",
            BeatKind::Unknown => "Unclassified beat",
        }
    }

    /// Display colour as a `#RRGGBB` string.
    pub fn color(&self) -> &'static str {
        match self {
            BeatKind::Normal => "#4CAF50",
            BeatKind::Lbbb => "#2196F3",
            BeatKind::Rbbb => "#FFC107",
            BeatKind::Pvc => "#F44336",
            BeatKind::Apb => "#FF9800",
            BeatKind::Fusion | BeatKind::VFusion | BeatKind::AFusion => "#9C27B0",
            BeatKind::Nodal | BeatKind::Junction => "#795548",
            BeatKind::VEscape | BeatKind::VAberrant => "#00BCD4",
            BeatKind::Aberrant => "#607D8B",
            BeatKind::Pacemaker => "#E91E63",
            BeatKind::Unknown => "#9E9E9E",
        }
    }
}

impl fmt::Display for BeatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BeatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        BeatKind::ALL
            .into_iter()
            .find(|kind| kind.tag().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown beat type '{}'", s))
    }
}

/// Type filter applied before projecting or counting events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    #[default]
    All,
    Only(BeatKind),
}

impl EventFilter {
    pub fn matches(&self, event: &BeatEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Only(kind) => event.kind == *kind,
        }
    }
}

impl From<Option<BeatKind>> for EventFilter {
    fn from(kind: Option<BeatKind>) -> Self {
        kind.map_or(EventFilter::All, EventFilter::Only)
    }
}

impl FromStr for EventFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(EventFilter::All)
        } else {
            s.parse().map(EventFilter::Only)
        }
    }
}

/// Symbols that are not counted as beats in the per-record statistics.
const NON_BEAT_SYMBOLS: [char; 2] = ['Q', '+'];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatTypeCount {
    pub symbol: char,
    #[serde(rename = "type")]
    pub kind: BeatKind,
    pub description: String,
    pub color: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatStatistics {
    pub record_id: String,
    pub total_beats: usize,
    pub beat_types: Vec<BeatTypeCount>,
}

/// Count annotated beats per symbol, most frequent first; ties keep first-seen order.
pub fn beat_statistics(record_id: &str, events: &[BeatEvent]) -> BeatStatistics {
    let mut beat_types: Vec<BeatTypeCount> = Vec::new();
    for event in events {
        if event.symbol.is_whitespace() || NON_BEAT_SYMBOLS.contains(&event.symbol) {
            continue;
        }
        match beat_types.iter_mut().find(|row| row.symbol == event.symbol) {
            Some(row) => row.count += 1,
            None => beat_types.push(BeatTypeCount {
                symbol: event.symbol,
                kind: event.kind,
                description: event.kind.description().to_string(),
                color: event.kind.color().to_string(),
                count: 1,
            }),
        }
    }
    beat_types.sort_by(|a, b| b.count.cmp(&a.count));
    BeatStatistics {
        record_id: record_id.to_string(),
        total_beats: beat_types.iter().map(|row| row.count).sum(),
        beat_types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_symbols_fall_back_to_unknown() {
        assert_eq!(BeatKind::from_symbol('Q'), BeatKind::Unknown);
        assert_eq!(BeatKind::from_symbol('+'), BeatKind::Unknown);
        assert_eq!(BeatKind::from_symbol('~'), BeatKind::Unknown);
        assert_eq!(BeatKind::from_symbol('/'), BeatKind::VFusion);
    }

    #[test]
    fn tags_round_trip_through_from_str() {
        for kind in BeatKind::ALL {
            assert_eq!(kind.tag().parse::<BeatKind>().unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.tag());
        }
    }

    #[test]
    fn filter_parses_all_and_concrete_types() {
        assert_eq!("all".parse::<EventFilter>().unwrap(), EventFilter::All);
        assert_eq!(
            "PVC".parse::<EventFilter>().unwrap(),
            EventFilter::Only(BeatKind::Pvc)
        );
        assert!("bogus".parse::<EventFilter>().is_err());
        assert_eq!(EventFilter::from(None), EventFilter::All);
    }

    #[test]
    fn statistics_skip_non_beats_and_sort_by_count() {
        let events: Vec<BeatEvent> = ['A', 'N', 'Q', 'N', '+', 'V', 'N', 'A']
            .iter()
            .enumerate()
            .map(|(i, symbol)| BeatEvent::from_symbol(i as f64, *symbol))
            .collect();
        let stats = beat_statistics("100", &events);
        assert_eq!(stats.total_beats, 6);
        let symbols: Vec<char> = stats.beat_types.iter().map(|row| row.symbol).collect();
        assert_eq!(symbols, vec!['N', 'A', 'V']);
        assert_eq!(stats.beat_types[0].count, 3);
        assert_eq!(stats.beat_types[1].kind, BeatKind::Apb);
    }
}
