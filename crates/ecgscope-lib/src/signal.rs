use crate::annotations::BeatKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sampling frequency of the MIT-BIH recordings (Hz).
pub const SAMPLE_RATE: u32 = 360;

/// Maximum number of points returned for a single window.
pub const MAX_POINTS: usize = 5000;

/// Standard ECG leads present in the MIT-BIH dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Lead {
    #[serde(rename = "MLII")]
    Mlii,
    V1,
    V2,
    V4,
    V5,
}

impl Lead {
    pub const ALL: [Lead; 5] = [Lead::Mlii, Lead::V1, Lead::V2, Lead::V4, Lead::V5];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lead::Mlii => "MLII",
            Lead::V1 => "V1",
            Lead::V2 => "V2",
            Lead::V4 => "V4",
            Lead::V5 => "V5",
        }
    }
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lead {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Lead::ALL
            .into_iter()
            .find(|lead| lead.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown lead '{}' (expected MLII, V1, V2, V4 or V5)", s))
    }
}

/// One raw row of a recording: the sample index and whichever lead voltages it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSample {
    pub sample_index: usize,
    pub values: BTreeMap<Lead, f64>,
}

impl LeadSample {
    pub fn new(sample_index: usize) -> Self {
        Self {
            sample_index,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, lead: Lead, value: f64) -> Self {
        self.values.insert(lead, value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Seconds since the start of the recording.
    pub time: f64,
    pub values: BTreeMap<Lead, f64>,
}

/// Decimated multi-lead window, shaped like the dashboard's ECG payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowedSeries {
    pub record_id: String,
    pub sample_rate: u32,
    pub decimation: usize,
    pub actual_points: usize,
    pub time_range: TimeRange,
    pub leads: Vec<Lead>,
    pub data: Vec<SeriesPoint>,
}

impl WindowedSeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Finite values of `lead`, in time order, skipping points where it is undefined.
    pub fn lead_values(&self, lead: Lead) -> Vec<f64> {
        self.data
            .iter()
            .filter_map(|point| point.values.get(&lead).copied())
            .filter(|value| value.is_finite())
            .collect()
    }

    /// `(time, value)` pairs for `lead`.
    pub fn lead_points(&self, lead: Lead) -> Vec<[f64; 2]> {
        self.data
            .iter()
            .filter_map(|point| {
                point
                    .values
                    .get(&lead)
                    .filter(|value| value.is_finite())
                    .map(|value| [point.time, *value])
            })
            .collect()
    }
}

/// Annotated heartbeat on the recording timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    pub time: f64,
    pub symbol: char,
    #[serde(rename = "type")]
    pub kind: BeatKind,
    pub description: String,
    pub color: String,
}

impl BeatEvent {
    /// Build an event from its MIT-BIH symbol, filling category and display hints.
    pub fn from_symbol(time: f64, symbol: char) -> Self {
        let kind = BeatKind::from_symbol(symbol);
        Self {
            time,
            symbol,
            kind,
            description: kind.description().to_string(),
            color: kind.color().to_string(),
        }
    }
}
