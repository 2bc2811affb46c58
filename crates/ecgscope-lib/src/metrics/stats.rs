use crate::metrics::round_to;
use crate::signal::{Lead, WindowedSeries};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Decimal places kept in displayed statistics.
pub const DISPLAY_DIGITS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl DescriptiveStats {
    pub fn rounded(&self, digits: i32) -> Self {
        Self {
            count: self.count,
            mean: round_to(self.mean, digits),
            median: round_to(self.median, digits),
            mode: round_to(self.mode, digits),
            std_dev: round_to(self.std_dev, digits),
            min: round_to(self.min, digits),
            max: round_to(self.max, digits),
        }
    }
}

/// Display statistics for `lead` over the window, `None` when the lead has no values.
pub fn describe(series: &WindowedSeries, lead: Lead) -> Option<DescriptiveStats> {
    describe_values(&series.lead_values(lead)).map(|stats| stats.rounded(DISPLAY_DIGITS))
}

/// Full-precision statistics over `values`.
pub fn describe_values(values: &[f64]) -> Option<DescriptiveStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

    Some(DescriptiveStats {
        count: n,
        mean,
        median,
        mode: mode(values),
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[n - 1],
    })
}

/// Most frequent value; among equally frequent values the first one seen wins.
fn mode(values: &[f64]) -> f64 {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    let mut slots: HashMap<u64, usize> = HashMap::new();
    for &value in values {
        // -0.0 and 0.0 count as the same reading
        let key = if value == 0.0 { 0u64 } else { value.to_bits() };
        match slots.get(&key) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(key, counts.len());
                counts.push((value, 1));
            }
        }
    }
    let mut best = counts[0];
    for &entry in &counts[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
    }
    best.0
}
