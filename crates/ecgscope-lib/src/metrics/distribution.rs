use crate::signal::{Lead, WindowedSeries};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    /// `"start-end"` with two decimals, as shown on the chart axis.
    pub range_label: String,
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxPlot {
    pub min: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub max: f64,
}

/// Equal-width histogram of `lead` over the window. Empty when the lead is undefined.
pub fn histogram(series: &WindowedSeries, lead: Lead, bin_count: usize) -> Vec<HistogramBin> {
    histogram_values(&series.lead_values(lead), bin_count)
}

pub fn histogram_values(values: &[f64], bin_count: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bin_count == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // all values equal: zero-width bins, everything lands in the first one
    let width = if max > min {
        (max - min) / bin_count as f64
    } else {
        0.0
    };

    let mut counts = vec![0usize; bin_count];
    for &value in values {
        let idx = if width > 0.0 {
            (((value - min) / width).floor() as usize).min(bin_count - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let start = min + i as f64 * width;
            let end = min + (i + 1) as f64 * width;
            HistogramBin {
                range_label: format!("{:.2}-{:.2}", start, end),
                start,
                end,
                count,
            }
        })
        .collect()
}

/// Five-number summary of `lead` using nearest-rank quartiles (`sorted[floor(n * q)]`).
pub fn box_plot(series: &WindowedSeries, lead: Lead) -> Option<BoxPlot> {
    box_plot_values(&series.lead_values(lead))
}

pub fn box_plot_values(values: &[f64]) -> Option<BoxPlot> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let rank = |fraction: f64| sorted[((n as f64 * fraction).floor() as usize).min(n - 1)];
    Some(BoxPlot {
        min: sorted[0],
        q1: rank(0.25),
        q2: rank(0.5),
        q3: rank(0.75),
        max: sorted[n - 1],
    })
}
