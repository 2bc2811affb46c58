use crate::metrics::spectrum::SpectrumBin;
use crate::signal::{BeatEvent, WindowedSeries};
use serde::{Deserialize, Serialize};

/// Palette assigned to leads by their position in the window's lead list.
pub const LEAD_PALETTE: [u32; 6] = [0x2563EB, 0xDC2626, 0x16A34A, 0xCA8A04, 0x9333EA, 0xC2410C];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }

    /// Parse `#RRGGBB`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Color)
    }
}

pub fn lead_color(index: usize) -> Color {
    Color(LEAD_PALETTE[index % LEAD_PALETTE.len()])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Vertical marker at an annotated beat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub x: f64,
    pub label: String,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
    pub markers: Vec<Marker>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
            markers: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over all series, `None` for an empty figure.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|series| match series {
            Series::Line(line) => line.points.iter(),
        });
        let first = points.next()?;
        let init = (first[0], first[0], first[1], first[1]);
        Some(points.fold(init, |(x0, x1, y0, y1), p| {
            (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1]))
        }))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

/// Bucket decimation keeping the first point of each bucket.
pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

/// One line per lead plus a marker for every event inside the window.
pub fn figure_from_window(
    series: &WindowedSeries,
    events: &[BeatEvent],
    max_points: usize,
) -> Figure {
    let title = format!(
        "Record {} ({:.1}-{:.1} s)",
        series.record_id, series.time_range.start, series.time_range.end
    );
    let mut fig = Figure::new(Some(title));
    fig.x.label = Some("time (s)".into());
    fig.y.label = Some("mV".into());
    for (index, lead) in series.leads.iter().enumerate() {
        fig.add_series(Series::Line(LineSeries {
            name: lead.to_string(),
            points: decimate_points(&series.lead_points(*lead), max_points),
            style: Style {
                width: 1.4,
                dash: None,
                color: lead_color(index),
            },
        }));
    }
    fig.markers = events
        .iter()
        .filter(|event| {
            event.time >= series.time_range.start && event.time <= series.time_range.end
        })
        .map(|event| Marker {
            x: event.time,
            label: event.symbol.to_string(),
            color: Color::from_hex(&event.color).unwrap_or(Color(0x9E9E9E)),
        })
        .collect();
    fig
}

pub fn figure_from_spectrum(title: &str, bins: &[SpectrumBin]) -> Figure {
    let mut fig = Figure::new(Some(title.to_string()));
    fig.x.label = Some("frequency (Hz)".into());
    fig.y.label = Some("magnitude (%)".into());
    fig.add_series(Series::Line(LineSeries {
        name: "spectrum".into(),
        points: bins
            .iter()
            .map(|bin| [bin.frequency, bin.magnitude_percent])
            .collect(),
        style: Style {
            width: 2.0,
            dash: None,
            color: Color(0xFF0077),
        },
    }));
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Lead, SeriesPoint, TimeRange};
    use std::collections::BTreeMap;

    #[test]
    fn decimation_keeps_bucket_heads() {
        let points: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, 0.0]).collect();
        let out = decimate_points(&points, 4);
        let xs: Vec<f64> = out.iter().map(|p| p[0]).collect();
        assert_eq!(xs, vec![0.0, 2.0, 5.0, 7.0]);
        assert_eq!(decimate_points(&points, 20).len(), 10);
    }

    #[test]
    fn window_figure_has_one_line_per_lead() {
        let series = WindowedSeries {
            record_id: "100".into(),
            sample_rate: 360,
            decimation: 1,
            actual_points: 2,
            time_range: TimeRange {
                start: 0.0,
                end: 1.0,
            },
            leads: vec![Lead::Mlii, Lead::V5],
            data: vec![
                SeriesPoint {
                    time: 0.0,
                    values: BTreeMap::from([(Lead::Mlii, -0.1), (Lead::V5, 0.3)]),
                },
                SeriesPoint {
                    time: 0.5,
                    values: BTreeMap::from([(Lead::Mlii, 0.9), (Lead::V5, 0.2)]),
                },
            ],
        };
        let events = vec![
            BeatEvent::from_symbol(0.5, 'V'),
            BeatEvent::from_symbol(3.0, 'N'),
        ];
        let fig = figure_from_window(&series, &events, 100);
        assert_eq!(fig.series.len(), 2);
        let Series::Line(second) = &fig.series[1];
        assert_eq!(second.name, "V5");
        assert_eq!(second.style.color, Color(0xDC2626));
        assert_eq!(fig.markers.len(), 1);
        assert_eq!(fig.markers[0].color, Color(0xF44336));
        assert_eq!(fig.bounds(), Some((0.0, 0.5, -0.1, 0.9)));
    }

    #[test]
    fn hex_colours_parse() {
        assert_eq!(Color::from_hex("#4CAF50"), Some(Color(0x4CAF50)));
        assert_eq!(Color(0x4CAF50).rgb(), (0x4C, 0xAF, 0x50));
        assert!(Color::from_hex("green").is_none());
    }
}
