use crate::annotations::{BeatKind, EventFilter};
use crate::config::ViewerConfig;
use crate::metrics::distribution::{box_plot, histogram, BoxPlot, HistogramBin};
use crate::metrics::events::{
    event_distribution, project_events_with_tolerance, visible_events, EventShare, EventValue,
};
use crate::metrics::spectrum::{spectrogram_values, SpectrumBin};
use crate::signal::{BeatEvent, Lead, WindowedSeries};
use serde::{Deserialize, Serialize};

/// One statistics panel of the dashboard and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StatView {
    Histogram {
        lead: Lead,
        #[serde(default)]
        bins: Option<usize>,
    },
    Scatter {
        lead: Lead,
    },
    #[serde(rename = "boxplot")]
    BoxPlot {
        lead: Lead,
    },
    Events {
        #[serde(default, rename = "eventType")]
        event_type: Option<BeatKind>,
    },
    EventValues {
        lead: Lead,
        #[serde(default, rename = "eventType")]
        event_type: Option<BeatKind>,
    },
    Spectrogram {
        lead: Lead,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub time: f64,
    pub value: f64,
}

/// Chart-ready payload produced for a `StatView`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ChartData {
    Histogram(Vec<HistogramBin>),
    Scatter(Vec<ScatterPoint>),
    #[serde(rename = "boxplot")]
    BoxPlot(Option<BoxPlot>),
    Events(Vec<EventShare>),
    EventValues(Vec<EventValue>),
    Spectrogram(Vec<SpectrumBin>),
}

/// Compute the data behind `view`. Event-based views only consider events inside the
/// series' time range.
pub fn render_view(
    view: &StatView,
    series: &WindowedSeries,
    events: &[BeatEvent],
    cfg: &ViewerConfig,
) -> ChartData {
    let in_window = || {
        let range = series.time_range;
        visible_events(events, range.start, range.end - range.start, EventFilter::All)
    };
    match view {
        StatView::Histogram { lead, bins } => {
            ChartData::Histogram(histogram(series, *lead, bins.unwrap_or(cfg.histogram_bins)))
        }
        StatView::Scatter { lead } => ChartData::Scatter(
            series
                .lead_points(*lead)
                .into_iter()
                .map(|[time, value]| ScatterPoint { time, value })
                .collect(),
        ),
        StatView::BoxPlot { lead } => ChartData::BoxPlot(box_plot(series, *lead)),
        StatView::Events { event_type } => {
            ChartData::Events(event_distribution(&in_window(), (*event_type).into()))
        }
        StatView::EventValues { lead, event_type } => {
            ChartData::EventValues(project_events_with_tolerance(
                series,
                *lead,
                &in_window(),
                (*event_type).into(),
                cfg.event_tolerance_s,
            ))
        }
        StatView::Spectrogram { lead } => ChartData::Spectrogram(spectrogram_values(
            &series.lead_values(*lead),
            f64::from(cfg.sample_rate),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{SeriesPoint, TimeRange};
    use std::collections::BTreeMap;

    fn series() -> WindowedSeries {
        let data: Vec<SeriesPoint> = (0..64)
            .map(|i| SeriesPoint {
                time: 1.0 + i as f64 / 360.0,
                values: BTreeMap::from([(Lead::Mlii, (i % 8) as f64)]),
            })
            .collect();
        WindowedSeries {
            record_id: "100".into(),
            sample_rate: 360,
            decimation: 1,
            actual_points: data.len(),
            time_range: TimeRange {
                start: 1.0,
                end: 1.2,
            },
            leads: vec![Lead::Mlii],
            data,
        }
    }

    #[test]
    fn views_deserialize_from_tagged_json() {
        let view: StatView =
            serde_json::from_str(r#"{"type":"eventValues","lead":"MLII","eventType":"pvc"}"#)
                .unwrap();
        assert_eq!(
            view,
            StatView::EventValues {
                lead: Lead::Mlii,
                event_type: Some(BeatKind::Pvc)
            }
        );
        let view: StatView = serde_json::from_str(r#"{"type":"boxplot","lead":"V5"}"#).unwrap();
        assert_eq!(view, StatView::BoxPlot { lead: Lead::V5 });
        let view: StatView = serde_json::from_str(r#"{"type":"events"}"#).unwrap();
        assert_eq!(view, StatView::Events { event_type: None });
    }

    #[test]
    fn histogram_uses_configured_bins_by_default() {
        let cfg = ViewerConfig {
            histogram_bins: 4,
            ..ViewerConfig::default()
        };
        let view = StatView::Histogram {
            lead: Lead::Mlii,
            bins: None,
        };
        match render_view(&view, &series(), &[], &cfg) {
            ChartData::Histogram(bins) => {
                assert_eq!(bins.len(), 4);
                assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 64);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn event_views_ignore_events_outside_window() {
        let events = vec![
            BeatEvent::from_symbol(0.5, 'N'),
            BeatEvent::from_symbol(1.05, 'V'),
            BeatEvent::from_symbol(1.1, 'N'),
        ];
        let cfg = ViewerConfig::default();
        match render_view(&StatView::Events { event_type: None }, &series(), &events, &cfg) {
            ChartData::Events(shares) => {
                assert_eq!(shares.len(), 2);
                assert_eq!(shares[0].percentage, 50.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        let view = StatView::EventValues {
            lead: Lead::Mlii,
            event_type: Some(BeatKind::Pvc),
        };
        match render_view(&view, &series(), &events, &cfg) {
            ChartData::EventValues(values) => {
                assert_eq!(values.len(), 1);
                assert_eq!(values[0].time, 1.05);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn scatter_spectrogram_and_boxplot() {
        let cfg = ViewerConfig::default();
        let s = series();
        match render_view(&StatView::Scatter { lead: Lead::Mlii }, &s, &[], &cfg) {
            ChartData::Scatter(points) => assert_eq!(points.len(), 64),
            other => panic!("unexpected {:?}", other),
        }
        match render_view(&StatView::Spectrogram { lead: Lead::Mlii }, &s, &[], &cfg) {
            ChartData::Spectrogram(bins) => assert_eq!(bins.len(), 32),
            other => panic!("unexpected {:?}", other),
        }
        match render_view(&StatView::BoxPlot { lead: Lead::V1 }, &s, &[], &cfg) {
            ChartData::BoxPlot(plot) => assert!(plot.is_none()),
            other => panic!("unexpected {:?}", other),
        }
        let json = serde_json::to_value(render_view(
            &StatView::BoxPlot { lead: Lead::Mlii },
            &s,
            &[],
            &cfg,
        ))
        .unwrap();
        assert_eq!(json["type"], "boxplot");
        assert_eq!(json["data"]["max"], 7.0);
    }
}
