use crate::config::ViewerConfig;
use crate::error::{EcgError, Result};
use crate::signal::{Lead, SeriesPoint, TimeRange, WindowedSeries};
use crate::store::SampleStore;
use crate::window::decimation::compute_decimation;
use log::{debug, warn};

/// Slack for `seconds * rate` landing a hair off an integer (0.1 * 360 = 36.000000000000007).
const INDEX_EPSILON: f64 = 1e-9;

/// Sample-index bounds and stride for one window request. Both bounds lie inside
/// `[start_s * rate, end_s * rate]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub start_index: usize,
    pub end_index: usize,
    pub decimation: usize,
}

impl WindowPlan {
    pub fn new(start_s: f64, end_s: f64, cfg: &ViewerConfig) -> Result<Self> {
        validate_range(start_s, end_s)?;
        let rate = f64::from(cfg.sample_rate);
        Ok(Self {
            start_index: (start_s * rate - INDEX_EPSILON).ceil() as usize,
            end_index: (end_s * rate + INDEX_EPSILON).floor() as usize,
            decimation: compute_decimation(end_s - start_s, cfg.sample_rate, cfg.max_points),
        })
    }

    /// Stride passed to the store, `None` when every sample is kept.
    pub fn stride(&self) -> Option<usize> {
        (self.decimation > 1).then_some(self.decimation)
    }
}

fn validate_range(start_s: f64, end_s: f64) -> Result<()> {
    if !start_s.is_finite() || !end_s.is_finite() || start_s < 0.0 || start_s >= end_s {
        return Err(EcgError::InvalidRange {
            start: start_s,
            end: end_s,
        });
    }
    Ok(())
}

/// Retrieve `[start_s, end_s]` of `record_id` as a decimated multi-lead series.
///
/// Only `available_leads` are copied into the output points. The result never holds
/// more than `cfg.max_points` points.
pub fn fetch_window<S: SampleStore + ?Sized>(
    store: &S,
    record_id: &str,
    start_s: f64,
    end_s: f64,
    available_leads: &[Lead],
    cfg: &ViewerConfig,
) -> Result<WindowedSeries> {
    let plan = WindowPlan::new(start_s, end_s, cfg)?;
    if available_leads.is_empty() {
        return Err(EcgError::NotFound(format!(
            "no leads available for record {}",
            record_id
        )));
    }
    debug!(
        "record {} window [{}, {}] -> samples {}..={} decimation {}",
        record_id, start_s, end_s, plan.start_index, plan.end_index, plan.decimation
    );

    let mut rows =
        store.fetch_samples(record_id, plan.start_index, plan.end_index, plan.stride())?;
    if rows.len() > cfg.max_points {
        warn!(
            "record {} returned {} rows for a {}-point budget, truncating",
            record_id,
            rows.len(),
            cfg.max_points
        );
        rows.truncate(cfg.max_points);
    }

    let rate = f64::from(cfg.sample_rate);
    let data: Vec<SeriesPoint> = rows
        .into_iter()
        .map(|row| SeriesPoint {
            time: row.sample_index as f64 / rate,
            values: row
                .values
                .into_iter()
                .filter(|(lead, _)| available_leads.contains(lead))
                .collect(),
        })
        .collect();

    Ok(WindowedSeries {
        record_id: record_id.to_string(),
        sample_rate: cfg.sample_rate,
        decimation: plan.decimation,
        actual_points: data.len(),
        time_range: TimeRange {
            start: start_s,
            end: end_s,
        },
        leads: available_leads.to_vec(),
        data,
    })
}

/// Look up the record's lead set from the store, then fetch the window.
pub fn fetch_record_window<S: SampleStore + ?Sized>(
    store: &S,
    record_id: &str,
    start_s: f64,
    end_s: f64,
    cfg: &ViewerConfig,
) -> Result<WindowedSeries> {
    validate_range(start_s, end_s)?;
    let leads = store.list_available_leads(record_id)?;
    fetch_window(store, record_id, start_s, end_s, &leads, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{BeatEvent, LeadSample};
    use crate::store::{MemoryStore, RecordData, RecordInfo};

    fn record_store(seconds: usize) -> MemoryStore {
        let mut data = RecordData::new(360, vec![Lead::Mlii, Lead::V5]);
        for idx in 0..=seconds * 360 {
            data.samples.push(
                LeadSample::new(idx)
                    .with_value(Lead::Mlii, (idx % 100) as f64 / 100.0)
                    .with_value(Lead::V5, -1.0)
                    .with_value(Lead::V1, 9.0),
            );
        }
        let mut store = MemoryStore::new();
        store.insert_record("100", data);
        store
    }

    #[test]
    fn thirty_second_window_is_decimated_by_three() {
        let store = record_store(40);
        let cfg = ViewerConfig::default();
        let series = fetch_record_window(&store, "100", 0.0, 30.0, &cfg).unwrap();
        assert_eq!(series.decimation, 3);
        assert_eq!(series.actual_points, series.data.len());
        assert!(series.actual_points <= 3601);
        assert!(series.actual_points <= cfg.max_points);
        assert_eq!(series.data[1].time, 3.0 / 360.0);
    }

    #[test]
    fn short_window_keeps_every_sample() {
        let store = record_store(5);
        let cfg = ViewerConfig::default();
        let series = fetch_record_window(&store, "100", 1.0, 2.0, &cfg).unwrap();
        assert_eq!(series.decimation, 1);
        assert_eq!(series.len(), 361);
        assert_eq!(series.data[0].time, 1.0);
        assert!(series
            .data
            .windows(2)
            .all(|pair| pair[0].time < pair[1].time));
    }

    #[test]
    fn only_available_leads_are_emitted() {
        let store = record_store(1);
        let cfg = ViewerConfig::default();
        let series = fetch_window(&store, "100", 0.0, 0.5, &[Lead::V5], &cfg).unwrap();
        assert_eq!(series.leads, vec![Lead::V5]);
        assert!(series
            .data
            .iter()
            .all(|p| p.values.len() == 1 && p.values.contains_key(&Lead::V5)));
    }

    #[test]
    fn output_never_exceeds_budget() {
        let store = record_store(10);
        let cfg = ViewerConfig {
            max_points: 100,
            ..ViewerConfig::default()
        };
        // 3600 samples / 100 = stride 36, inclusive bounds would give 101 rows
        let series = fetch_record_window(&store, "100", 0.0, 10.0, &cfg).unwrap();
        assert_eq!(series.decimation, 36);
        assert_eq!(series.len(), 100);
    }

    #[test]
    fn fractional_bounds_stay_inside_window() {
        let store = record_store(2);
        let cfg = ViewerConfig::default();
        let series = fetch_record_window(&store, "100", 0.1, 0.2, &cfg).unwrap();
        assert_eq!(series.len(), 37);
        assert_eq!(series.data[0].time, 0.1);
        for (start, end) in [(0.1, 0.2), (1.001, 1.0014), (0.0042, 1.9993)] {
            let series = fetch_record_window(&store, "100", start, end, &cfg).unwrap();
            assert!(
                series
                    .data
                    .iter()
                    .all(|p| p.time >= start - 1e-12 && p.time <= end + 1e-12),
                "{start}..{end}"
            );
        }
        // no sample falls between 1.001 s and 1.0014 s
        let series = fetch_record_window(&store, "100", 1.001, 1.0014, &cfg).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn rejects_bad_ranges() {
        let store = record_store(1);
        let cfg = ViewerConfig::default();
        for (start, end) in [(2.0, 1.0), (1.0, 1.0), (-1.0, 3.0), (0.0, f64::NAN)] {
            let err = fetch_record_window(&store, "100", start, end, &cfg).unwrap_err();
            assert!(matches!(err, EcgError::InvalidRange { .. }), "{start}..{end}");
        }
    }

    #[test]
    fn missing_record_or_leads_is_not_found() {
        let store = record_store(1);
        let cfg = ViewerConfig::default();
        assert!(matches!(
            fetch_record_window(&store, "999", 0.0, 1.0, &cfg),
            Err(EcgError::NotFound(_))
        ));
        assert!(matches!(
            fetch_window(&store, "100", 0.0, 1.0, &[], &cfg),
            Err(EcgError::NotFound(_))
        ));
    }

    struct FailingStore;

    impl SampleStore for FailingStore {
        fn list_records(&self) -> Result<Vec<RecordInfo>> {
            Ok(Vec::new())
        }
        fn record_info(&self, record_id: &str) -> Result<RecordInfo> {
            Err(EcgError::NotFound(record_id.to_string()))
        }
        fn list_available_leads(&self, _record_id: &str) -> Result<Vec<Lead>> {
            Ok(vec![Lead::Mlii])
        }
        fn fetch_samples(
            &self,
            _record_id: &str,
            _start: usize,
            _end: usize,
            _stride: Option<usize>,
        ) -> Result<Vec<LeadSample>> {
            Err(EcgError::Retrieval(anyhow::anyhow!("connection reset")))
        }
        fn fetch_events(&self, _record_id: &str) -> Result<Vec<BeatEvent>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn storage_failures_propagate() {
        let cfg = ViewerConfig::default();
        let err = fetch_record_window(&FailingStore, "100", 0.0, 1.0, &cfg).unwrap_err();
        assert!(matches!(err, EcgError::Retrieval(_)));
    }
}
