use crate::error::{EcgError, Result};
use crate::signal::{BeatEvent, Lead, LeadSample};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read-only metadata describing one stored recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInfo {
    pub record_id: String,
    pub total_samples: usize,
    pub sample_rate: u32,
    /// Recording length in seconds; the navigation upper bound.
    pub duration_seconds: f64,
    pub leads: Vec<Lead>,
    pub description: Option<String>,
}

/// Storage collaborator the windowing core reads from.
pub trait SampleStore {
    fn list_records(&self) -> Result<Vec<RecordInfo>>;

    fn record_info(&self, record_id: &str) -> Result<RecordInfo>;

    /// Leads usable for `record_id`; `NotFound` for unknown records.
    fn list_available_leads(&self, record_id: &str) -> Result<Vec<Lead>>;

    /// Rows whose index lies in `[start, end]`, ascending. With a stride only rows with
    /// `(index - start) % stride == 0` are returned.
    fn fetch_samples(
        &self,
        record_id: &str,
        start: usize,
        end: usize,
        stride: Option<usize>,
    ) -> Result<Vec<LeadSample>>;

    fn fetch_events(&self, record_id: &str) -> Result<Vec<BeatEvent>>;
}

/// Samples, annotations and lead set of one recording held in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordData {
    pub sample_rate: u32,
    pub leads: Vec<Lead>,
    pub samples: Vec<LeadSample>,
    pub events: Vec<BeatEvent>,
    pub description: Option<String>,
}

impl RecordData {
    pub fn new(sample_rate: u32, leads: Vec<Lead>) -> Self {
        Self {
            sample_rate,
            leads,
            ..Default::default()
        }
    }

    /// Sort samples by index and events by time. Repeated sample indices keep their
    /// first row so window times stay strictly increasing.
    pub fn finish(&mut self) {
        self.samples.sort_by_key(|sample| sample.sample_index);
        let before = self.samples.len();
        self.samples.dedup_by_key(|sample| sample.sample_index);
        if self.samples.len() < before {
            warn!(
                "dropped {} rows with a repeated sample index",
                before - self.samples.len()
            );
        }
        self.events.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.leads.sort();
        self.leads.dedup();
    }

    fn info(&self, record_id: &str) -> RecordInfo {
        let total_samples = self
            .samples
            .last()
            .map_or(0, |sample| sample.sample_index + 1);
        RecordInfo {
            record_id: record_id.to_string(),
            total_samples,
            sample_rate: self.sample_rate,
            duration_seconds: total_samples as f64 / f64::from(self.sample_rate.max(1)),
            leads: self.leads.clone(),
            description: self.description.clone(),
        }
    }
}

/// In-memory `SampleStore` filled by the CSV and WFDB loaders.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, RecordData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_record(&mut self, record_id: impl Into<String>, mut data: RecordData) {
        data.finish();
        self.records.insert(record_id.into(), data);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record(&self, record_id: &str) -> Result<&RecordData> {
        self.records
            .get(record_id.trim())
            .ok_or_else(|| EcgError::NotFound(format!("record {}", record_id)))
    }
}

impl SampleStore for MemoryStore {
    fn list_records(&self) -> Result<Vec<RecordInfo>> {
        Ok(self
            .records
            .iter()
            .map(|(id, data)| data.info(id))
            .collect())
    }

    fn record_info(&self, record_id: &str) -> Result<RecordInfo> {
        Ok(self.record(record_id)?.info(record_id.trim()))
    }

    fn list_available_leads(&self, record_id: &str) -> Result<Vec<Lead>> {
        Ok(self.record(record_id)?.leads.clone())
    }

    fn fetch_samples(
        &self,
        record_id: &str,
        start: usize,
        end: usize,
        stride: Option<usize>,
    ) -> Result<Vec<LeadSample>> {
        let record = self.record(record_id)?;
        let stride = stride.unwrap_or(1).max(1);
        let first = record
            .samples
            .partition_point(|sample| sample.sample_index < start);
        Ok(record.samples[first..]
            .iter()
            .take_while(|sample| sample.sample_index <= end)
            .filter(|sample| (sample.sample_index - start) % stride == 0)
            .cloned()
            .collect())
    }

    fn fetch_events(&self, record_id: &str) -> Result<Vec<BeatEvent>> {
        Ok(self.record(record_id)?.events.clone())
    }
}
