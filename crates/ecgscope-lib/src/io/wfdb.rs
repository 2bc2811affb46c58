use crate::signal::{BeatEvent, Lead, LeadSample};
use crate::store::RecordData;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Raw MIT annotation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WfdbAnnotation {
    pub sample: usize,
    pub code: u8,
}

impl WfdbAnnotation {
    /// MIT-BIH symbol for the annotation code, if it has one.
    pub fn symbol(&self) -> Option<char> {
        let symbol = match self.code {
            1 => 'N',
            2 => 'L',
            3 => 'R',
            4 => 'a',
            5 => 'V',
            6 => 'F',
            7 => 'J',
            8 => 'A',
            9 => 'S',
            10 => 'E',
            11 => 'j',
            12 => '/',
            13 => 'Q',
            14 => '~',
            16 => '|',
            18 => 's',
            19 => 'T',
            20 => '*',
            21 => 'D',
            22 => '"',
            23 => '=',
            24 => 'p',
            25 => 'B',
            26 => '^',
            27 => 't',
            28 => '+',
            29 => 'u',
            30 => '?',
            31 => '!',
            32 => '[',
            33 => ']',
            34 => 'e',
            35 => 'n',
            36 => '@',
            37 => 'x',
            38 => 'f',
            39 => '(',
            40 => ')',
            41 => 'r',
            _ => return None,
        };
        Some(symbol)
    }

    pub fn is_beat(&self) -> bool {
        matches!(self.code, 1..=13 | 25 | 30 | 34 | 35 | 38)
    }
}

/// Load every signal of a WFDB header/data pair, naming the channels with `leads`
/// in header order. Channels without a lead name are skipped.
pub fn load_wfdb_record(header_path: &Path, leads: &[Lead]) -> Result<RecordData> {
    if !header_path.is_file() {
        anyhow::bail!("WFDB header {} not found", header_path.display());
    }
    let (header, signals) = wfdb_rust::parse_wfdb(header_path);
    if signals.is_empty() {
        anyhow::bail!("WFDB record {} has no signals", header_path.display());
    }
    let fs = header
        .record
        .sampling_frequency
        .map(|f| f as f64)
        .unwrap_or(360.0);
    let mut data = RecordData::new(fs.round() as u32, Vec::new());
    let total = signals.iter().map(|s| s.len()).max().unwrap_or(0);
    data.samples = (0..total).map(LeadSample::new).collect();

    for (channel, lead) in leads.iter().enumerate().take(signals.len()) {
        let spec = header.signal_specs.get(channel).with_context(|| {
            format!(
                "{} declares {} signal specs but carries data for channel {}",
                header_path.display(),
                header.signal_specs.len(),
                channel
            )
        })?;
        let gain = spec.adc_gain.unwrap_or(1.0) as f64;
        let baseline = spec.baseline.or(spec.adc_zero).unwrap_or(0) as f64;
        for (row, &raw) in data.samples.iter_mut().zip(signals[channel].iter()) {
            row.values.insert(*lead, (raw as f64 - baseline) / gain);
        }
        data.leads.push(*lead);
    }
    debug!(
        "loaded {} samples at {} Hz from {} (leads {:?})",
        total,
        fs,
        header_path.display(),
        data.leads
    );
    Ok(data)
}

/// Parse MIT annotation binary stream into samples & codes.
pub fn parse_wfdb_annotations(buf: &[u8]) -> Vec<WfdbAnnotation> {
    let mut out = Vec::new();
    let mut idx = 0;
    let mut sample: usize = 0;
    while idx + 2 <= buf.len() {
        let word = u16::from_le_bytes([buf[idx], buf[idx + 1]]);
        idx += 2;
        let code = (word >> 10) as u8;
        let diff = (word & 0x03FF) as usize;
        if code == 0 && diff == 0 {
            break;
        }
        match code {
            59 => {
                if idx + 4 > buf.len() {
                    break;
                }
                let high = u16::from_le_bytes([buf[idx], buf[idx + 1]]) as u32;
                let low = u16::from_le_bytes([buf[idx + 2], buf[idx + 3]]) as u32;
                idx += 4;
                let skip = (high << 16) | low;
                sample = sample.wrapping_add(skip as usize);
            }
            60..=62 => {
                // NUM/SUB/CHN carry no event
                sample = sample.wrapping_add(diff);
            }
            63 => {
                idx += diff;
                if diff % 2 != 0 && idx < buf.len() {
                    idx += 1;
                }
            }
            _ => {
                sample = sample.wrapping_add(diff);
                out.push(WfdbAnnotation { sample, code });
            }
        }
    }
    out
}

/// Beat annotations of `buf` as timed events.
pub fn annotations_to_events(buf: &[u8], sample_rate: u32) -> Vec<BeatEvent> {
    let rate = f64::from(sample_rate.max(1));
    parse_wfdb_annotations(buf)
        .into_iter()
        .filter(WfdbAnnotation::is_beat)
        .filter_map(|ann| {
            ann.symbol()
                .map(|symbol| BeatEvent::from_symbol(ann.sample as f64 / rate, symbol))
        })
        .collect()
}

/// Read a WFDB annotation file (ATR) and convert its beats to events.
pub fn load_wfdb_events(path: &Path, sample_rate: u32) -> Result<Vec<BeatEvent>> {
    let buf = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(annotations_to_events(&buf, sample_rate))
}
