use crate::signal::{BeatEvent, Lead, LeadSample};
use crate::store::{MemoryStore, RecordData};
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Column positions of the MIT-BIH dashboard export.
struct Columns {
    sample: usize,
    record: usize,
    symbol: Option<usize>,
    description: Option<usize>,
    leads: Vec<(Lead, usize)>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| fold_header(h) == name);
        let sample = find("sample").ok_or_else(|| anyhow!("missing Sample column"))?;
        let record = find("registro")
            .or_else(|| find("record"))
            .ok_or_else(|| anyhow!("missing Registro column"))?;
        let leads: Vec<(Lead, usize)> = Lead::ALL
            .into_iter()
            .filter_map(|lead| find(&lead.as_str().to_lowercase()).map(|idx| (lead, idx)))
            .collect();
        if leads.is_empty() {
            anyhow::bail!("no lead columns (MLII, V1, V2, V4, V5) in header");
        }
        Ok(Self {
            sample,
            record,
            symbol: find("simbolo").or_else(|| find("symbol")),
            description: find("descripcion").or_else(|| find("description")),
            leads,
        })
    }
}

/// Lowercase and strip the Spanish accents used in the export headers.
fn fold_header(header: &str) -> String {
    header
        .trim()
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' => 'u',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Blank and literal `0` cells mark a lead the record does not carry.
fn is_absent(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || cell == "0"
}

/// Load the combined MIT-BIH CSV (one row per sample, optional beat symbol) from disk.
///
/// A lead is available for a record when at least one of its cells is neither blank
/// nor `0`. Non-finite cells are treated as blank.
pub fn read_dashboard_csv(path: &Path, sample_rate: u32) -> Result<MemoryStore> {
    let file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_dashboard_csv(file, sample_rate).with_context(|| format!("in {}", path.display()))
}

pub fn parse_dashboard_csv<R: Read>(reader: R, sample_rate: u32) -> Result<MemoryStore> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers().context("reading header")?.clone();
    let columns = Columns::locate(&headers)?;
    let rate = f64::from(sample_rate.max(1));

    let mut records: BTreeMap<String, RecordData> = BTreeMap::new();
    for (line, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("reading row {}", line + 2))?;
        let record_id = row.get(columns.record).unwrap_or("").trim();
        if record_id.is_empty() {
            warn!("row {} has no record id, skipping", line + 2);
            continue;
        }
        let sample_str = row.get(columns.sample).unwrap_or("");
        let sample = sample_str
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite() && *s >= 0.0)
            .with_context(|| format!("row {}: bad sample index '{}'", line + 2, sample_str))?
            as usize;

        let data = records.entry(record_id.to_string()).or_insert_with(|| {
            let description = columns
                .description
                .and_then(|idx| row.get(idx))
                .filter(|d| !d.is_empty())
                .map(str::to_string);
            RecordData {
                description,
                ..RecordData::new(sample_rate, Vec::new())
            }
        });

        let mut values = LeadSample::new(sample);
        for (lead, idx) in &columns.leads {
            let cell = row.get(*idx).unwrap_or("");
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    // a lead is offered once any row carries a real reading for it
                    if !is_absent(cell) && !data.leads.contains(lead) {
                        data.leads.push(*lead);
                    }
                    values.values.insert(*lead, value);
                }
                Ok(_) => warn!("row {}: ignoring non-finite {} '{}'", line + 2, lead, cell),
                Err(_) => warn!("row {}: ignoring non-numeric {} '{}'", line + 2, lead, cell),
            }
        }
        data.samples.push(values);

        if let Some(symbol) = columns
            .symbol
            .and_then(|idx| row.get(idx))
            .and_then(|s| s.chars().next())
        {
            data.events
                .push(BeatEvent::from_symbol(sample as f64 / rate, symbol));
        }
    }

    let mut store = MemoryStore::new();
    for (id, data) in records {
        debug!(
            "record {}: {} samples, {} events, leads {:?}",
            id,
            data.samples.len(),
            data.events.len(),
            data.leads
        );
        store.insert_record(id, data);
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SampleStore;
    use std::path::PathBuf;

    const SAMPLE: &str = "\
MLII,V5,Sample,Símbolo,Descripción,Registro,V1,V2,V4
-0.145,-0.065,0,,,100,,,
-0.120,-0.060,1,N,Normal beat,100,,,
-0.100,,2,,,100,,,
0,-0.3,0,,,102,,0.2,
0,-0.31,1,V,,102,,0.25,
";

    #[test]
    fn splits_rows_into_records() {
        let store = parse_dashboard_csv(SAMPLE.as_bytes(), 360).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.list_available_leads("100").unwrap(),
            vec![Lead::Mlii, Lead::V5]
        );
        // MLII is all zeros in 102, so it is not offered
        assert_eq!(
            store.list_available_leads("102").unwrap(),
            vec![Lead::V2, Lead::V5]
        );
    }

    #[test]
    fn blank_cells_stay_undefined() {
        let store = parse_dashboard_csv(SAMPLE.as_bytes(), 360).unwrap();
        let rows = store.fetch_samples("100", 0, 10, None).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(!rows[2].values.contains_key(&Lead::V5));
        assert_eq!(rows[2].values[&Lead::Mlii], -0.1);
    }

    #[test]
    fn symbols_become_events() {
        let store = parse_dashboard_csv(SAMPLE.as_bytes(), 360).unwrap();
        let events = store.fetch_events("100").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].symbol, 'N');
        assert!((events[0].time - 1.0 / 360.0).abs() < 1e-12);
        let events = store.fetch_events("102").unwrap();
        assert_eq!(events[0].description, "Premature ventricular contraction");
    }

    #[test]
    fn leading_zero_does_not_hide_a_lead() {
        let text = "MLII,V5,Sample,Registro\n0,0.1,0,100\n0.5,0.1,1,100\n0,,2,100\n";
        let store = parse_dashboard_csv(text.as_bytes(), 360).unwrap();
        assert_eq!(
            store.list_available_leads("100").unwrap(),
            vec![Lead::Mlii, Lead::V5]
        );
        let rows = store.fetch_samples("100", 0, 2, None).unwrap();
        assert_eq!(rows[0].values[&Lead::Mlii], 0.0);
    }

    #[test]
    fn non_finite_cells_are_absent() {
        let text = "MLII,V5,Sample,Símbolo,Registro\nNaN,0.1,0,N,100\ninf,0.2,1,,100\n";
        let store = parse_dashboard_csv(text.as_bytes(), 360).unwrap();
        assert_eq!(store.list_available_leads("100").unwrap(), vec![Lead::V5]);
        let rows = store.fetch_samples("100", 0, 1, None).unwrap();
        assert!(rows.iter().all(|r| !r.values.contains_key(&Lead::Mlii)));
    }

    #[test]
    fn header_without_leads_is_rejected() {
        let text = "Sample,Registro\n0,100\n";
        assert!(parse_dashboard_csv(text.as_bytes(), 360).is_err());
    }

    #[test]
    fn reads_fixture_file() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .and_then(|p| p.parent())
            .expect("workspace root")
            .join("test_data/mitdb_sample.csv");
        let store = read_dashboard_csv(&path, 360).expect("read fixture");
        let info = store.record_info("100").unwrap();
        assert_eq!(info.total_samples, 1081);
        assert_eq!(store.fetch_events("100").unwrap().len(), 4);
    }
}
