use crate::data::bar::MarketBar;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

//loads bars from a csv file and sorts them chronologically
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<MarketBar>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let mut bars = Vec::new();

    for (index, result) in reader.deserialize().enumerate() {
        let record: CsvRecord =
            result.context(format!("Failed to parse CSV record at line {}", index + 2))?;

        let timestamp = DateTime::parse_from_rfc3339(&record.timestamp)
            .context(format!(
                "Failed to parse timestamp '{}' at line {}",
                record.timestamp,
                index + 2
            ))?
            .with_timezone(&Utc);

        bars.push(MarketBar::new_unchecked(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }

    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    Ok(bars)
}
