use crate::data::bar::MarketBar;
use crate::data::loader::load_csv;
use crate::data::series::dedup_by_timestamp;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to fetch {symbol} {interval} [{start} .. {end}]: {reason}")]
    Fetch {
        symbol: String,
        interval: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        reason: String,
    },
    #[error("No bars available for {symbol} {interval} [{start} .. {end}]")]
    NoData {
        symbol: String,
        interval: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

//source of historical bars
//fetch errors are fatal for the run and carry enough context to retry by hand
pub trait MarketDataProvider {
    fn fetch(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: &str,
    ) -> Result<Vec<MarketBar>, ProviderError>;

    //fetches several adjacent windows ending at end, walking backwards one
    //chunk at a time, then merges them into a single sorted deduped series
    fn fetch_chunked(
        &self,
        symbol: &str,
        end: DateTime<Utc>,
        chunk: Duration,
        chunks: usize,
        interval: &str,
    ) -> Result<Vec<MarketBar>, ProviderError> {
        let mut bars = Vec::new();

        for x in 0..chunks {
            let chunk_end = end - chunk * x as i32;
            let chunk_start = chunk_end - chunk;
            bars.extend(self.fetch(symbol, chunk_start, chunk_end, interval)?);
        }

        bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        dedup_by_timestamp(&mut bars);

        if bars.is_empty() {
            return Err(ProviderError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
                start: end - chunk * chunks as i32,
                end,
            });
        }

        Ok(bars)
    }
}

//provider backed by a csv file loaded once up front
pub struct CsvProvider {
    bars: Vec<MarketBar>,
}

impl CsvProvider {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bars = load_csv(path)?;
        Ok(CsvProvider { bars })
    }

    pub fn from_bars(bars: Vec<MarketBar>) -> Self {
        CsvProvider { bars }
    }
}

impl MarketDataProvider for CsvProvider {
    fn fetch(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: &str,
    ) -> Result<Vec<MarketBar>, ProviderError> {
        let slice: Vec<MarketBar> = self
            .bars
            .iter()
            .filter(|bar| bar.timestamp >= start && bar.timestamp < end)
            .cloned()
            .collect();

        if slice.is_empty() {
            return Err(ProviderError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
                start,
                end,
            });
        }

        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn flat_bar(secs: i64, close: f64) -> MarketBar {
        MarketBar::new_unchecked(ts(secs), close, close, close, close, 0.0)
    }

    #[test]
    fn fetch_slices_by_range() {
        let provider = CsvProvider::from_bars((0..10).map(|i| flat_bar(i * 60, 1.0)).collect());
        let bars = provider.fetch("BTC-USD", ts(120), ts(300), "1min").unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp, ts(120));
    }

    #[test]
    fn fetch_empty_range_is_an_error() {
        let provider = CsvProvider::from_bars(vec![flat_bar(0, 1.0)]);
        let err = provider.fetch("BTC-USD", ts(600), ts(1200), "1min");
        assert!(matches!(err, Err(ProviderError::NoData { .. })));
    }

    #[test]
    fn chunked_fetch_merges_sorts_and_dedups() {
        let provider = CsvProvider::from_bars((0..20).map(|i| flat_bar(i * 60, i as f64)).collect());
        let bars = provider
            .fetch_chunked("BTC-USD", ts(1200), Duration::seconds(600), 2, "1min")
            .unwrap();

        assert_eq!(bars.len(), 20);
        for i in 1..bars.len() {
            assert!(bars[i].timestamp > bars[i - 1].timestamp);
        }
    }
}
