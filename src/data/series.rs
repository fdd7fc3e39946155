use crate::data::bar::MarketBar;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Empty bar series for {0}")]
    EmptySeries(String),
    #[error("Non-monotonic timestamp at index {index}: {current} does not follow {previous}")]
    NonMonotonicTimestamps {
        index: usize,
        previous: String,
        current: String,
    },
    #[error("Signal series length ({signals}) does not match bar series length ({bars})")]
    SignalLengthMismatch { bars: usize, signals: usize },
}

//checks that timestamps are strictly increasing with no duplicates
pub fn validate_monotonic(bars: &[MarketBar]) -> Result<(), DataError> {
    for i in 1..bars.len() {
        if bars[i].timestamp <= bars[i - 1].timestamp {
            return Err(DataError::NonMonotonicTimestamps {
                index: i,
                previous: bars[i - 1].timestamp.to_rfc3339(),
                current: bars[i].timestamp.to_rfc3339(),
            });
        }
    }
    Ok(())
}

//truncates every series to the minimum shared length, keeping the most recent bars
//multi-symbol stepping aligns series by position, so they must all be equal length
pub fn align_series(series: &mut IndexMap<String, Vec<MarketBar>>) -> usize {
    let min_length = series.values().map(|bars| bars.len()).min().unwrap_or(0);

    for bars in series.values_mut() {
        let excess = bars.len() - min_length;
        if excess > 0 {
            bars.drain(..excess);
        }
    }

    min_length
}

//removes bars sharing a timestamp with an earlier bar, keeping the first occurrence
//input must already be sorted by timestamp
pub fn dedup_by_timestamp(bars: &mut Vec<MarketBar>) {
    bars.dedup_by(|b, a| b.timestamp == a.timestamp);
}
