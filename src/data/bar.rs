use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BarError {
    #[error("Invalid OHLC values: high ({high}) < low ({low})")]
    InvalidHighLow { high: f64, low: f64 },
    #[error("Invalid OHLC values: close ({close}) outside high-low range [{low}, {high}]")]
    InvalidClose { close: f64, high: f64, low: f64 },
    #[error("Invalid OHLC values: open ({open}) outside high-low range [{low}, {high}]")]
    InvalidOpen { open: f64, high: f64, low: f64 },
    #[error("Negative volume: {0}")]
    NegativeVolume(f64),
}

//a single ohlcv observation for one time interval
//series are keyed by symbol at the engine level, so the bar itself carries none
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl MarketBar {
    //creates a new bar with validation
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, BarError> {
        if high < low {
            return Err(BarError::InvalidHighLow { high, low });
        }

        if close < low || close > high {
            return Err(BarError::InvalidClose { close, high, low });
        }

        if open < low || open > high {
            return Err(BarError::InvalidOpen { open, high, low });
        }

        if volume < 0.0 {
            return Err(BarError::NegativeVolume(volume));
        }

        Ok(MarketBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    //creates a bar without validation
    pub fn new_unchecked(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        MarketBar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    //returns the typical price (HLC/3)
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    //returns the range (high - low)
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}
