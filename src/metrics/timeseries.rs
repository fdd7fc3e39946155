use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//a point in the equity curve
//drawdown is the peak-to-current decline as a fraction <= 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    pub drawdown: f64,
    pub returns: f64,
}

//builds the equity curve with per-point drawdown and simple returns
pub fn calculate_equity_curve(
    timestamps: &[DateTime<Utc>],
    equity_values: &[f64],
    initial_capital: f64,
) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(timestamps.len());
    let mut peak = initial_capital;
    let mut prev_equity = initial_capital;

    for (&timestamp, &equity) in timestamps.iter().zip(equity_values.iter()) {
        if equity > peak {
            peak = equity;
        }

        let drawdown = if peak > 0.0 { (equity - peak) / peak } else { 0.0 };
        let returns = (equity - prev_equity) / prev_equity;

        curve.push(EquityPoint {
            timestamp,
            equity,
            drawdown,
            returns,
        });
        prev_equity = equity;
    }

    curve
}

//drawdown series against the running maximum of values
pub fn drawdown_series(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut peak = f64::NEG_INFINITY;

    for &value in values {
        if value > peak {
            peak = value;
        }
        out.push(if peak > 0.0 { (value - peak) / peak } else { 0.0 });
    }

    out
}

//simple per-period returns from a value series
pub fn calculate_returns(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return vec![];
    }

    let mut returns = Vec::with_capacity(values.len() - 1);
    for i in 1..values.len() {
        returns.push((values[i] - values[i - 1]) / values[i - 1]);
    }
    returns
}
