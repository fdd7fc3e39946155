pub mod predictive;
pub mod rsi_reversion;
pub mod signals;
pub mod sma_cross;

use crate::data::MarketBar;
use crate::portfolio::{Portfolio, Position};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

//per-bar trading decision for the vectorized path
//Exit marks "close the long", it is not a short position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Exit,
    Flat,
    Long,
}

impl Signal {
    //position used for return attribution: Exit and Flat are both flat
    pub fn effective_position(&self) -> f64 {
        match self {
            Signal::Long => 1.0,
            _ => 0.0,
        }
    }

    pub fn as_i8(&self) -> i8 {
        match self {
            Signal::Exit => -1,
            Signal::Flat => 0,
            Signal::Long => 1,
        }
    }
}

//per-step strategy driven by the stepped simulator
pub trait Strategy: Send {
    //called once before the first step
    fn on_start(&mut self) {}

    //called after every step with the rolling context and portfolio access
    fn on_bar(&mut self, context: &mut StepContext);

    //called once after the last step, usually to flatten open positions
    fn on_end(&mut self, _context: &mut StepContext) {}

    fn name(&self) -> &str;
}

//vectorized strategy mapping a full bar series to a signal series
//the signal at index i may only read bars[0..=i]
pub trait SignalStrategy: Send + Sync {
    fn signals(&self, bars: &[MarketBar]) -> Vec<Signal>;

    fn name(&self) -> &str;
}

//view handed to a per-step strategy: the primary symbol's rolling context
//(current bar included as the last element) plus the portfolio
pub struct StepContext<'a> {
    pub symbol: &'a str,
    pub timestamp: DateTime<Utc>,
    window: &'a VecDeque<MarketBar>,
    pub portfolio: &'a mut Portfolio,
}

impl<'a> StepContext<'a> {
    pub fn new(
        symbol: &'a str,
        timestamp: DateTime<Utc>,
        window: &'a VecDeque<MarketBar>,
        portfolio: &'a mut Portfolio,
    ) -> Self {
        StepContext {
            symbol,
            timestamp,
            window,
            portfolio,
        }
    }

    //number of bars in the rolling context
    pub fn bar_count(&self) -> usize {
        self.window.len()
    }

    //the full rolling context, oldest first
    pub fn window(&self) -> &VecDeque<MarketBar> {
        self.window
    }

    //the just-arrived bar
    pub fn current_bar(&self) -> &MarketBar {
        self.window.back().expect("context window is never empty")
    }

    //close prices of the last n context bars, oldest first
    pub fn closes(&self, n: usize) -> Vec<f64> {
        let start = self.window.len().saturating_sub(n);
        self.window.range(start..).map(|bar| bar.close).collect()
    }

    //close prices of the whole context, oldest first
    pub fn all_closes(&self) -> Vec<f64> {
        self.window.iter().map(|bar| bar.close).collect()
    }

    pub fn position(&self) -> Option<&Position> {
        self.portfolio.get_position(self.symbol)
    }

    pub fn buy(&mut self, quantity: f64, price: f64) -> bool {
        self.portfolio.buy(self.symbol, quantity, price, self.timestamp)
    }

    pub fn sell(&mut self, quantity: f64, price: f64) -> bool {
        self.portfolio.sell(self.symbol, quantity, price, self.timestamp)
    }

    pub fn buy_max(&mut self, price: f64) -> bool {
        self.portfolio.buy_max(self.symbol, price, self.timestamp)
    }

    pub fn sell_max(&mut self, price: f64) -> bool {
        self.portfolio.sell_max(self.symbol, price, self.timestamp)
    }
}

//simple moving average over the whole slice
pub fn sma(prices: &[f64]) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }
    Some(prices.iter().sum::<f64>() / prices.len() as f64)
}

//exponential moving average series, seeded with the first value
pub fn ema_series(prices: &[f64], span: usize) -> Vec<f64> {
    if prices.is_empty() {
        return vec![];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(prices.len());
    let mut ema = prices[0];
    out.push(ema);

    for &price in &prices[1..] {
        ema = alpha * price + (1.0 - alpha) * ema;
        out.push(ema);
    }
    out
}

//relative strength index over the trailing period
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if prices.len() < period + 1 {
        return None;
    }

    let mut gains = Vec::new();
    let mut losses = Vec::new();

    for i in 1..prices.len() {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(-change);
        }
    }

    let avg_gain: f64 = gains.iter().rev().take(period).sum::<f64>() / period as f64;
    let avg_loss: f64 = losses.iter().rev().take(period).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

//macd line and signal line series
pub fn macd_series(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<f64>, Vec<f64>) {
    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_series(&macd_line, signal);

    (macd_line, signal_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_of_empty_is_none() {
        assert_eq!(sma(&[]), None);
        assert_eq!(sma(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn ema_starts_at_first_value() {
        let ema = ema_series(&[10.0, 10.0, 10.0], 5);
        assert_eq!(ema, vec![10.0, 10.0, 10.0]);
    }

    #[test]
    fn rsi_needs_enough_history() {
        assert_eq!(rsi(&[1.0, 2.0], 14), None);

        //monotonically rising prices saturate rsi at 100
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&rising, 14), Some(100.0));
    }

    #[test]
    fn macd_lines_have_input_length() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64).sin()).collect();
        let (line, signal) = macd_series(&closes, 12, 26, 9);
        assert_eq!(line.len(), closes.len());
        assert_eq!(signal.len(), closes.len());
    }

    #[test]
    fn effective_position_flattens_exit() {
        assert_eq!(Signal::Long.effective_position(), 1.0);
        assert_eq!(Signal::Flat.effective_position(), 0.0);
        assert_eq!(Signal::Exit.effective_position(), 0.0);
        assert_eq!(Signal::Exit.as_i8(), -1);
    }
}
