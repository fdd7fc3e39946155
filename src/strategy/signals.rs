use crate::data::MarketBar;
use crate::strategy::{macd_series, Signal, SignalStrategy};

//long while the fast average is above the slow one, exit while below
//signals stay flat until the slow window has filled
#[derive(Debug, Clone)]
pub struct SmaSignalStrategy {
    fast_window: usize,
    slow_window: usize,
}

impl SmaSignalStrategy {
    pub fn new(fast_window: usize, slow_window: usize) -> Self {
        SmaSignalStrategy {
            fast_window,
            slow_window,
        }
    }
}

impl SignalStrategy for SmaSignalStrategy {
    fn signals(&self, bars: &[MarketBar]) -> Vec<Signal> {
        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
        let mut signals = Vec::with_capacity(bars.len());

        for i in 0..closes.len() {
            if i + 1 < self.slow_window {
                signals.push(Signal::Flat);
                continue;
            }

            let fast_slice = &closes[i + 1 - self.fast_window..=i];
            let slow_slice = &closes[i + 1 - self.slow_window..=i];
            let fast_ma = fast_slice.iter().sum::<f64>() / fast_slice.len() as f64;
            let slow_ma = slow_slice.iter().sum::<f64>() / slow_slice.len() as f64;

            signals.push(if fast_ma > slow_ma {
                Signal::Long
            } else if fast_ma < slow_ma {
                Signal::Exit
            } else {
                Signal::Flat
            });
        }

        signals
    }

    fn name(&self) -> &str {
        "SMA Signal"
    }
}

//long while the macd line is above its signal line
#[derive(Debug, Clone)]
pub struct MacdSignalStrategy {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl MacdSignalStrategy {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        MacdSignalStrategy { fast, slow, signal }
    }
}

impl Default for MacdSignalStrategy {
    fn default() -> Self {
        MacdSignalStrategy::new(12, 26, 9)
    }
}

impl SignalStrategy for MacdSignalStrategy {
    fn signals(&self, bars: &[MarketBar]) -> Vec<Signal> {
        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
        let (macd_line, signal_line) = macd_series(&closes, self.fast, self.slow, self.signal);

        macd_line
            .iter()
            .zip(signal_line.iter())
            .map(|(line, sig)| {
                if line > sig {
                    Signal::Long
                } else if line < sig {
                    Signal::Exit
                } else {
                    Signal::Flat
                }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "MACD Signal"
    }
}

//one-bar momentum scalper: long after an up close, exit after a down close
#[derive(Debug, Clone, Default)]
pub struct MomentumSignalStrategy;

impl SignalStrategy for MomentumSignalStrategy {
    fn signals(&self, bars: &[MarketBar]) -> Vec<Signal> {
        let mut signals = Vec::with_capacity(bars.len());

        for i in 0..bars.len() {
            if i == 0 {
                signals.push(Signal::Flat);
            } else if bars[i].close > bars[i - 1].close {
                signals.push(Signal::Long);
            } else if bars[i].close < bars[i - 1].close {
                signals.push(Signal::Exit);
            } else {
                signals.push(Signal::Flat);
            }
        }

        signals
    }

    fn name(&self) -> &str {
        "Momentum"
    }
}
