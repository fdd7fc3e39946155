use crate::config::MetricsConfig;
use crate::data::series::{validate_monotonic, DataError};
use crate::data::MarketBar;
use crate::metrics::{drawdown_series, PerformanceSummary};
use crate::strategy::{Signal, SignalStrategy};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

//one reconstructed round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePnl {
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
}

//full output of one vectorized evaluation, all series aligned 1:1 with bars
#[derive(Debug, Clone)]
pub struct VectorizedRun {
    pub signals: Vec<Signal>,
    pub raw_returns: Vec<f64>,
    pub strategy_returns: Vec<f64>,
    pub portfolio_values: Vec<f64>,
    pub drawdowns: Vec<f64>,
    pub trades: Vec<TradePnl>,
    pub summary: PerformanceSummary,
}

//batch evaluator: derives strategy returns from a causally computed signal
//series with a one-step lag, no explicit step loop
#[derive(Debug, Clone)]
pub struct VectorizedBacktest {
    initial_capital: f64,
    metrics: MetricsConfig,
}

impl VectorizedBacktest {
    pub fn new(initial_capital: f64, metrics: MetricsConfig) -> Self {
        VectorizedBacktest {
            initial_capital,
            metrics,
        }
    }

    //runs a signal strategy over the bars and evaluates the result
    pub fn run(
        &self,
        bars: &[MarketBar],
        strategy: &dyn SignalStrategy,
    ) -> Result<VectorizedRun, DataError> {
        let signals = strategy.signals(bars);
        self.evaluate(bars, signals)
    }

    //evaluates a precomputed signal series against the bars
    //the position entered as of bar i-1's close earns bar i's return, so a
    //signal can never collect the return of the bar it was decided on
    pub fn evaluate(
        &self,
        bars: &[MarketBar],
        signals: Vec<Signal>,
    ) -> Result<VectorizedRun, DataError> {
        if bars.is_empty() {
            return Err(DataError::EmptySeries("<bars>".to_string()));
        }
        validate_monotonic(bars)?;
        if signals.len() != bars.len() {
            return Err(DataError::SignalLengthMismatch {
                bars: bars.len(),
                signals: signals.len(),
            });
        }

        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();

        let mut raw_returns = Vec::with_capacity(closes.len());
        raw_returns.push(0.0);
        for i in 1..closes.len() {
            raw_returns.push(closes[i] / closes[i - 1] - 1.0);
        }

        let effective: Vec<f64> = signals.iter().map(|s| s.effective_position()).collect();

        let mut strategy_returns = Vec::with_capacity(closes.len());
        strategy_returns.push(0.0);
        for i in 1..closes.len() {
            strategy_returns.push(effective[i - 1] * raw_returns[i]);
        }

        let mut portfolio_values = Vec::with_capacity(closes.len());
        let mut cumulative = 1.0;
        for r in &strategy_returns {
            cumulative *= 1.0 + r;
            portfolio_values.push(self.initial_capital * cumulative);
        }

        let drawdowns = drawdown_series(&portfolio_values);

        let trades = reconstruct_trades(&signals, &closes);
        let trade_pnls: Vec<f64> = trades.iter().map(|trade| trade.pnl).collect();

        let summary = PerformanceSummary::compute(
            &strategy_returns,
            &drawdowns,
            &trade_pnls,
            &self.metrics,
        );

        Ok(VectorizedRun {
            signals,
            raw_returns,
            strategy_returns,
            portfolio_values,
            drawdowns,
            trades,
            summary,
        })
    }

    //evaluates several strategies over the same bars in parallel, each run
    //owning its own state; results come back sorted by total return
    pub fn sweep(
        &self,
        bars: &[MarketBar],
        strategies: &[Box<dyn SignalStrategy>],
    ) -> Result<Vec<(String, PerformanceSummary)>, DataError> {
        let mut results: Vec<(String, PerformanceSummary)> = strategies
            .par_iter()
            .map(|strategy| {
                self.run(bars, strategy.as_ref())
                    .map(|run| (strategy.name().to_string(), run.summary))
            })
            .collect::<Result<_, _>>()?;

        results.sort_by(|a, b| {
            b.1.total_return
                .partial_cmp(&a.1.total_return)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(results)
    }
}

//derives discrete round trips from the position series, fifo by entry
//
//a transition to long queues that bar's close as an entry; a transition back
//to flat closes the oldest open entry; exits with nothing queued are no-ops
pub fn reconstruct_trades(signals: &[Signal], closes: &[f64]) -> Vec<TradePnl> {
    let mut trades = Vec::new();
    let mut entry_prices: VecDeque<f64> = VecDeque::new();

    let mut previous = match signals.first() {
        Some(signal) => signal.effective_position(),
        None => return trades,
    };

    for i in 1..signals.len() {
        let current = signals[i].effective_position();
        let change = current - previous;

        if change > 0.0 {
            entry_prices.push_back(closes[i]);
        } else if change < 0.0 {
            if let Some(entry_price) = entry_prices.pop_front() {
                let exit_price = closes[i];
                trades.push(TradePnl {
                    entry_price,
                    exit_price,
                    pnl: exit_price - entry_price,
                    pnl_pct: (exit_price - entry_price) / entry_price * 100.0,
                });
            }
        }

        previous = current;
    }

    trades
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bars(closes: &[f64]) -> Vec<MarketBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                MarketBar::new_unchecked(
                    Utc.timestamp_opt(i as i64 * 60, 0).unwrap(),
                    close,
                    close,
                    close,
                    close,
                    0.0,
                )
            })
            .collect()
    }

    fn signals(raw: &[i8]) -> Vec<Signal> {
        raw.iter()
            .map(|&s| match s {
                1 => Signal::Long,
                -1 => Signal::Exit,
                _ => Signal::Flat,
            })
            .collect()
    }

    fn backtest(initial: f64) -> VectorizedBacktest {
        VectorizedBacktest::new(initial, MetricsConfig::default())
    }

    #[test]
    fn reconstructs_two_round_trips() {
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        let trades = reconstruct_trades(&signals(&[0, 1, 1, 0, 1, 0]), &closes);

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].entry_price, 11.0);
        assert_eq!(trades[0].exit_price, 13.0);
        assert_eq!(trades[0].pnl, 2.0);
        assert_eq!(trades[1].entry_price, 14.0);
        assert_eq!(trades[1].exit_price, 15.0);
        assert_eq!(trades[1].pnl, 1.0);
    }

    #[test]
    fn exit_without_entry_is_a_no_op() {
        let closes = [10.0, 11.0, 12.0];
        let trades = reconstruct_trades(&signals(&[0, -1, -1]), &closes);
        assert!(trades.is_empty());
    }

    #[test]
    fn signal_length_mismatch_is_rejected() {
        let bars = bars(&[10.0, 11.0, 12.0]);
        let err = backtest(1000.0).evaluate(&bars, signals(&[0, 1]));
        assert!(matches!(err, Err(DataError::SignalLengthMismatch { .. })));
    }

    #[test]
    fn returns_are_lagged_one_step() {
        //long decided at bar 1 earns bar 2's return, not bar 1's
        let bars = bars(&[100.0, 110.0, 121.0, 121.0]);
        let run = backtest(1000.0)
            .evaluate(&bars, signals(&[0, 1, 0, 0]))
            .unwrap();

        assert_eq!(run.strategy_returns[0], 0.0);
        assert_eq!(run.strategy_returns[1], 0.0);
        assert!((run.strategy_returns[2] - 0.1).abs() < 1e-12);
        assert_eq!(run.strategy_returns[3], 0.0);
        assert!((run.portfolio_values[3] - 1100.0).abs() < 1e-9);
        assert!((run.summary.total_return - 0.1).abs() < 1e-12);
    }

    #[test]
    fn future_bars_cannot_influence_past_returns() {
        //position held at index 3 so the last return is live in both runs
        let closes = [100.0, 101.0, 102.0, 103.0, 104.0];
        let base_signals = [0, 1, 1, 1, 1];

        let run_a = backtest(1000.0)
            .evaluate(&bars(&closes), signals(&base_signals))
            .unwrap();

        //mutate only the last bar and last signal
        let mut closes_b = closes;
        closes_b[4] = 90.0;
        let mut signals_b = base_signals;
        signals_b[4] = -1;

        let run_b = backtest(1000.0)
            .evaluate(&bars(&closes_b), signals(&signals_b))
            .unwrap();

        //everything strictly before the mutated index is untouched
        for i in 0..4 {
            assert_eq!(run_a.strategy_returns[i], run_b.strategy_returns[i]);
        }
        //the mutated bar's own return does change
        assert_ne!(run_a.strategy_returns[4], run_b.strategy_returns[4]);
    }

    #[test]
    fn all_flat_signals_produce_no_trades() {
        let bars = bars(&[100.0, 101.0, 99.0, 100.0]);
        let run = backtest(1000.0).evaluate(&bars, signals(&[0, 0, 0, 0])).unwrap();

        assert!(run.trades.is_empty());
        assert_eq!(run.summary.total_trades, 0);
        assert_eq!(run.summary.win_rate, None);
        assert_eq!(run.summary.total_return, 0.0);
    }

    #[test]
    fn drawdown_tracks_running_peak() {
        let bars = bars(&[100.0, 110.0, 99.0, 105.0]);
        let run = backtest(1000.0)
            .evaluate(&bars, signals(&[1, 1, 1, 1]))
            .unwrap();

        assert_eq!(run.drawdowns[1], 0.0);
        assert!((run.drawdowns[2] - (99.0 / 110.0 - 1.0)).abs() < 1e-12);
        assert!((run.summary.max_drawdown - (99.0 / 110.0 - 1.0)).abs() < 1e-12);
    }

    struct ConstantSignal {
        label: &'static str,
        signal: Signal,
    }

    impl SignalStrategy for ConstantSignal {
        fn signals(&self, bars: &[MarketBar]) -> Vec<Signal> {
            vec![self.signal; bars.len()]
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    #[test]
    fn sweep_ranks_strategies_by_total_return() {
        let bars = bars(&[100.0, 110.0, 121.0, 133.1]);
        let strategies: Vec<Box<dyn SignalStrategy>> = vec![
            Box::new(ConstantSignal {
                label: "always flat",
                signal: Signal::Flat,
            }),
            Box::new(ConstantSignal {
                label: "always long",
                signal: Signal::Long,
            }),
        ];

        let results = backtest(1000.0).sweep(&bars, &strategies).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "always long");
        assert!(results[0].1.total_return > results[1].1.total_return);
    }
}
