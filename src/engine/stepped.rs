use crate::config::MetricsConfig;
use crate::data::series::{align_series, validate_monotonic, DataError};
use crate::data::MarketBar;
use crate::metrics::{calculate_equity_curve, EquityPoint, PerformanceSummary};
use crate::portfolio::{Portfolio, TradeRecord};
use crate::strategy::{StepContext, Strategy};
use indexmap::IndexMap;
use std::collections::VecDeque;

//result of one backtest run, shared by both engine paths
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub summary: PerformanceSummary,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
}

//settings for the stepped simulator
#[derive(Debug, Clone)]
pub struct SteppedConfig {
    pub initial_capital: f64,

    //rolling context window length
    pub context_length: usize,

    //when set the context only ever grows instead of sliding
    pub extended_context: bool,
}

impl Default for SteppedConfig {
    fn default() -> Self {
        SteppedConfig {
            initial_capital: 10000.0,
            context_length: 100,
            extended_context: false,
        }
    }
}

//event-driven simulator: advances an index over aligned bar series one step
//at a time, maintaining a rolling context per symbol and the portfolio marks
//
//the context holds only bars up to the current index, so a strategy reading
//it can never see the future
pub struct SteppedSimulator {
    config: SteppedConfig,
    symbols: Vec<String>,
    data: IndexMap<String, Vec<MarketBar>>,
    contexts: IndexMap<String, VecDeque<MarketBar>>,
    portfolio: Portfolio,
    current_index: usize,
}

impl SteppedSimulator {
    //validates and aligns the input series, then seeds the contexts
    //series of mismatched lengths are truncated to the shared most recent bars
    pub fn new(
        mut data: IndexMap<String, Vec<MarketBar>>,
        config: SteppedConfig,
    ) -> Result<Self, DataError> {
        if data.is_empty() {
            return Err(DataError::EmptySeries("<no symbols>".to_string()));
        }

        for (symbol, bars) in &data {
            if bars.is_empty() {
                return Err(DataError::EmptySeries(symbol.clone()));
            }
            validate_monotonic(bars)?;
        }

        align_series(&mut data);

        let symbols: Vec<String> = data.keys().cloned().collect();
        let contexts = seed_contexts(&data, config.context_length);
        let portfolio = Portfolio::new(config.initial_capital);

        Ok(SteppedSimulator {
            config,
            symbols,
            data,
            contexts,
            portfolio,
            current_index: 0,
        })
    }

    //advances one bar: context update, then mark-to-market, then history
    //append, in that order; returns false without mutating at the last index
    pub fn step(&mut self) -> bool {
        if self.current_index >= self.bar_count() - 1 {
            return false;
        }

        self.current_index += 1;

        for (symbol, bars) in &self.data {
            let context = &mut self.contexts[symbol];
            if !self.config.extended_context && context.len() == self.config.context_length {
                context.pop_front();
            }
            context.push_back(bars[self.current_index].clone());
        }

        let current_prices = self.current_prices();
        self.portfolio.update_positions(&current_prices);
        self.portfolio
            .pnl_history
            .push(self.portfolio.total_profit_loss());
        self.portfolio
            .pct_pnl_history
            .push(self.portfolio.total_profit_loss_pct());

        true
    }

    //returns to the first bar with a fresh portfolio and re-seeded contexts
    pub fn reset(&mut self) {
        self.current_index = 0;
        self.portfolio = Portfolio::new(self.config.initial_capital);
        self.contexts = seed_contexts(&self.data, self.config.context_length);
    }

    //drives a per-step strategy over the whole series
    pub fn run(&mut self, strategy: &mut dyn Strategy, metrics: &MetricsConfig) -> BacktestResult {
        strategy.on_start();

        while self.step() {
            let symbol = self.symbols[0].as_str();
            let timestamp = self.data[symbol][self.current_index].timestamp;
            let mut context =
                StepContext::new(symbol, timestamp, &self.contexts[symbol], &mut self.portfolio);
            strategy.on_bar(&mut context);
        }

        let symbol = self.symbols[0].as_str();
        let timestamp = self.data[symbol][self.current_index].timestamp;
        let mut context =
            StepContext::new(symbol, timestamp, &self.contexts[symbol], &mut self.portfolio);
        strategy.on_end(&mut context);

        self.build_result(metrics)
    }

    fn build_result(&self, metrics: &MetricsConfig) -> BacktestResult {
        let initial = self.config.initial_capital;
        let primary = &self.data[self.symbols[0].as_str()];

        //one history entry per completed step, starting at bar index 1
        let steps = self.portfolio.pnl_history.len();
        let timestamps: Vec<_> = primary[1..1 + steps].iter().map(|bar| bar.timestamp).collect();
        let equity_values: Vec<f64> = self
            .portfolio
            .pnl_history
            .iter()
            .map(|pnl| initial + pnl)
            .collect();

        let equity_curve = calculate_equity_curve(&timestamps, &equity_values, initial);
        let strategy_returns: Vec<f64> = equity_curve.iter().map(|point| point.returns).collect();
        let drawdowns: Vec<f64> = equity_curve.iter().map(|point| point.drawdown).collect();

        let summary = PerformanceSummary::compute(
            &strategy_returns,
            &drawdowns,
            &self.portfolio.realized_trade_pnls,
            metrics,
        );

        BacktestResult {
            summary,
            equity_curve,
            trades: self.portfolio.trade_history.clone(),
        }
    }

    //number of aligned bars per symbol
    pub fn bar_count(&self) -> usize {
        self.data[self.symbols[0].as_str()].len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        self.data[self.symbols[0].as_str()][self.current_index].timestamp
    }

    //close of every symbol at the current index
    pub fn current_prices(&self) -> IndexMap<String, f64> {
        self.data
            .iter()
            .map(|(symbol, bars)| (symbol.clone(), bars[self.current_index].close))
            .collect()
    }

    pub fn context(&self, symbol: &str) -> Option<&VecDeque<MarketBar>> {
        self.contexts.get(symbol)
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn portfolio_mut(&mut self) -> &mut Portfolio {
        &mut self.portfolio
    }
}

//each context starts with the first bar only and grows from there
fn seed_contexts(
    data: &IndexMap<String, Vec<MarketBar>>,
    context_length: usize,
) -> IndexMap<String, VecDeque<MarketBar>> {
    data.iter()
        .map(|(symbol, bars)| {
            let mut context = VecDeque::with_capacity(context_length);
            context.push_back(bars[0].clone());
            (symbol.clone(), context)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn flat_bars(closes: &[f64]) -> Vec<MarketBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                MarketBar::new_unchecked(ts(i as i64 * 60), close, close, close, close, 0.0)
            })
            .collect()
    }

    fn single_symbol(closes: &[f64], config: SteppedConfig) -> SteppedSimulator {
        let mut data = IndexMap::new();
        data.insert("BTC-USD".to_string(), flat_bars(closes));
        SteppedSimulator::new(data, config).unwrap()
    }

    #[test]
    fn non_monotonic_series_is_rejected_at_setup() {
        let mut bars = flat_bars(&[1.0, 2.0, 3.0]);
        bars[2].timestamp = ts(0);
        let mut data = IndexMap::new();
        data.insert("BTC-USD".to_string(), bars);

        assert!(SteppedSimulator::new(data, SteppedConfig::default()).is_err());
    }

    #[test]
    fn mismatched_series_are_truncated_to_shared_length() {
        let mut data = IndexMap::new();
        data.insert("A".to_string(), flat_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        data.insert("B".to_string(), flat_bars(&[1.0, 2.0, 3.0]));

        let sim = SteppedSimulator::new(data, SteppedConfig::default()).unwrap();
        assert_eq!(sim.bar_count(), 3);
        //the longer series keeps its most recent bars
        assert_eq!(sim.current_prices()["A"], 3.0);
    }

    #[test]
    fn step_marks_positions_then_appends_history() {
        let mut sim = single_symbol(
            &[100.0, 110.0, 120.0],
            SteppedConfig {
                initial_capital: 1000.0,
                ..SteppedConfig::default()
            },
        );
        assert!(sim.portfolio_mut().buy("BTC-USD", 1.0, 100.0, ts(0)));

        assert!(sim.step());
        assert_eq!(sim.portfolio().pnl_history, vec![10.0]);
        assert_eq!(
            sim.portfolio().get_position("BTC-USD").unwrap().current_price,
            110.0
        );

        assert!(sim.step());
        assert_eq!(sim.portfolio().pnl_history, vec![10.0, 20.0]);

        //exhausted: no state change
        let index_before = sim.current_index();
        assert!(!sim.step());
        assert_eq!(sim.current_index(), index_before);
        assert_eq!(sim.portfolio().pnl_history.len(), 2);
    }

    #[test]
    fn sliding_context_evicts_oldest_bar() {
        let mut sim = single_symbol(
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            SteppedConfig {
                context_length: 2,
                ..SteppedConfig::default()
            },
        );

        assert!(sim.step());
        assert!(sim.step());
        assert!(sim.step());

        let context = sim.context("BTC-USD").unwrap();
        assert_eq!(context.len(), 2);
        let closes: Vec<f64> = context.iter().map(|bar| bar.close).collect();
        assert_eq!(closes, vec![3.0, 4.0]);
    }

    #[test]
    fn extended_context_only_grows() {
        let mut sim = single_symbol(
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            SteppedConfig {
                context_length: 2,
                extended_context: true,
                ..SteppedConfig::default()
            },
        );

        while sim.step() {}

        assert_eq!(sim.context("BTC-USD").unwrap().len(), 5);
    }

    #[test]
    fn context_never_contains_future_bars() {
        let mut sim = single_symbol(&[1.0, 2.0, 3.0, 4.0], SteppedConfig::default());

        let closes: Vec<f64> = sim
            .context("BTC-USD")
            .unwrap()
            .iter()
            .map(|bar| bar.close)
            .collect();
        assert_eq!(closes, vec![1.0]);

        assert!(sim.step());
        let closes: Vec<f64> = sim
            .context("BTC-USD")
            .unwrap()
            .iter()
            .map(|bar| bar.close)
            .collect();
        assert_eq!(closes, vec![1.0, 2.0]);
    }

    #[test]
    fn reset_restores_fresh_state() {
        let mut sim = single_symbol(&[100.0, 110.0, 120.0], SteppedConfig::default());
        assert!(sim.portfolio_mut().buy_max("BTC-USD", 100.0, ts(0)));
        while sim.step() {}

        sim.reset();

        assert_eq!(sim.current_index(), 0);
        assert_eq!(sim.portfolio().cash, 10000.0);
        assert!(sim.portfolio().positions.is_empty());
        assert!(sim.portfolio().trade_history.is_empty());
        assert_eq!(sim.context("BTC-USD").unwrap().len(), 1);
    }

    //buys everything on the first decision, holds to the end
    struct BuyAndHold {
        bought: bool,
    }

    impl Strategy for BuyAndHold {
        fn on_bar(&mut self, context: &mut StepContext) {
            if !self.bought {
                let close = context.current_bar().close;
                self.bought = context.buy_max(close);
            }
        }

        fn on_end(&mut self, context: &mut StepContext) {
            let close = context.current_bar().close;
            context.sell_max(close);
        }

        fn name(&self) -> &str {
            "Buy and Hold"
        }
    }

    #[test]
    fn run_produces_consistent_result() {
        let mut sim = single_symbol(
            &[100.0, 100.0, 110.0, 121.0],
            SteppedConfig {
                initial_capital: 1000.0,
                ..SteppedConfig::default()
            },
        );

        let mut strategy = BuyAndHold { bought: false };
        let result = sim.run(&mut strategy, &MetricsConfig::default());

        //one buy after the first step, one liquidation at the end
        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.equity_curve.len(), 3);
        assert!((sim.portfolio().cash - 1210.0).abs() < 1e-6);
        assert!((result.summary.total_return - 0.21).abs() < 1e-9);
        assert_eq!(result.summary.total_trades, 1);
        assert_eq!(result.summary.win_rate, Some(1.0));
    }
}
