//a Rust-based backtesting and portfolio accounting engine for spot markets

pub mod config;
pub mod data;
pub mod engine;
pub mod metrics;
pub mod portfolio;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        BacktestConfiguration, MacdParams, MetricsConfig, RsiParams, SmaParams, StrategyKind,
        StrategyParams,
    };
    pub use crate::data::{
        align_series, load_csv, validate_monotonic, CsvProvider, DataError, MarketBar,
        MarketDataProvider, ProviderError,
    };
    pub use crate::engine::{
        reconstruct_trades, BacktestResult, SteppedConfig, SteppedSimulator, TradePnl,
        VectorizedBacktest, VectorizedRun,
    };
    pub use crate::metrics::{EquityPoint, PerformanceSummary};
    pub use crate::portfolio::{Portfolio, Position, TradeAction, TradeRecord};
    pub use crate::strategy::{
        predictive::{Forecast, PredictiveStrategy, Predictor},
        rsi_reversion::RsiReversionStrategy,
        signals::{MacdSignalStrategy, MomentumSignalStrategy, SmaSignalStrategy},
        sma_cross::SmaCrossStrategy,
        Signal, SignalStrategy, StepContext, Strategy,
    };
}
