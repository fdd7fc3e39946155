pub mod backtest_config;

pub use backtest_config::{
    BacktestConfiguration, MacdParams, MetricsConfig, RsiParams, SmaParams, StrategyKind,
    StrategyParams,
};
