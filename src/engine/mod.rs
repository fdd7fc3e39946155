pub mod stepped;
pub mod vectorized;

pub use stepped::{BacktestResult, SteppedConfig, SteppedSimulator};
pub use vectorized::{reconstruct_trades, TradePnl, VectorizedBacktest, VectorizedRun};
