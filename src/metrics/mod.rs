pub mod summary;
pub mod timeseries;

pub use summary::PerformanceSummary;
pub use timeseries::{calculate_equity_curve, calculate_returns, drawdown_series, EquityPoint};
