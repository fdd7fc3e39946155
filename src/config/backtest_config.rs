use serde::{Deserialize, Serialize};
use std::path::PathBuf;

//which engine path and decision rule to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    SmaCross,
    RsiReversion,
    SmaSignal,
    MacdSignal,
    Momentum,
}

impl StrategyKind {
    //parse strategy kind from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sma" | "sma_cross" => Some(StrategyKind::SmaCross),
            "rsi" | "rsi_reversion" => Some(StrategyKind::RsiReversion),
            "sma_signal" => Some(StrategyKind::SmaSignal),
            "macd" | "macd_signal" => Some(StrategyKind::MacdSignal),
            "momentum" => Some(StrategyKind::Momentum),
            _ => None,
        }
    }

    //true for strategies that run on the vectorized path
    pub fn is_vectorized(&self) -> bool {
        matches!(
            self,
            StrategyKind::SmaSignal | StrategyKind::MacdSignal | StrategyKind::Momentum
        )
    }
}

//moving-average strategy parameters, shared by both engine paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmaParams {
    pub fast_window: usize,
    pub slow_window: usize,
}

impl Default for SmaParams {
    fn default() -> Self {
        SmaParams {
            fast_window: 50,
            slow_window: 100,
        }
    }
}

//rsi reversion strategy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsiParams {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub quantity: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        RsiParams {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
            quantity: 0.1,
        }
    }
}

//macd signal strategy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        MacdParams {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

//strategy-specific parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StrategyParams {
    Sma(SmaParams),
    Rsi(RsiParams),
    Macd(MacdParams),
    Momentum,
}

//annualization constants for the performance reporter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    //365 suits continuous crypto-style series
    pub periods_per_year: f64,
    pub risk_free_rate: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            periods_per_year: 365.0,
            risk_free_rate: 0.0,
        }
    }
}

//complete backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfiguration {
    //data
    pub data_path: PathBuf,
    pub symbol: String,

    //account settings
    pub initial_capital: f64,

    //stepped simulator settings
    pub context_length: usize,
    pub extended_context: bool,

    //strategy
    pub strategy: StrategyKind,
    pub params: StrategyParams,

    //reporting
    pub metrics: MetricsConfig,
    pub output_equity_csv: Option<PathBuf>,
    pub output_trades_csv: Option<PathBuf>,
}

impl Default for BacktestConfiguration {
    fn default() -> Self {
        BacktestConfiguration {
            data_path: PathBuf::from("data.csv"),
            symbol: "BTC-USD".to_string(),
            initial_capital: 10000.0,
            context_length: 100,
            extended_context: false,
            strategy: StrategyKind::SmaCross,
            params: StrategyParams::Sma(SmaParams::default()),
            metrics: MetricsConfig::default(),
            output_equity_csv: None,
            output_trades_csv: None,
        }
    }
}

impl BacktestConfiguration {
    //load configuration from a JSON file
    pub fn from_json_file(path: &PathBuf) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BacktestConfiguration = serde_json::from_str(&contents)?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
