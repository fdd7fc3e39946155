use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use pozole::prelude::*;
use prettytable::{Cell, Row, Table};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pozole")]
#[command(about = "A Rust-based backtesting engine for spot markets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //run a backtest described by a json configuration file
    Run {
        //path to configuration json
        #[arg(long)]
        config: PathBuf,
    },

    //run a per-step strategy through the stepped simulator
    Stepped {
        //path to csv data file
        #[arg(long)]
        data: PathBuf,

        //symbol to trade (eg BTC-USD)
        #[arg(long)]
        symbol: String,

        //strategy type (sma, rsi)
        #[arg(long)]
        strategy: String,

        //fast ma window (for sma strategy)
        #[arg(long)]
        fast: Option<usize>,

        //slow ma window (for sma strategy)
        #[arg(long)]
        slow: Option<usize>,

        //rsi lookback period (for rsi strategy)
        #[arg(long)]
        rsi_period: Option<usize>,

        //rsi lower threshold (for rsi strategy)
        #[arg(long)]
        rsi_lower: Option<f64>,

        //rsi upper threshold (for rsi strategy)
        #[arg(long)]
        rsi_upper: Option<f64>,

        //quantity per rsi buy
        #[arg(long, default_value = "0.1")]
        quantity: f64,

        //initial cash balance
        #[arg(long, default_value = "10000")]
        initial_capital: f64,

        //rolling context window length
        #[arg(long, default_value = "100")]
        context_length: usize,

        //let the context grow instead of sliding
        #[arg(long)]
        extended_context: bool,

        //output path for equity curve csv
        #[arg(long)]
        output_equity_csv: Option<PathBuf>,

        //output path for trades csv
        #[arg(long)]
        output_trades_csv: Option<PathBuf>,
    },

    //run a signal strategy through the vectorized evaluator
    Vectorized {
        //path to csv data file
        #[arg(long)]
        data: PathBuf,

        //symbol label for reporting
        #[arg(long)]
        symbol: String,

        //strategy type (sma_signal, macd, momentum)
        #[arg(long)]
        strategy: String,

        //fast ma window (for sma_signal strategy)
        #[arg(long)]
        fast: Option<usize>,

        //slow ma window (for sma_signal strategy)
        #[arg(long)]
        slow: Option<usize>,

        //initial cash balance
        #[arg(long, default_value = "10000")]
        initial_capital: f64,

        //output path for equity curve csv
        #[arg(long)]
        output_equity_csv: Option<PathBuf>,

        //output path for trades csv
        #[arg(long)]
        output_trades_csv: Option<PathBuf>,
    },

    //evaluate a grid of signal strategies in parallel and rank them
    Sweep {
        //path to csv data file
        #[arg(long)]
        data: PathBuf,

        //symbol label for reporting
        #[arg(long)]
        symbol: String,

        //initial cash balance
        #[arg(long, default_value = "10000")]
        initial_capital: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = BacktestConfiguration::from_json_file(&config)
                .context("Failed to load configuration")?;
            run_config(&config)
        }
        Commands::Stepped {
            data,
            symbol,
            strategy,
            fast,
            slow,
            rsi_period,
            rsi_lower,
            rsi_upper,
            quantity,
            initial_capital,
            context_length,
            extended_context,
            output_equity_csv,
            output_trades_csv,
        } => {
            let kind = StrategyKind::parse(&strategy)
                .ok_or_else(|| anyhow::anyhow!("Unknown strategy: {}", strategy))?;

            let params = match kind {
                StrategyKind::SmaCross => StrategyParams::Sma(SmaParams {
                    fast_window: fast.unwrap_or(50),
                    slow_window: slow.unwrap_or(100),
                }),
                StrategyKind::RsiReversion => StrategyParams::Rsi(RsiParams {
                    period: rsi_period.unwrap_or(14),
                    oversold: rsi_lower.unwrap_or(30.0),
                    overbought: rsi_upper.unwrap_or(70.0),
                    quantity,
                }),
                _ => anyhow::bail!("{} is not a stepped strategy", strategy),
            };

            run_config(&BacktestConfiguration {
                data_path: data,
                symbol,
                initial_capital,
                context_length,
                extended_context,
                strategy: kind,
                params,
                metrics: MetricsConfig::default(),
                output_equity_csv,
                output_trades_csv,
            })
        }
        Commands::Vectorized {
            data,
            symbol,
            strategy,
            fast,
            slow,
            initial_capital,
            output_equity_csv,
            output_trades_csv,
        } => {
            let kind = StrategyKind::parse(&strategy)
                .ok_or_else(|| anyhow::anyhow!("Unknown strategy: {}", strategy))?;

            let params = match kind {
                StrategyKind::SmaSignal => StrategyParams::Sma(SmaParams {
                    fast_window: fast.unwrap_or(50),
                    slow_window: slow.unwrap_or(100),
                }),
                StrategyKind::MacdSignal => StrategyParams::Macd(MacdParams::default()),
                StrategyKind::Momentum => StrategyParams::Momentum,
                _ => anyhow::bail!("{} is not a vectorized strategy", strategy),
            };

            run_config(&BacktestConfiguration {
                data_path: data,
                symbol,
                initial_capital,
                context_length: 100,
                extended_context: false,
                strategy: kind,
                params,
                metrics: MetricsConfig::default(),
                output_equity_csv,
                output_trades_csv,
            })
        }
        Commands::Sweep {
            data,
            symbol,
            initial_capital,
        } => run_sweep(data, symbol, initial_capital),
    }
}

fn run_config(config: &BacktestConfiguration) -> Result<()> {
    println!("Pozole Spot Backtesting Engine");
    println!("==============================\n");

    println!("Loading data from {:?}...", config.data_path);
    let bars = load_csv(&config.data_path)
        .context(format!("Failed to load data from {:?}", config.data_path))?;

    if bars.is_empty() {
        anyhow::bail!("No bars found in {:?}", config.data_path);
    }

    println!("Loaded {} bars for {}", bars.len(), config.symbol);
    println!(
        "Date range: {} to {}",
        bars.first().unwrap().timestamp,
        bars.last().unwrap().timestamp
    );
    println!("Initial capital: ${:.2}\n", config.initial_capital);

    if config.strategy.is_vectorized() {
        run_vectorized(config, &bars)
    } else {
        run_stepped(config, bars)
    }
}

fn run_stepped(config: &BacktestConfiguration, bars: Vec<MarketBar>) -> Result<()> {
    let mut strategy: Box<dyn Strategy> = match (&config.strategy, &config.params) {
        (StrategyKind::SmaCross, StrategyParams::Sma(p)) => {
            println!(
                "Strategy: SMA Trend (fast={}, slow={})",
                p.fast_window, p.slow_window
            );
            Box::new(SmaCrossStrategy::new(p.fast_window, p.slow_window))
        }
        (StrategyKind::RsiReversion, StrategyParams::Rsi(p)) => {
            println!(
                "Strategy: RSI Reversion (period={}, lower={}, upper={}, qty={})",
                p.period, p.oversold, p.overbought, p.quantity
            );
            Box::new(RsiReversionStrategy::new(
                p.period,
                p.oversold,
                p.overbought,
                p.quantity,
            ))
        }
        _ => anyhow::bail!("Strategy parameters do not match strategy kind"),
    };

    let mut data = IndexMap::new();
    data.insert(config.symbol.clone(), bars);

    let mut simulator = SteppedSimulator::new(
        data,
        SteppedConfig {
            initial_capital: config.initial_capital,
            context_length: config.context_length,
            extended_context: config.extended_context,
        },
    )?;

    println!("Running stepped backtest...\n");
    let result = simulator.run(strategy.as_mut(), &config.metrics);

    println!("Backtest Results");
    println!("================\n");
    result.summary.pretty_print_table();
    println!("\n{}", simulator.portfolio().position_summary());

    if let Some(path) = &config.output_equity_csv {
        save_equity_csv(&result.equity_curve, path)?;
        println!("Equity curve saved to {:?}", path);
    }

    if let Some(path) = &config.output_trades_csv {
        save_trades_csv(&result.trades, path)?;
        println!("Trades saved to {:?}", path);
    }

    Ok(())
}

fn run_vectorized(config: &BacktestConfiguration, bars: &[MarketBar]) -> Result<()> {
    let strategy: Box<dyn SignalStrategy> = match (&config.strategy, &config.params) {
        (StrategyKind::SmaSignal, StrategyParams::Sma(p)) => {
            println!(
                "Strategy: SMA Signal (fast={}, slow={})",
                p.fast_window, p.slow_window
            );
            Box::new(SmaSignalStrategy::new(p.fast_window, p.slow_window))
        }
        (StrategyKind::MacdSignal, StrategyParams::Macd(p)) => {
            println!(
                "Strategy: MACD Signal (fast={}, slow={}, signal={})",
                p.fast, p.slow, p.signal
            );
            Box::new(MacdSignalStrategy::new(p.fast, p.slow, p.signal))
        }
        (StrategyKind::Momentum, _) => {
            println!("Strategy: Momentum");
            Box::new(MomentumSignalStrategy)
        }
        _ => anyhow::bail!("Strategy parameters do not match strategy kind"),
    };

    let backtest = VectorizedBacktest::new(config.initial_capital, config.metrics.clone());

    println!("Running vectorized backtest...\n");
    let run = backtest.run(bars, strategy.as_ref())?;

    println!("{} | {}", config.symbol, run.summary.one_line());
    println!();
    run.summary.pretty_print_table();

    if let Some(path) = &config.output_equity_csv {
        save_vectorized_csv(bars, &run, path)?;
        println!("Equity curve saved to {:?}", path);
    }

    if let Some(path) = &config.output_trades_csv {
        save_trade_pnl_csv(&run.trades, path)?;
        println!("Trades saved to {:?}", path);
    }

    Ok(())
}

fn run_sweep(data: PathBuf, symbol: String, initial_capital: f64) -> Result<()> {
    println!("Pozole Strategy Sweep");
    println!("=====================\n");

    let bars = load_csv(&data).context(format!("Failed to load data from {:?}", data))?;
    println!("Loaded {} bars for {}\n", bars.len(), symbol);

    let strategies: Vec<Box<dyn SignalStrategy>> = vec![
        Box::new(SmaSignalStrategy::new(10, 50)),
        Box::new(SmaSignalStrategy::new(20, 100)),
        Box::new(SmaSignalStrategy::new(50, 100)),
        Box::new(SmaSignalStrategy::new(50, 200)),
        Box::new(MacdSignalStrategy::default()),
        Box::new(MomentumSignalStrategy),
    ];

    let backtest = VectorizedBacktest::new(initial_capital, MetricsConfig::default());
    let results = backtest.sweep(&bars, &strategies)?;

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Strategy"),
        Cell::new("Total Return"),
        Cell::new("Max DD"),
        Cell::new("Sharpe"),
        Cell::new("Trades"),
    ]));

    for (name, summary) in &results {
        table.add_row(Row::new(vec![
            Cell::new(name),
            Cell::new(&format!("{:.3}%", summary.total_return * 100.0)),
            Cell::new(&format!("{:.3}%", summary.max_drawdown * 100.0)),
            Cell::new(
                &summary
                    .sharpe
                    .map(|s| format!("{:.3}", s))
                    .unwrap_or_else(|| "n/a".to_string()),
            ),
            Cell::new(&format!("{}", summary.total_trades)),
        ]));
    }

    table.printstd();
    Ok(())
}

fn save_equity_csv(equity_curve: &[EquityPoint], path: &PathBuf) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    writeln!(file, "timestamp,equity,drawdown,returns")?;

    for point in equity_curve {
        writeln!(
            file,
            "{},{},{},{}",
            point.timestamp.to_rfc3339(),
            point.equity,
            point.drawdown,
            point.returns
        )?;
    }

    Ok(())
}

fn save_trades_csv(trades: &[TradeRecord], path: &PathBuf) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    writeln!(file, "timestamp,symbol,action,quantity,price,cash_after")?;

    for trade in trades {
        writeln!(
            file,
            "{},{},{:?},{},{},{}",
            trade.timestamp.to_rfc3339(),
            trade.symbol,
            trade.action,
            trade.quantity,
            trade.price,
            trade.cash_after
        )?;
    }

    Ok(())
}

fn save_vectorized_csv(bars: &[MarketBar], run: &VectorizedRun, path: &PathBuf) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    writeln!(
        file,
        "timestamp,close,signal,strategy_return,portfolio_value,drawdown"
    )?;

    for (i, bar) in bars.iter().enumerate() {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            bar.timestamp.to_rfc3339(),
            bar.close,
            run.signals[i].as_i8(),
            run.strategy_returns[i],
            run.portfolio_values[i],
            run.drawdowns[i]
        )?;
    }

    Ok(())
}

fn save_trade_pnl_csv(trades: &[TradePnl], path: &PathBuf) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    writeln!(file, "entry_price,exit_price,pnl,pnl_pct")?;

    for trade in trades {
        writeln!(
            file,
            "{},{},{},{}",
            trade.entry_price, trade.exit_price, trade.pnl, trade.pnl_pct
        )?;
    }

    Ok(())
}
