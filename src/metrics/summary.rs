use crate::config::MetricsConfig;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//summary statistics for one backtest run
//ratios that can be undefined (zero trades, zero variance, no losers or no
//winners) are None rather than 0 or infinity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe: Option<f64>,
    pub sortino: Option<f64>,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub rr_ratio: Option<f64>,
    pub breakeven_rate: Option<f64>,
    pub pt_ratio: Option<f64>,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub largest_win: Option<f64>,
    pub largest_loss: Option<f64>,
}

impl PerformanceSummary {
    //computes the summary from per-period strategy returns, the drawdown
    //series, and the realized per-trade pnl list
    pub fn compute(
        strategy_returns: &[f64],
        drawdowns: &[f64],
        trade_pnls: &[f64],
        config: &MetricsConfig,
    ) -> Self {
        let total_return = strategy_returns.iter().map(|r| 1.0 + r).product::<f64>() - 1.0;
        let max_drawdown = drawdowns.iter().copied().fold(0.0, f64::min);

        let periods = config.periods_per_year;
        let daily_rf = (1.0 + config.risk_free_rate).powf(1.0 / periods) - 1.0;

        let excess: Vec<f64> = strategy_returns.iter().map(|r| r - daily_rf).collect();
        let sharpe = annualized_ratio(&excess, excess.as_slice().mean(), periods);

        let downside: Vec<f64> = strategy_returns
            .iter()
            .copied()
            .filter(|r| *r < 0.0)
            .collect();
        let sortino = annualized_ratio(
            &downside,
            strategy_returns.mean() - daily_rf,
            periods,
        );

        let period_gains: f64 = strategy_returns.iter().filter(|r| **r > 0.0).sum();
        let period_losses: f64 = strategy_returns.iter().filter(|r| **r < 0.0).sum();
        let profit_factor = if period_gains > 0.0 && period_losses < 0.0 {
            Some(period_gains / period_losses.abs())
        } else {
            None
        };

        let wins: Vec<f64> = trade_pnls.iter().copied().filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = trade_pnls.iter().copied().filter(|p| *p < 0.0).collect();
        let total_trades = trade_pnls.len();

        let win_rate = if total_trades > 0 {
            Some(wins.len() as f64 / total_trades as f64)
        } else {
            None
        };

        let avg_win = if wins.is_empty() {
            None
        } else {
            Some(wins.iter().sum::<f64>() / wins.len() as f64)
        };
        let avg_loss = if losses.is_empty() {
            None
        } else {
            Some(losses.iter().sum::<f64>() / losses.len() as f64)
        };

        let rr_ratio = match (avg_win, avg_loss) {
            (Some(win), Some(loss)) => Some(win / loss.abs()),
            _ => None,
        };
        let breakeven_rate = rr_ratio.filter(|rr| *rr > 0.0).map(|rr| 1.0 / (rr + 1.0));

        let pt_ratio = if total_trades > 0 {
            Some(strategy_returns.iter().sum::<f64>() / total_trades as f64)
        } else {
            None
        };

        let largest_win = wins.iter().copied().fold(None, fold_max);
        let largest_loss = losses.iter().copied().fold(None, fold_min);

        PerformanceSummary {
            total_return,
            max_drawdown,
            sharpe,
            sortino,
            win_rate,
            profit_factor,
            rr_ratio,
            breakeven_rate,
            pt_ratio,
            total_trades,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
        }
    }

    //compact one-line form for progress output
    pub fn one_line(&self) -> String {
        format!(
            "TR: {:.2}% | Max DD: {:.2}% | PF: {} | RR: {} | WR: {} | Sharpe: {} | Trades: {}",
            self.total_return * 100.0,
            self.max_drawdown * 100.0,
            fmt_opt(self.profit_factor, 2),
            fmt_opt(self.rr_ratio, 2),
            fmt_opt(self.win_rate.map(|w| w * 100.0), 2),
            fmt_opt(self.sharpe, 3),
            self.total_trades
        )
    }

    //prints the summary as a formatted table
    pub fn pretty_print_table(&self) {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        table.add_row(Row::new(vec![
            Cell::new("Total Return"),
            Cell::new(&format!("{:.3}%", self.total_return * 100.0)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Max Drawdown"),
            Cell::new(&format!("{:.3}%", self.max_drawdown * 100.0)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Sharpe Ratio"),
            Cell::new(&fmt_opt(self.sharpe, 3)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Sortino Ratio"),
            Cell::new(&fmt_opt(self.sortino, 3)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Win Rate"),
            Cell::new(&fmt_opt(self.win_rate.map(|w| w * 100.0), 2)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Breakeven Rate"),
            Cell::new(&fmt_opt(self.breakeven_rate.map(|b| b * 100.0), 2)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Profit Factor"),
            Cell::new(&fmt_opt(self.profit_factor, 3)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("RR Ratio"),
            Cell::new(&fmt_opt(self.rr_ratio, 3)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("PT Ratio"),
            Cell::new(&fmt_opt(self.pt_ratio.map(|p| p * 100.0), 4)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Number of Trades"),
            Cell::new(&format!("{}", self.total_trades)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Winning / Losing"),
            Cell::new(&format!("{} / {}", self.winning_trades, self.losing_trades)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Avg Win"),
            Cell::new(&fmt_opt(self.avg_win, 4)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Avg Loss"),
            Cell::new(&fmt_opt(self.avg_loss, 4)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Largest Win"),
            Cell::new(&fmt_opt(self.largest_win, 4)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Largest Loss"),
            Cell::new(&fmt_opt(self.largest_loss, 4)),
        ]));

        table.printstd();
    }
}

//annualized mean/std ratio, None when the deviation is undefined or zero
fn annualized_ratio(deviation_sample: &[f64], numerator_mean: f64, periods: f64) -> Option<f64> {
    if deviation_sample.len() < 2 {
        return None;
    }

    let std_dev = deviation_sample.std_dev();
    if std_dev == 0.0 || !std_dev.is_finite() {
        return None;
    }

    Some(periods.sqrt() * numerator_mean / std_dev)
}

fn fold_max(acc: Option<f64>, value: f64) -> Option<f64> {
    Some(match acc {
        Some(best) => best.max(value),
        None => value,
    })
}

fn fold_min(acc: Option<f64>, value: f64) -> Option<f64> {
    Some(match acc {
        Some(worst) => worst.min(value),
        None => value,
    })
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MetricsConfig {
        MetricsConfig::default()
    }

    #[test]
    fn zero_trades_leave_trade_stats_undefined() {
        let summary = PerformanceSummary::compute(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0], &[], &config());

        assert_eq!(summary.total_trades, 0);
        assert_eq!(summary.win_rate, None);
        assert_eq!(summary.pt_ratio, None);
        assert_eq!(summary.rr_ratio, None);
        assert_eq!(summary.breakeven_rate, None);
        assert_eq!(summary.avg_win, None);
    }

    #[test]
    fn all_winning_runs_leave_profit_factor_undefined() {
        //no losing periods and no losing trades: undefined, not infinity
        let returns = [0.01, 0.02, 0.015];
        let summary = PerformanceSummary::compute(&returns, &[0.0; 3], &[5.0, 3.0], &config());

        assert_eq!(summary.profit_factor, None);
        assert_eq!(summary.win_rate, Some(1.0));
        assert_eq!(summary.rr_ratio, None);
        assert_eq!(summary.sortino, None);
    }

    #[test]
    fn zero_variance_returns_leave_sharpe_undefined() {
        let summary = PerformanceSummary::compute(&[0.01; 5], &[0.0; 5], &[1.0], &config());
        assert_eq!(summary.sharpe, None);
    }

    #[test]
    fn mixed_run_produces_defined_ratios() {
        let returns = [0.02, -0.01, 0.03, -0.02];
        let trades = [4.0, -2.0, 6.0];
        let summary = PerformanceSummary::compute(&returns, &[0.0, -0.01, 0.0, -0.02], &trades, &config());

        let expected_pf = (0.02 + 0.03) / (0.01 + 0.02);
        assert!((summary.profit_factor.unwrap() - expected_pf).abs() < 1e-12);
        assert!((summary.win_rate.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert!((summary.rr_ratio.unwrap() - 2.5).abs() < 1e-12);
        assert!((summary.breakeven_rate.unwrap() - 1.0 / 3.5).abs() < 1e-12);
        assert!((summary.pt_ratio.unwrap() - 0.02 / 3.0).abs() < 1e-12);
        assert_eq!(summary.max_drawdown, -0.02);
        assert_eq!(summary.largest_win, Some(6.0));
        assert_eq!(summary.largest_loss, Some(-2.0));
        assert!(summary.sharpe.is_some());
        assert!(summary.sortino.is_some());
    }
}
