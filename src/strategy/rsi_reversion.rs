use crate::strategy::{rsi, StepContext, Strategy};

//per-step mean reversion: accumulates a fixed quantity while oversold,
//liquidates the whole holding when overbought
#[derive(Debug, Clone)]
pub struct RsiReversionStrategy {
    period: usize,
    oversold: f64,
    overbought: f64,
    quantity: f64,
}

impl RsiReversionStrategy {
    pub fn new(period: usize, oversold: f64, overbought: f64, quantity: f64) -> Self {
        RsiReversionStrategy {
            period,
            oversold,
            overbought,
            quantity,
        }
    }
}

impl Strategy for RsiReversionStrategy {
    fn on_bar(&mut self, context: &mut StepContext) {
        let closes = context.all_closes();

        let current_rsi = match rsi(&closes, self.period) {
            Some(v) => v,
            None => return,
        };

        let close = context.current_bar().close;

        if current_rsi < self.oversold {
            context.buy(self.quantity, close);
        } else if current_rsi > self.overbought {
            context.sell_max(close);
        }
    }

    fn on_end(&mut self, context: &mut StepContext) {
        let close = context.current_bar().close;
        context.sell_max(close);
    }

    fn name(&self) -> &str {
        "RSI Reversion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MarketBar;
    use crate::portfolio::Portfolio;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;

    fn window(closes: &[f64]) -> VecDeque<MarketBar> {
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

    #[test]
    fn buys_fixed_quantity_when_oversold() {
        //steadily falling closes drive rsi to 0
        let closes: Vec<f64> = (0..20).map(|i| 200.0 - i as f64).collect();
        let window = window(&closes);
        let mut portfolio = Portfolio::new(10_000.0);
        let timestamp = window.back().unwrap().timestamp;
        let mut context = StepContext::new("BTC-USD", timestamp, &window, &mut portfolio);

        let mut strategy = RsiReversionStrategy::new(14, 30.0, 70.0, 0.5);
        strategy.on_bar(&mut context);

        assert_eq!(portfolio.get_position("BTC-USD").unwrap().quantity, 0.5);
    }

    #[test]
    fn sells_out_when_overbought() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let window = window(&closes);
        let mut portfolio = Portfolio::new(10_000.0);
        let first_ts = Utc.timestamp_opt(0, 0).unwrap();
        assert!(portfolio.buy("BTC-USD", 1.0, 100.0, first_ts));

        let timestamp = window.back().unwrap().timestamp;
        let mut context = StepContext::new("BTC-USD", timestamp, &window, &mut portfolio);

        let mut strategy = RsiReversionStrategy::new(14, 30.0, 70.0, 0.5);
        strategy.on_bar(&mut context);

        assert!(portfolio.positions.is_empty());
    }
}
