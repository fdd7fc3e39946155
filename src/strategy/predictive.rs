use crate::data::MarketBar;
use crate::strategy::{StepContext, Strategy};
use std::collections::VecDeque;

//categorical model output for the next bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forecast {
    Sell,
    Hold,
    Buy,
}

//anything that can turn a context window into a forecast: an ml model,
//a remote inference service, or a scripted stub in tests
//each backtest run owns its predictor, there is no shared model state
pub trait Predictor: Send {
    fn predict(&mut self, window: &VecDeque<MarketBar>) -> Forecast;
}

//per-step strategy that trades a predictor's forecasts at the current close
pub struct PredictiveStrategy {
    predictor: Box<dyn Predictor>,
}

impl PredictiveStrategy {
    pub fn new(predictor: Box<dyn Predictor>) -> Self {
        PredictiveStrategy { predictor }
    }
}

impl Strategy for PredictiveStrategy {
    fn on_bar(&mut self, context: &mut StepContext) {
        let forecast = self.predictor.predict(context.window());
        let close = context.current_bar().close;

        match forecast {
            Forecast::Buy => {
                context.buy_max(close);
            }
            Forecast::Sell => {
                context.sell_max(close);
            }
            Forecast::Hold => {}
        }
    }

    fn on_end(&mut self, context: &mut StepContext) {
        let close = context.current_bar().close;
        context.sell_max(close);
    }

    fn name(&self) -> &str {
        "Predictive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::Portfolio;
    use chrono::{TimeZone, Utc};

    struct Scripted {
        forecasts: Vec<Forecast>,
        index: usize,
    }

    impl Predictor for Scripted {
        fn predict(&mut self, _window: &VecDeque<MarketBar>) -> Forecast {
            let forecast = self.forecasts[self.index % self.forecasts.len()];
            self.index += 1;
            forecast
        }
    }

    fn one_bar_window(close: f64) -> VecDeque<MarketBar> {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let mut window = VecDeque::new();
        window.push_back(MarketBar::new_unchecked(ts, close, close, close, close, 0.0));
        window
    }

    #[test]
    fn trades_follow_forecasts() {
        let window = one_bar_window(100.0);
        let mut portfolio = Portfolio::new(1_000.0);
        let timestamp = window.back().unwrap().timestamp;

        let mut strategy = PredictiveStrategy::new(Box::new(Scripted {
            forecasts: vec![Forecast::Buy, Forecast::Hold, Forecast::Sell],
            index: 0,
        }));

        let mut context = StepContext::new("BTC-USD", timestamp, &window, &mut portfolio);
        strategy.on_bar(&mut context);
        assert!(portfolio.get_position("BTC-USD").is_some());

        let mut context = StepContext::new("BTC-USD", timestamp, &window, &mut portfolio);
        strategy.on_bar(&mut context);
        assert!(portfolio.get_position("BTC-USD").is_some());

        let mut context = StepContext::new("BTC-USD", timestamp, &window, &mut portfolio);
        strategy.on_bar(&mut context);
        assert!(portfolio.positions.is_empty());
    }
}
