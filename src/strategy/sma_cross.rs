use crate::strategy::{sma, StepContext, Strategy};

//per-step trend follower: fully allocates when the close sits above both
//moving averages, fully exits when it sits below both
#[derive(Debug, Clone)]
pub struct SmaCrossStrategy {
    fast_window: usize,
    slow_window: usize,
}

impl SmaCrossStrategy {
    pub fn new(fast_window: usize, slow_window: usize) -> Self {
        SmaCrossStrategy {
            fast_window,
            slow_window,
        }
    }
}

impl Strategy for SmaCrossStrategy {
    fn on_bar(&mut self, context: &mut StepContext) {
        if context.bar_count() < self.slow_window {
            return;
        }

        let closes = context.closes(self.slow_window);
        let fast_closes = &closes[closes.len() - self.fast_window..];

        let fast_ma = match sma(fast_closes) {
            Some(v) => v,
            None => return,
        };
        let slow_ma = match sma(&closes) {
            Some(v) => v,
            None => return,
        };

        let close = context.current_bar().close;

        if close > fast_ma && close > slow_ma {
            context.buy_max(close);
        } else if close < fast_ma && close < slow_ma {
            context.sell_max(close);
        }
    }

    fn on_end(&mut self, context: &mut StepContext) {
        let close = context.current_bar().close;
        context.sell_max(close);
    }

    fn name(&self) -> &str {
        "SMA Trend"
    }
}
