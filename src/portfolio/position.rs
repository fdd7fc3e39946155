use serde::{Deserialize, Serialize};

//one open spot holding in one symbol
//a position with zero quantity is removed from the portfolio, never retained
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub symbol: String,

    //held quantity, fractional for spot markets
    pub quantity: f64,

    //weighted-average entry price
    pub average_price: f64,

    //last mark price
    pub current_price: f64,
}

impl Position {
    pub fn new(symbol: String, quantity: f64, average_price: f64, current_price: f64) -> Self {
        Position {
            symbol,
            quantity,
            average_price,
            current_price,
        }
    }

    //market value at the last mark
    pub fn value(&self) -> f64 {
        self.quantity * self.current_price
    }

    //unrealized pnl at the last mark
    pub fn profit_loss(&self) -> f64 {
        self.quantity * (self.current_price - self.average_price)
    }

    //unrealized pnl as a percentage of the average entry price
    pub fn profit_loss_pct(&self) -> f64 {
        (self.current_price - self.average_price) / self.average_price * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_values() {
        let pos = Position::new("BTC-USD".to_string(), 2.0, 100.0, 110.0);
        assert_eq!(pos.value(), 220.0);
        assert_eq!(pos.profit_loss(), 20.0);
        assert!((pos.profit_loss_pct() - 10.0).abs() < 1e-12);
    }
}
