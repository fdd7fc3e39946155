use crate::portfolio::position::Position;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

//trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

//one executed trade, immutable once appended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub action: TradeAction,
    pub quantity: f64,
    pub price: f64,
    pub cash_after: f64,
    pub timestamp: DateTime<Utc>,
}

//cash and trade notionals are rounded to a fixed precision so repeated
//buy_max/sell_max cycles cannot accumulate float dust into the cash balance
const CASH_DECIMALS: i32 = 4;

fn round_cash(amount: f64) -> f64 {
    let factor = 10f64.powi(CASH_DECIMALS);
    (amount * factor).round() / factor
}

//the accounting ledger of record: cash, open positions, and the trade log
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub initial_capital: f64,
    pub cash: f64,
    pub positions: IndexMap<String, Position>,
    pub trade_history: Vec<TradeRecord>,

    //per-step total pnl, appended by the stepped simulator after each mark
    pub pnl_history: Vec<f64>,
    pub pct_pnl_history: Vec<f64>,

    //realized pnl of each position-reducing sell, against weighted-average cost
    pub realized_trade_pnls: Vec<f64>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            initial_capital,
            cash: initial_capital,
            positions: IndexMap::new(),
            trade_history: Vec::new(),
            pnl_history: Vec::new(),
            pct_pnl_history: Vec::new(),
            realized_trade_pnls: Vec::new(),
        }
    }

    //buys quantity at price, rejecting the order untouched if cost exceeds cash
    //re-buys of a held symbol blend into the weighted-average entry price
    pub fn buy(&mut self, symbol: &str, quantity: f64, price: f64, timestamp: DateTime<Utc>) -> bool {
        let cost = round_cash(quantity * price);
        if cost > self.cash {
            return false;
        }

        match self.positions.get_mut(symbol) {
            Some(pos) => {
                let total_quantity = pos.quantity + quantity;
                let total_cost = pos.quantity * pos.average_price + quantity * price;
                pos.average_price = total_cost / total_quantity;
                pos.quantity = total_quantity;
                pos.current_price = price;
            }
            None => {
                self.positions.insert(
                    symbol.to_string(),
                    Position::new(symbol.to_string(), quantity, price, price),
                );
            }
        }

        self.cash -= cost;
        self.trade_history.push(TradeRecord {
            symbol: symbol.to_string(),
            action: TradeAction::Buy,
            quantity,
            price,
            cash_after: self.cash,
            timestamp,
        });
        true
    }

    //sells quantity at price, rejecting the order untouched if the symbol is
    //not held or the quantity exceeds the holding
    //partial sells keep the remaining lot at its existing average price
    pub fn sell(
        &mut self,
        symbol: &str,
        quantity: f64,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> bool {
        let pos = match self.positions.get_mut(symbol) {
            Some(pos) => pos,
            None => return false,
        };

        if quantity > pos.quantity {
            return false;
        }

        let proceeds = round_cash(quantity * price);
        self.realized_trade_pnls
            .push(quantity * (price - pos.average_price));

        if quantity == pos.quantity {
            self.positions.shift_remove(symbol);
        } else {
            pos.quantity -= quantity;
            pos.current_price = price;
        }

        self.cash += proceeds;
        self.trade_history.push(TradeRecord {
            symbol: symbol.to_string(),
            action: TradeAction::Sell,
            quantity,
            price,
            cash_after: self.cash,
            timestamp,
        });
        true
    }

    //buys as much as the cash balance allows at price
    pub fn buy_max(&mut self, symbol: &str, price: f64, timestamp: DateTime<Utc>) -> bool {
        if self.cash <= 0.0 {
            return false;
        }
        let quantity = self.cash / price;
        self.buy(symbol, quantity, price, timestamp)
    }

    //sells the entire holding of symbol at price
    pub fn sell_max(&mut self, symbol: &str, price: f64, timestamp: DateTime<Utc>) -> bool {
        let quantity = match self.positions.get(symbol) {
            Some(pos) => pos.quantity,
            None => return false,
        };
        self.sell(symbol, quantity, price, timestamp)
    }

    //marks every held symbol present in the map to its new close
    //this is the sole mark-to-market path
    pub fn update_positions(&mut self, current_prices: &IndexMap<String, f64>) {
        for (symbol, &price) in current_prices {
            if let Some(pos) = self.positions.get_mut(symbol) {
                pos.current_price = price;
            }
        }
    }

    //cash plus the marked value of all open positions
    pub fn total_value(&self) -> f64 {
        let position_value: f64 = self.positions.values().map(|pos| pos.value()).sum();
        self.cash + position_value
    }

    pub fn total_profit_loss(&self) -> f64 {
        self.total_value() - self.initial_capital
    }

    pub fn total_profit_loss_pct(&self) -> f64 {
        self.total_profit_loss() / self.initial_capital * 100.0
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    //human-readable listing of open positions
    pub fn position_summary(&self) -> String {
        if self.positions.is_empty() {
            return "No open positions".to_string();
        }

        let mut summary = String::from("Current Positions:\n");
        for (symbol, pos) in &self.positions {
            let _ = writeln!(
                summary,
                "{}: {:.4} units @ ${:.2} (Current: ${:.2}, P/L: ${:.2} [{:.2}%])",
                symbol,
                pos.quantity,
                pos.average_price,
                pos.current_price,
                pos.profit_loss(),
                pos.profit_loss_pct()
            );
        }
        summary
    }
}
