pub mod ledger;
pub mod position;

pub use ledger::{Portfolio, TradeAction, TradeRecord};
pub use position::Position;
