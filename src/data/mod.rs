pub mod bar;
pub mod loader;
pub mod provider;
pub mod series;

pub use bar::{BarError, MarketBar};
pub use loader::load_csv;
pub use provider::{CsvProvider, MarketDataProvider, ProviderError};
pub use series::{align_series, dedup_by_timestamp, validate_monotonic, DataError};
