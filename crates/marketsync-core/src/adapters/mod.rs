//! Provider adapters.

mod yahoo;

pub use yahoo::YahooHistoryAdapter;
