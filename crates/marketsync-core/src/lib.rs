//! # marketsync core
//!
//! Domain contracts and the incremental synchronization check for
//! marketsync.
//!
//! ## Overview
//!
//! The crate keeps a local store of daily price history in step with a
//! public finance data source, one ticker at a time:
//!
//! - **Domain models** for tickers, calendar dates, and daily price rows
//! - **`HistorySource` trait** for provider adapters, with a Yahoo
//!   implementation that has a deterministic offline mode
//! - **`GapResolver`** — compares the newest persisted date against the
//!   newest date the source can serve and fetches exactly the missing range
//! - **Indicator helpers** for rolling-mean columns over the close
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo) |
//! | [`data_source`] | `HistorySource` trait and request/error types |
//! | [`domain`] | Domain models (`Ticker`, `TradingDate`, `PriceRecord`, `PriceSeries`) |
//! | [`error`] | Validation errors |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`indicators`] | Rolling-mean columns |
//! | [`sync`] | The gap resolver |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marketsync_core::{GapResolver, Store, SyncOutcome, Ticker, YahooHistoryAdapter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open_default()?;
//!     let resolver = GapResolver::new(YahooHistoryAdapter::with_real_client());
//!     let ticker = Ticker::parse("^GSPC")?;
//!
//!     match resolver.check_for_update(&store, &ticker).await? {
//!         SyncOutcome::UpToDate => println!("nothing to do"),
//!         SyncOutcome::NewData(series) => println!("{} new rows", series.len()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every failure propagates as a structured error with the ticker and the
//! attempted date range attached; nothing retries internally. "Already up
//! to date" is a success value ([`SyncOutcome::UpToDate`]), never an error.

pub mod adapters;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod sync;

// Adapter implementations
pub use adapters::YahooHistoryAdapter;

// Data source trait and types
pub use data_source::{HistoryRequest, HistorySource, SourceError, SourceErrorKind};

// Domain models
pub use domain::{PriceRecord, PriceSeries, Ticker, TradingDate};

// Error types
pub use error::ValidationError;

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};

// Indicators
pub use indicators::{enrich, moving_average, EnrichedSeries, MovingAverage, DEFAULT_WINDOWS};

// Sync gap resolver
pub use sync::{GapResolver, SyncError, SyncOutcome, SyncStore};

// Store (re-exported from marketsync-store)
pub use marketsync_store::{
    ConflictPolicy, HistoryRow, QueryGuardrails, QueryResult, SqlColumn, Store, StoreConfig,
    StoreError, TickerRow,
};
