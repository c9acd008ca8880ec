//! Incremental synchronization check.
//!
//! [`GapResolver`] decides, for one ticker at a time, whether the upstream
//! source holds rows newer than the local store, and if so fetches exactly
//! the missing date range. It never writes; persisting a
//! [`SyncOutcome::NewData`] series is the caller's job.

use marketsync_store::{Store, StoreError};
use thiserror::Error;

use crate::data_source::{HistoryRequest, HistorySource, SourceError};
use crate::{PriceRecord, PriceSeries, Ticker, TradingDate};

/// Read surface the resolver needs from the store.
///
/// Kept narrow so tests can substitute an in-memory double.
pub trait SyncStore {
    /// Resolve a symbol to its surrogate key.
    fn lookup_ticker(&self, ticker: &Ticker) -> Result<i64, StoreError>;

    /// Newest persisted date for the ticker, `None` when it has no rows.
    fn latest_history_date(&self, ticker_id: i64) -> Result<Option<TradingDate>, StoreError>;
}

impl SyncStore for Store {
    fn lookup_ticker(&self, ticker: &Ticker) -> Result<i64, StoreError> {
        Store::lookup_ticker(self, ticker.as_str())
    }

    fn latest_history_date(&self, ticker_id: i64) -> Result<Option<TradingDate>, StoreError> {
        let latest = Store::latest_history_date(self, ticker_id)?;
        latest
            .map(|value| {
                TradingDate::parse(&value).map_err(|_| StoreError::MalformedDate { value })
            })
            .transpose()
    }
}

/// Result of one synchronization check.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The store already holds every date the source can serve.
    UpToDate,
    /// Rows strictly newer than the last persisted date, ascending.
    /// Never empty; an empty remainder normalizes to [`SyncOutcome::UpToDate`].
    NewData(PriceSeries),
}

/// Failure of one synchronization check, with enough context to log or
/// retry externally. The resolver itself never retries.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The ticker has no registry entry. Fatal for this call.
    #[error("ticker '{symbol}' is not registered in the store")]
    UnknownTicker { symbol: String },

    /// The upstream fetch failed; `start..=end` is the range that was asked for.
    #[error("source fetch failed for {symbol} over {start}..={end}: {source}")]
    SourceUnavailable {
        symbol: String,
        start: TradingDate,
        end: TradingDate,
        #[source]
        source: SourceError,
    },

    /// A store read failed.
    #[error("store query failed for {symbol}: {source}")]
    StoreUnavailable {
        symbol: String,
        #[source]
        source: StoreError,
    },
}

/// Decides whether a ticker needs a fetch and what range closes the gap.
pub struct GapResolver<S> {
    source: S,
}

impl<S: HistorySource> GapResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Newest date the source is expected to have fully available.
    ///
    /// The source never has same-day data, so this is always yesterday (UTC).
    pub fn latest_available_date() -> TradingDate {
        TradingDate::today_utc()
            .previous_day()
            .expect("today always has a previous day")
    }

    /// Check whether the store is behind the source for `ticker`.
    pub async fn check_for_update(
        &self,
        store: &impl SyncStore,
        ticker: &Ticker,
    ) -> Result<SyncOutcome, SyncError> {
        self.check_for_update_as_of(store, ticker, Self::latest_available_date())
            .await
    }

    /// [`check_for_update`](Self::check_for_update) with an explicit cutoff:
    /// the newest date the source is assumed to serve. Exposed for callers
    /// with their own calendar and for deterministic tests.
    pub async fn check_for_update_as_of(
        &self,
        store: &impl SyncStore,
        ticker: &Ticker,
        cutoff: TradingDate,
    ) -> Result<SyncOutcome, SyncError> {
        let ticker_id = match store.lookup_ticker(ticker) {
            Ok(id) => id,
            Err(StoreError::UnknownTicker { .. }) => {
                return Err(SyncError::UnknownTicker {
                    symbol: ticker.to_string(),
                })
            }
            Err(source) => {
                return Err(SyncError::StoreUnavailable {
                    symbol: ticker.to_string(),
                    source,
                })
            }
        };

        let last_known = store
            .latest_history_date(ticker_id)
            .map_err(|source| SyncError::StoreUnavailable {
                symbol: ticker.to_string(),
                source,
            })?;

        if let Some(last) = last_known {
            if last >= cutoff {
                return Ok(SyncOutcome::UpToDate);
            }
        }

        let start = match last_known {
            Some(last) => last
                .next_day()
                .expect("a date before the cutoff has a next day"),
            // Cold start: a registered ticker with zero rows gets a
            // full-history fetch from the earliest date the source serves.
            None => TradingDate::epoch(),
        };

        let request = HistoryRequest::new(ticker.clone(), start, cutoff).map_err(|source| {
            SyncError::SourceUnavailable {
                symbol: ticker.to_string(),
                start,
                end: cutoff,
                source,
            }
        })?;
        let fetched =
            self.source
                .fetch(request)
                .await
                .map_err(|source| SyncError::SourceUnavailable {
                    symbol: ticker.to_string(),
                    start,
                    end: cutoff,
                    source,
                })?;

        // The source may ignore the requested start or return rows out of
        // order; keep only dates strictly after the last persisted one and
        // no later than the cutoff, comparing the whole range rather than
        // just the first row.
        let mut records: Vec<PriceRecord> = fetched
            .records
            .into_iter()
            .filter(|record| {
                record.date <= cutoff && last_known.is_none_or(|last| record.date > last)
            })
            .collect();
        records.sort_by_key(|record| record.date);
        records.dedup_by_key(|record| record.date);

        if records.is_empty() {
            return Ok(SyncOutcome::UpToDate);
        }

        let series = PriceSeries::new(ticker.clone(), records)
            .expect("filtered records are sorted and deduplicated");
        Ok(SyncOutcome::NewData(series))
    }
}
