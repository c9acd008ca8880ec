//! Shared test doubles for marketsync behavior tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use marketsync_core::{
    HistoryRequest, HistorySource, PriceRecord, PriceSeries, SourceError, StoreError, SyncStore,
    Ticker, TradingDate,
};

pub fn day(year: i32, month: u8, day_of_month: u8) -> TradingDate {
    TradingDate::from_calendar_date(year, month, day_of_month).expect("valid test date")
}

pub fn record(date: TradingDate, close: f64) -> PriceRecord {
    PriceRecord::new(
        date,
        close - 0.3,
        close + 1.0,
        close - 1.0,
        close,
        close - 0.1,
        Some(1_000),
    )
    .expect("valid test record")
}

/// In-memory stand-in for the store's read surface: one registered ticker
/// with an optional newest persisted date.
pub struct MemoryStore {
    symbol: String,
    ticker_id: i64,
    latest: Option<TradingDate>,
}

impl MemoryStore {
    pub fn registered(symbol: &str, latest: Option<TradingDate>) -> Self {
        Self {
            symbol: symbol.to_owned(),
            ticker_id: 1,
            latest,
        }
    }
}

impl SyncStore for MemoryStore {
    fn lookup_ticker(&self, ticker: &Ticker) -> Result<i64, StoreError> {
        if ticker.as_str() == self.symbol {
            Ok(self.ticker_id)
        } else {
            Err(StoreError::UnknownTicker {
                symbol: ticker.as_str().to_owned(),
            })
        }
    }

    fn latest_history_date(&self, _ticker_id: i64) -> Result<Option<TradingDate>, StoreError> {
        Ok(self.latest)
    }
}

/// Scripted source that records every request it receives.
pub struct ScriptedSource {
    records: Vec<PriceRecord>,
    fail_with: Option<SourceError>,
    fetch_count: AtomicUsize,
    requests: Mutex<Vec<(TradingDate, TradingDate)>>,
}

impl ScriptedSource {
    pub fn returning(records: Vec<PriceRecord>) -> Self {
        Self {
            records,
            fail_with: None,
            fetch_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn failing(error: SourceError) -> Self {
        Self {
            records: Vec::new(),
            fail_with: Some(error),
            fetch_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(TradingDate, TradingDate)> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .last()
            .copied()
    }
}

impl HistorySource for ScriptedSource {
    fn fetch<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .push((req.start, req.end));

        let response = match &self.fail_with {
            Some(error) => Err(error.clone()),
            // Scripted rows go back as-is, whatever order the test chose;
            // the resolver is responsible for cleaning them up.
            None => Ok(PriceSeries {
                ticker: req.ticker,
                records: self.records.clone(),
            }),
        };
        Box::pin(async move { response })
    }
}
