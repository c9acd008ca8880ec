//! Data source contract for historical price providers.
//!
//! A provider adapter implements [`HistorySource`]: given a ticker and an
//! inclusive date range, it returns a [`PriceSeries`] in store vocabulary
//! (adjusted close already normalized), ascending by date.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{PriceSeries, Ticker, TradingDate};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Transient upstream failure; the caller may retry the whole call.
    Unavailable,
    InvalidRequest,
    Internal,
}

/// Structured source error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for a history fetch over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub ticker: Ticker,
    pub start: TradingDate,
    pub end: TradingDate,
}

impl HistoryRequest {
    pub fn new(
        ticker: Ticker,
        start: TradingDate,
        end: TradingDate,
    ) -> Result<Self, SourceError> {
        if start > end {
            return Err(SourceError::invalid_request(format!(
                "history range start {start} is after end {end}"
            )));
        }
        Ok(Self { ticker, start, end })
    }
}

/// History provider contract.
///
/// Implementations must be `Send + Sync`; calls are one-shot with no
/// internal retry — transient failures come back as a retryable
/// [`SourceError`] for the caller to handle.
pub trait HistorySource: Send + Sync {
    /// Fetch daily rows for the requested range, ascending by date.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the provider is unavailable or the
    /// request is malformed. An in-range day the source has no row for
    /// (weekend, holiday, listing gap) is not an error.
    fn fetch<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>>;
}

impl<S: HistorySource + ?Sized> HistorySource for &S {
    fn fetch<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>> {
        (**self).fetch(req)
    }
}

impl<S: HistorySource + ?Sized> HistorySource for Arc<S> {
    fn fetch<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>> {
        (**self).fetch(req)
    }
}
