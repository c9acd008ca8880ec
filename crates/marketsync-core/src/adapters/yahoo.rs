use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::Weekday;

use crate::data_source::{HistoryRequest, HistorySource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient, ReqwestHttpClient};
use crate::{PriceRecord, PriceSeries, Ticker, TradingDate, ValidationError};

const SECONDS_PER_DAY: i64 = 86_400;

/// Yahoo Finance daily-history adapter.
///
/// Real mode drives the v8 chart endpoint with `period1`/`period2` Unix
/// timestamps. With a mock transport (the default) it produces
/// deterministic weekday rows for the requested range, so tests and
/// `--mock` runs stay offline and reproducible.
#[derive(Clone)]
pub struct YahooHistoryAdapter {
    http_client: Arc<dyn HttpClient>,
}

impl Default for YahooHistoryAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(NoopHttpClient),
        }
    }
}

impl YahooHistoryAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }

    pub fn with_real_client() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new()))
    }

    fn is_real_client(&self) -> bool {
        !self.http_client.is_mock()
    }

    async fn fetch_real_history(&self, req: &HistoryRequest) -> Result<PriceSeries, SourceError> {
        let period1 = req.start.unix_midnight();
        // period2 is exclusive upstream; push it past the end date so the
        // whole final day is covered.
        let period2 = req.end.unix_midnight() + SECONDS_PER_DAY;

        let endpoint = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history&includeAdjustedClose=true",
            urlencoding::encode(req.ticker.as_str()),
            period1,
            period2,
        );

        let request = HttpRequest::get(endpoint)
            .with_header("referer", "https://finance.yahoo.com/")
            .with_timeout_ms(10_000);

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.retryable() {
                SourceError::unavailable(format!("yahoo transport error: {}", error.message()))
            } else {
                SourceError::internal(format!("yahoo transport error: {}", error.message()))
            }
        })?;

        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "yahoo returned status {}",
                response.status
            )));
        }

        parse_chart_response(&response.body, req)
    }

    async fn fetch_mock_history(&self, req: &HistoryRequest) -> Result<PriceSeries, SourceError> {
        let seed = ticker_seed(&req.ticker);
        let mut records = Vec::new();
        let mut date = req.start;

        loop {
            let weekday = date.into_inner().weekday();
            if !matches!(weekday, Weekday::Saturday | Weekday::Sunday) {
                let day_index = date.into_inner().to_julian_day() as u64;
                let base = 90.0 + (seed.wrapping_add(day_index) % 350) as f64 / 10.0;
                let record = PriceRecord::new(
                    date,
                    base,
                    base + 1.20,
                    base - 0.80,
                    base + 0.30,
                    base + 0.15,
                    Some(20_000 + day_index % 5_000),
                )
                .map_err(validation_to_error)?;
                records.push(record);
            }

            if date >= req.end {
                break;
            }
            date = match date.next_day() {
                Some(next) => next,
                None => break,
            };
        }

        PriceSeries::new(req.ticker.clone(), records).map_err(validation_to_error)
    }
}

impl HistorySource for YahooHistoryAdapter {
    fn fetch<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if self.is_real_client() {
                self.fetch_real_history(&req).await
            } else {
                self.fetch_mock_history(&req).await
            }
        })
    }
}

/// Decode a chart response into store vocabulary.
///
/// The upstream "Adj Close" column lands in
/// [`PriceRecord::adjusted_close`]; rows with null OHLC entries are
/// skipped; everything outside the requested range is dropped.
fn parse_chart_response(body: &str, req: &HistoryRequest) -> Result<PriceSeries, SourceError> {
    let chart_response: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = &chart_response.chart.error {
        if !error.is_empty() {
            return Err(SourceError::unavailable(format!(
                "yahoo chart API error: {error}"
            )));
        }
    }

    let result = chart_response
        .chart
        .result
        .first()
        .ok_or_else(|| SourceError::internal("no chart data in response"))?;

    // A requested range with no trading days comes back without timestamps.
    let Some(timestamps) = result.timestamp.as_ref() else {
        return Ok(PriceSeries::empty(req.ticker.clone()));
    };
    let quote = result
        .indicators
        .quote
        .first()
        .ok_or_else(|| SourceError::internal("no quote data in response"))?;
    let adjclose = result
        .indicators
        .adjclose
        .as_ref()
        .and_then(|series| series.first());

    let mut records = Vec::with_capacity(timestamps.len());
    for (index, &timestamp) in timestamps.iter().enumerate() {
        let Ok(date) = TradingDate::from_unix_timestamp(timestamp) else {
            continue;
        };
        if date < req.start || date > req.end {
            continue;
        }

        if let (Some(Some(open)), Some(Some(high)), Some(Some(low)), Some(Some(close))) = (
            quote.open.get(index),
            quote.high.get(index),
            quote.low.get(index),
            quote.close.get(index),
        ) {
            let adjusted_close = adjclose
                .and_then(|column| column.adjclose.get(index).copied().flatten())
                .unwrap_or(*close);
            let volume = quote
                .volume
                .get(index)
                .copied()
                .flatten()
                .and_then(|volume| u64::try_from(volume).ok());

            if let Ok(record) =
                PriceRecord::new(date, *open, *high, *low, *close, adjusted_close, volume)
            {
                records.push(record);
            }
        }
    }

    records.sort_by_key(|record| record.date);
    records.dedup_by_key(|record| record.date);

    PriceSeries::new(req.ticker.clone(), records).map_err(validation_to_error)
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartData {
    result: Vec<YahooChartResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartIndicators {
    quote: Vec<YahooChartQuote>,
    #[serde(default)]
    adjclose: Option<Vec<YahooAdjClose>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartQuote {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooAdjClose {
    adjclose: Vec<Option<f64>>,
}

fn ticker_seed(ticker: &Ticker) -> u64 {
    ticker.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}

fn validation_to_error(error: ValidationError) -> SourceError {
    SourceError::internal(error.to_string())
}
