use serde::{Deserialize, Serialize};

use crate::{Ticker, TradingDate, ValidationError};

/// One daily price row for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: TradingDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: Option<u64>,
}

impl PriceRecord {
    pub fn new(
        date: TradingDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        adjusted_close: f64,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;
        // Split/dividend adjustment can move the adjusted close outside the
        // raw high/low range, so it only has to be finite and non-negative.
        validate_non_negative("adjusted_close", adjusted_close)?;

        if high < low {
            return Err(ValidationError::InvalidRecordRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidRecordBounds);
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            adjusted_close,
            volume,
        })
    }
}

/// An ordered run of daily rows for one ticker.
///
/// Dates are strictly ascending with no duplicates; weekends and holidays
/// are naturally absent and are not treated as gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: Ticker,
    pub records: Vec<PriceRecord>,
}

impl PriceSeries {
    pub fn new(ticker: Ticker, records: Vec<PriceRecord>) -> Result<Self, ValidationError> {
        for pair in records.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ValidationError::SeriesNotAscending {
                    date: pair[1].date.to_string(),
                });
            }
        }
        Ok(Self { ticker, records })
    }

    pub fn empty(ticker: Ticker) -> Self {
        Self {
            ticker,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<TradingDate> {
        self.records.first().map(|record| record.date)
    }

    pub fn last_date(&self) -> Option<TradingDate> {
        self.records.last().map(|record| record.date)
    }

    /// Closing prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|record| record.close).collect()
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(input: &str) -> TradingDate {
        TradingDate::parse(input).expect("valid date")
    }

    fn record(day: &str, close: f64) -> PriceRecord {
        PriceRecord::new(date(day), close, close + 1.0, close - 1.0, close, close, Some(100))
            .expect("valid record")
    }

    #[test]
    fn rejects_high_below_low() {
        let err = PriceRecord::new(date("2023-01-10"), 10.0, 9.0, 11.0, 10.0, 10.0, None)
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidRecordRange));
    }

    #[test]
    fn rejects_close_outside_range() {
        let err = PriceRecord::new(date("2023-01-10"), 10.0, 12.0, 9.0, 12.5, 10.0, None)
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidRecordBounds));
    }

    #[test]
    fn allows_adjusted_close_outside_daily_range() {
        let record = PriceRecord::new(date("2023-01-10"), 10.0, 12.0, 9.0, 11.0, 2.5, Some(1))
            .expect("adjusted close may sit below the low");
        assert_eq!(record.adjusted_close, 2.5);
    }

    #[test]
    fn rejects_negative_price() {
        let err = PriceRecord::new(date("2023-01-10"), -1.0, 12.0, 9.0, 11.0, 10.0, None)
            .expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::NegativeValue { field: "open" }
        ));
    }

    #[test]
    fn series_requires_strictly_ascending_dates() {
        let ticker = Ticker::parse("AAPL").expect("valid ticker");
        let err = PriceSeries::new(
            ticker,
            vec![record("2023-01-11", 10.0), record("2023-01-11", 11.0)],
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::SeriesNotAscending { .. }));
    }

    #[test]
    fn series_exposes_date_bounds() {
        let ticker = Ticker::parse("AAPL").expect("valid ticker");
        let series = PriceSeries::new(
            ticker,
            vec![record("2023-01-10", 10.0), record("2023-01-12", 11.0)],
        )
        .expect("valid series");
        assert_eq!(series.first_date(), Some(date("2023-01-10")));
        assert_eq!(series.last_date(), Some(date("2023-01-12")));
        assert_eq!(series.closes(), vec![10.0, 11.0]);
    }
}
