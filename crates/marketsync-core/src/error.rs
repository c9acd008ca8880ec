use thiserror::Error;

/// Validation errors for domain type construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker symbol cannot be empty")]
    EmptyTicker,
    #[error("ticker symbol length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker symbol contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("invalid calendar date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("record high must be >= low")]
    InvalidRecordRange,
    #[error("record open/close must be within high/low range")]
    InvalidRecordBounds,

    #[error("series dates must be strictly ascending: '{date}' repeats or regresses")]
    SeriesNotAscending { date: String },

    #[error("moving-average window must be greater than zero")]
    ZeroWindow,
}
