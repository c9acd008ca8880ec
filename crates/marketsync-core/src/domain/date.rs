use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::{self, BorrowedFormatItem};
use time::{Date, Month, OffsetDateTime};

use crate::ValidationError;

fn iso_date_format() -> &'static [BorrowedFormatItem<'static>] {
    static FORMAT: OnceLock<Vec<BorrowedFormatItem<'static>>> = OnceLock::new();
    FORMAT.get_or_init(|| {
        format_description::parse("[year]-[month]-[day]")
            .expect("date format description is valid")
    })
}

/// Calendar date for daily price rows. No time component, no offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradingDate(Date);

impl TradingDate {
    /// Earliest date the upstream source serves history for (Unix epoch start).
    pub fn epoch() -> Self {
        Self(Date::from_calendar_date(1970, Month::January, 1).expect("epoch date is valid"))
    }

    /// The current date in UTC.
    pub fn today_utc() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    pub fn from_calendar_date(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: format!("{year:04}-{month:02}-{day:02}"),
        };
        let month = Month::try_from(month).map_err(|_| invalid())?;
        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }

    /// Parse an ISO `YYYY-MM-DD` date.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Date::parse(input.trim(), iso_date_format())
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                value: input.to_owned(),
            })
    }

    /// The calendar date of a Unix timestamp, interpreted in UTC.
    pub fn from_unix_timestamp(timestamp: i64) -> Result<Self, ValidationError> {
        OffsetDateTime::from_unix_timestamp(timestamp)
            .map(|datetime| Self(datetime.date()))
            .map_err(|_| ValidationError::InvalidDate {
                value: timestamp.to_string(),
            })
    }

    pub fn previous_day(self) -> Option<Self> {
        self.0.previous_day().map(Self)
    }

    pub fn next_day(self) -> Option<Self> {
        self.0.next_day().map(Self)
    }

    /// Midnight UTC at the start of this date, as a Unix timestamp.
    pub fn unix_midnight(self) -> i64 {
        self.0.midnight().assume_utc().unix_timestamp()
    }

    pub fn into_inner(self) -> Date {
        self.0
    }

    pub fn format_iso(self) -> String {
        self.0
            .format(iso_date_format())
            .expect("TradingDate must be ISO formattable")
    }
}

impl From<Date> for TradingDate {
    fn from(value: Date) -> Self {
        Self(value)
    }
}

impl Display for TradingDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_iso())
    }
}

impl Serialize for TradingDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_iso())
    }
}

impl<'de> Deserialize<'de> for TradingDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_iso_date() {
        let parsed = TradingDate::parse("2023-01-10").expect("must parse");
        assert_eq!(parsed.format_iso(), "2023-01-10");
    }

    #[test]
    fn rejects_malformed_date() {
        let err = TradingDate::parse("2023-13-40").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidDate { .. }));
    }

    #[test]
    fn steps_across_month_boundaries() {
        let date = TradingDate::parse("2023-01-31").expect("must parse");
        assert_eq!(
            date.next_day().expect("has next day").format_iso(),
            "2023-02-01"
        );
        assert_eq!(
            date.previous_day().expect("has previous day").format_iso(),
            "2023-01-30"
        );
    }

    #[test]
    fn epoch_maps_to_unix_zero() {
        assert_eq!(TradingDate::epoch().unix_midnight(), 0);
        assert_eq!(
            TradingDate::from_unix_timestamp(0).expect("must convert"),
            TradingDate::epoch()
        );
    }
}
