//! Instants and calendar dates as stored by the data service.
//!
//! Instants travel as integer milliseconds since the UNIX epoch. Date-only
//! fields (due dates) are entered as `YYYY-MM-DD` and stored as the UTC
//! midnight instant of that day.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Milliseconds in one calendar day.
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Format used for date-only fields.
const CALENDAR_FORMAT: &str = "%Y-%m-%d";

/// Errors converting between calendar strings and instants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    /// The input is not a valid `YYYY-MM-DD` date.
    #[error("invalid calendar date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// An opaque instant, in milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    /// Returns milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Parses a `YYYY-MM-DD` string into the UTC midnight instant of that day.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::InvalidDate`] if the string is not a real date.
    pub fn from_calendar_date(input: &str) -> Result<Self, DateError> {
        let date = NaiveDate::parse_from_str(input.trim(), CALENDAR_FORMAT)
            .map_err(|_| DateError::InvalidDate(input.to_string()))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| DateError::InvalidDate(input.to_string()))?;
        Ok(Self(midnight.and_utc().timestamp_millis()))
    }

    /// Formats the instant's UTC day as `YYYY-MM-DD`.
    ///
    /// Returns `None` for instants outside chrono's representable range.
    #[must_use]
    pub fn to_calendar_date(self) -> Option<String> {
        self.to_datetime()
            .map(|dt| dt.date_naive().format(CALENDAR_FORMAT).to_string())
    }

    /// Converts to a chrono UTC date-time.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Self::from(ts.0)
    }
}
