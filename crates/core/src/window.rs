//! The extraction window requested from the Satori export endpoint.

use chrono::{Days, NaiveDate, NaiveTime, Utc};

use crate::error::CoreError;
use crate::types::{EpochMillis, Timestamp};

/// Length of every extraction window.
pub const WINDOW_DAYS: u64 = 30;

/// Largest accepted `days_ago` offset (roughly a century).
pub const MAX_DAYS_AGO: u32 = 36_500;

/// Half-open interval `[start, end)` of audit entries to extract.
///
/// `start` is midnight UTC of `today - days_ago`; `end` is exactly
/// [`WINDOW_DAYS`] days later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl ExtractionWindow {
    /// Compute the window relative to an explicit `today`.
    pub fn ending_relative_to(today: NaiveDate, days_ago: u32) -> Result<Self, CoreError> {
        if days_ago > MAX_DAYS_AGO {
            return Err(CoreError::InvalidWindow(format!(
                "days_ago {days_ago} exceeds maximum of {MAX_DAYS_AGO}"
            )));
        }

        let start_date = today
            .checked_sub_days(Days::new(u64::from(days_ago)))
            .ok_or_else(|| {
                CoreError::InvalidWindow(format!("{today} minus {days_ago} days is out of range"))
            })?;
        let end_date = start_date
            .checked_add_days(Days::new(WINDOW_DAYS))
            .ok_or_else(|| {
                CoreError::InvalidWindow(format!("{start_date} plus {WINDOW_DAYS} days is out of range"))
            })?;

        Ok(Self {
            start: start_date.and_time(NaiveTime::MIN).and_utc(),
            end: end_date.and_time(NaiveTime::MIN).and_utc(),
        })
    }

    /// Compute the window relative to the current UTC date.
    pub fn for_today(days_ago: u32) -> Result<Self, CoreError> {
        Self::ending_relative_to(Utc::now().date_naive(), days_ago)
    }

    /// Window start in epoch milliseconds.
    pub fn from_ms(&self) -> EpochMillis {
        self.start.timestamp_millis()
    }

    /// Window end (exclusive) in epoch milliseconds.
    pub fn to_ms(&self) -> EpochMillis {
        self.end.timestamp_millis()
    }
}
