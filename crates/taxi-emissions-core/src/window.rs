use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use thiserror::Error;

use taxi_emissions_parser::PICKUP_TS;

/// 2015-01-01T00:00:00, inclusive.
pub const WINDOW_START_MICROS: i64 = 1_420_070_400_000_000;
/// 2025-01-01T00:00:00, exclusive.
pub const WINDOW_END_MICROS: i64 = 1_735_689_600_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window start {start} must be before end {end}")]
    Empty { start: String, end: String },
    #[error("window bound {0} cannot be represented as microseconds")]
    OutOfRange(String),
}

/// Half-open `[start, end)` range over naive pickup timestamps, in microseconds.
///
/// The same predicate is applied by every stage that reads trips (`fct_trips`, enrichment,
/// audit, analysis), so re-applying it over an already-filtered frame is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripWindow {
    start_us: i64,
    end_us: i64,
}

impl Default for TripWindow {
    fn default() -> Self {
        Self::standard()
    }
}

impl TripWindow {
    pub const fn standard() -> Self {
        Self {
            start_us: WINDOW_START_MICROS,
            end_us: WINDOW_END_MICROS,
        }
    }

    pub fn from_micros(start_us: i64, end_us: i64) -> Result<Self, WindowError> {
        if start_us >= end_us {
            return Err(WindowError::Empty {
                start: format_micros(start_us),
                end: format_micros(end_us),
            });
        }
        Ok(Self { start_us, end_us })
    }

    pub fn from_bounds(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, WindowError> {
        Self::from_micros(
            start.and_utc().timestamp_micros(),
            end.and_utc().timestamp_micros(),
        )
    }

    /// Window covering whole days, midnight of `start` up to midnight of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        let start_ts = start
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| WindowError::OutOfRange(start.to_string()))?;
        let end_ts = end
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| WindowError::OutOfRange(end.to_string()))?;
        Self::from_bounds(start_ts, end_ts)
    }

    pub fn start_micros(&self) -> i64 {
        self.start_us
    }

    pub fn end_micros(&self) -> i64 {
        self.end_us
    }

    pub fn contains_micros(&self, pickup_us: i64) -> bool {
        pickup_us >= self.start_us && pickup_us < self.end_us
    }

    pub fn contains(&self, pickup: &NaiveDateTime) -> bool {
        self.contains_micros(pickup.and_utc().timestamp_micros())
    }

    /// Row mask over `pickup_ts`. Null pickups never satisfy the predicate.
    pub fn mask(&self, trips: &DataFrame) -> PolarsResult<BooleanChunked> {
        let pickup = trips.column(PICKUP_TS)?.cast(&DataType::Int64)?;
        Ok(pickup
            .i64()?
            .into_iter()
            .map(|value| value.is_some_and(|ts| self.contains_micros(ts)))
            .collect())
    }

    pub fn apply(&self, trips: &DataFrame) -> PolarsResult<DataFrame> {
        let mask = self.mask(trips)?;
        trips.filter(&mask)
    }
}

impl fmt::Display for TripWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            format_micros(self.start_us),
            format_micros(self.end_us)
        )
    }
}

pub fn format_micros(micros: i64) -> String {
    match DateTime::from_timestamp_micros(micros) {
        Some(dt) => dt.naive_utc().to_string(),
        None => format!("{micros}us"),
    }
}
