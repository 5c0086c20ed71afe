use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use polars::prelude::*;
use thiserror::Error;
use tracing::info;

use taxi_emissions_parser::{DROPOFF_TS, PICKUP_TS, TAXI_TYPE, TRIP_DISTANCE};

use crate::emissions::EmissionsLookup;
use crate::window::TripWindow;

const MICROS_PER_SECOND: f64 = 1_000_000.0;
const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 3600.0;
const GRAMS_PER_KILOGRAM: f64 = 1000.0;

pub const CO2_GRAMS_PER_MILE: &str = "co2_grams_per_mile";
pub const TRIP_DURATION_MINUTES: &str = "trip_duration_minutes";
pub const TRIP_DURATION_HOURS: &str = "trip_duration_hours";
pub const AVG_MPH: &str = "avg_mph";
pub const TRIP_CO2_KGS: &str = "trip_co2_kgs";
pub const HOUR_OF_DAY: &str = "hour_of_day";
pub const DAY_OF_WEEK: &str = "day_of_week";
pub const WEEK_OF_YEAR: &str = "week_of_year";
pub const MONTH_OF_YEAR: &str = "month_of_year";

pub const ENRICHED_COLUMNS: [&str; 9] = [
    CO2_GRAMS_PER_MILE,
    TRIP_DURATION_MINUTES,
    TRIP_DURATION_HOURS,
    AVG_MPH,
    TRIP_CO2_KGS,
    HOUR_OF_DAY,
    DAY_OF_WEEK,
    WEEK_OF_YEAR,
    MONTH_OF_YEAR,
];

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("trip row {row_index} has a null '{column}'")]
    NullField {
        column: &'static str,
        row_index: usize,
    },
    #[error("trip row {row_index} has an unrepresentable pickup timestamp ({micros}us)")]
    InvalidTimestamp { row_index: usize, micros: i64 },
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripMetrics {
    pub trip_duration_minutes: f64,
    pub trip_duration_hours: f64,
    pub avg_mph: f64,
    pub trip_co2_kgs: f64,
}

/// Durations clamp at zero when dropoff is not after pickup; a zero-length trip reports
/// exactly `0.0` mph instead of dividing by zero.
pub fn compute_trip_metrics(
    pickup_us: i64,
    dropoff_us: i64,
    trip_distance: f64,
    co2_grams_per_mile: f64,
) -> TripMetrics {
    let trip_seconds = dropoff_us.saturating_sub(pickup_us).max(0) as f64 / MICROS_PER_SECOND;
    let trip_duration_hours = trip_seconds / SECONDS_PER_HOUR;
    let avg_mph = if trip_seconds > 0.0 {
        trip_distance / trip_duration_hours
    } else {
        0.0
    };

    TripMetrics {
        trip_duration_minutes: trip_seconds / SECONDS_PER_MINUTE,
        trip_duration_hours,
        avg_mph,
        trip_co2_kgs: (trip_distance * co2_grams_per_mile) / GRAMS_PER_KILOGRAM,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub hour_of_day: i32,
    /// 0 = Sunday through 6 = Saturday.
    pub day_of_week: i32,
    /// ISO-8601 week, 1–53.
    pub week_of_year: i32,
    pub month_of_year: i32,
}

pub fn calendar_features(pickup: &NaiveDateTime) -> CalendarFeatures {
    CalendarFeatures {
        hour_of_day: pickup.hour() as i32,
        day_of_week: pickup.weekday().num_days_from_sunday() as i32,
        week_of_year: pickup.iso_week().week() as i32,
        month_of_year: pickup.month() as i32,
    }
}

/// Inner-joins trips against the lookup on the uppercased category and appends the derived
/// metric and calendar columns. Trips whose category has no factor are dropped without
/// error, so the output can be shorter than the input.
pub fn enrich_trips(
    fct_trips: &DataFrame,
    lookup: &EmissionsLookup,
) -> Result<DataFrame, EnrichmentError> {
    let len = fct_trips.height();

    let pickup_column = fct_trips.column(PICKUP_TS)?.cast(&DataType::Int64)?;
    let dropoff_column = fct_trips.column(DROPOFF_TS)?.cast(&DataType::Int64)?;
    let pickup = pickup_column.i64()?;
    let dropoff = dropoff_column.i64()?;
    let distance = fct_trips.column(TRIP_DISTANCE)?.f64()?;
    let taxi_type = fct_trips.column(TAXI_TYPE)?.str()?;

    let mut matched = Vec::with_capacity(len);
    let mut factors = Vec::with_capacity(len);
    let mut minutes = Vec::with_capacity(len);
    let mut hours = Vec::with_capacity(len);
    let mut mph = Vec::with_capacity(len);
    let mut co2_kgs = Vec::with_capacity(len);
    let mut hour_of_day = Vec::with_capacity(len);
    let mut day_of_week = Vec::with_capacity(len);
    let mut week_of_year = Vec::with_capacity(len);
    let mut month_of_year = Vec::with_capacity(len);

    for idx in 0..len {
        let category = taxi_type.get(idx).ok_or(EnrichmentError::NullField {
            column: TAXI_TYPE,
            row_index: idx,
        })?;
        let Some(factor) = lookup.factor_for(category) else {
            matched.push(false);
            continue;
        };
        matched.push(true);

        let pickup_us = required(pickup.get(idx), PICKUP_TS, idx)?;
        let dropoff_us = required(dropoff.get(idx), DROPOFF_TS, idx)?;
        let trip_distance = required(distance.get(idx), TRIP_DISTANCE, idx)?;

        let metrics = compute_trip_metrics(pickup_us, dropoff_us, trip_distance, factor);
        let pickup_ts = DateTime::from_timestamp_micros(pickup_us)
            .ok_or(EnrichmentError::InvalidTimestamp {
                row_index: idx,
                micros: pickup_us,
            })?
            .naive_utc();
        let calendar = calendar_features(&pickup_ts);

        factors.push(factor);
        minutes.push(metrics.trip_duration_minutes);
        hours.push(metrics.trip_duration_hours);
        mph.push(metrics.avg_mph);
        co2_kgs.push(metrics.trip_co2_kgs);
        hour_of_day.push(calendar.hour_of_day);
        day_of_week.push(calendar.day_of_week);
        week_of_year.push(calendar.week_of_year);
        month_of_year.push(calendar.month_of_year);
    }

    let mask: BooleanChunked = matched.into_iter().collect();
    let mut output = fct_trips.filter(&mask)?;
    output.hstack_mut(&mut [
        Series::new(CO2_GRAMS_PER_MILE.into(), factors).into(),
        Series::new(TRIP_DURATION_MINUTES.into(), minutes).into(),
        Series::new(TRIP_DURATION_HOURS.into(), hours).into(),
        Series::new(AVG_MPH.into(), mph).into(),
        Series::new(TRIP_CO2_KGS.into(), co2_kgs).into(),
        Series::new(HOUR_OF_DAY.into(), hour_of_day).into(),
        Series::new(DAY_OF_WEEK.into(), day_of_week).into(),
        Series::new(WEEK_OF_YEAR.into(), week_of_year).into(),
        Series::new(MONTH_OF_YEAR.into(), month_of_year).into(),
    ])?;

    info!(
        input_rows = len,
        enriched_rows = output.height(),
        excluded_rows = len - output.height(),
        "enriched trips with emissions factors"
    );
    Ok(output)
}

/// Builds `fct_trips_enriched` from the upstream trips view, re-applying the window.
pub fn build_fct_trips_enriched(
    fct_trips: &DataFrame,
    window: &TripWindow,
    lookup: &EmissionsLookup,
) -> Result<DataFrame, EnrichmentError> {
    let windowed = window.apply(fct_trips)?;
    enrich_trips(&windowed, lookup)
}

fn required<T>(value: Option<T>, column: &'static str, row_index: usize) -> Result<T, EnrichmentError> {
    value.ok_or(EnrichmentError::NullField { column, row_index })
}
