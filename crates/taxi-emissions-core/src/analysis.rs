use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDateTime};
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

use taxi_emissions_parser::{PICKUP_TS, TAXI_TYPE, TRIP_DISTANCE};

use crate::enrichment::{
    AVG_MPH, DAY_OF_WEEK, HOUR_OF_DAY, MONTH_OF_YEAR, TRIP_CO2_KGS, WEEK_OF_YEAR,
};
use crate::window::TripWindow;

const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("enriched row {row_index} has a null '{column}'")]
    NullField {
        column: &'static str,
        row_index: usize,
    },
    #[error("enriched row {row_index} has an unrepresentable pickup timestamp ({micros}us)")]
    InvalidTimestamp { row_index: usize, micros: i64 },
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarFeature {
    HourOfDay,
    DayOfWeek,
    WeekOfYear,
    MonthOfYear,
}

impl CalendarFeature {
    pub const ALL: [CalendarFeature; 4] = [
        CalendarFeature::HourOfDay,
        CalendarFeature::DayOfWeek,
        CalendarFeature::WeekOfYear,
        CalendarFeature::MonthOfYear,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            CalendarFeature::HourOfDay => HOUR_OF_DAY,
            CalendarFeature::DayOfWeek => DAY_OF_WEEK,
            CalendarFeature::WeekOfYear => WEEK_OF_YEAR,
            CalendarFeature::MonthOfYear => MONTH_OF_YEAR,
        }
    }

    /// Human label for a bucket value; days of the week print as `Sun..Sat`.
    pub fn label(&self, bucket: i32) -> String {
        match self {
            CalendarFeature::DayOfWeek => day_of_week_label(bucket).to_string(),
            _ => bucket.to_string(),
        }
    }
}

pub fn day_of_week_label(day_of_week: i32) -> &'static str {
    DAY_LABELS[day_of_week.rem_euclid(7) as usize]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LargestTrip {
    pub taxi_type: String,
    pub pickup_ts: NaiveDateTime,
    pub trip_distance: f64,
    pub avg_mph: f64,
    pub trip_co2_kgs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeavyLight {
    pub taxi_type: String,
    pub feature: CalendarFeature,
    pub heavy_bucket: i32,
    pub heavy_avg_co2_kgs: f64,
    pub light_bucket: i32,
    pub light_avg_co2_kgs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub taxi_type: String,
    pub year: i32,
    pub month: u32,
    pub total_co2_kgs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub largest_trips: Vec<LargestTrip>,
    pub heavy_light: Vec<HeavyLight>,
    pub monthly_totals: Vec<MonthlyTotal>,
}

/// Row view over the enriched columns the reports need.
struct EnrichedRows<'a> {
    taxi_type: &'a StringChunked,
    pickup: Int64Chunked,
    distance: &'a Float64Chunked,
    avg_mph: &'a Float64Chunked,
    co2_kgs: &'a Float64Chunked,
}

impl<'a> EnrichedRows<'a> {
    fn new(df: &'a DataFrame) -> Result<Self, AnalysisError> {
        let pickup = df.column(PICKUP_TS)?.cast(&DataType::Int64)?;
        Ok(Self {
            taxi_type: df.column(TAXI_TYPE)?.str()?,
            pickup: pickup.i64()?.clone(),
            distance: df.column(TRIP_DISTANCE)?.f64()?,
            avg_mph: df.column(AVG_MPH)?.f64()?,
            co2_kgs: df.column(TRIP_CO2_KGS)?.f64()?,
        })
    }

    fn taxi_type(&self, idx: usize) -> Result<&'a str, AnalysisError> {
        required(self.taxi_type.get(idx), TAXI_TYPE, idx)
    }

    fn co2_kgs(&self, idx: usize) -> Result<f64, AnalysisError> {
        required(self.co2_kgs.get(idx), TRIP_CO2_KGS, idx)
    }

    fn pickup_micros(&self, idx: usize) -> Result<i64, AnalysisError> {
        required(self.pickup.get(idx), PICKUP_TS, idx)
    }

    fn pickup(&self, idx: usize) -> Result<NaiveDateTime, AnalysisError> {
        let micros = self.pickup_micros(idx)?;
        DateTime::from_timestamp_micros(micros)
            .map(|dt| dt.naive_utc())
            .ok_or(AnalysisError::InvalidTimestamp {
                row_index: idx,
                micros,
            })
    }
}

/// The single trip with the most CO2 per category. Ties go to the earliest pickup.
pub fn largest_trip_by_type(
    enriched: &DataFrame,
    window: &TripWindow,
) -> Result<Vec<LargestTrip>, AnalysisError> {
    let windowed = window.apply(enriched)?;
    let rows = EnrichedRows::new(&windowed)?;

    let mut best: BTreeMap<&str, (f64, i64, usize)> = BTreeMap::new();
    for idx in 0..windowed.height() {
        let taxi_type = rows.taxi_type(idx)?;
        let co2 = rows.co2_kgs(idx)?;
        let pickup = rows.pickup_micros(idx)?;

        best.entry(taxi_type)
            .and_modify(|current| {
                if co2 > current.0 || (co2 == current.0 && pickup < current.1) {
                    *current = (co2, pickup, idx);
                }
            })
            .or_insert((co2, pickup, idx));
    }

    best.into_iter()
        .map(|(taxi_type, (co2, _, idx))| {
            Ok(LargestTrip {
                taxi_type: taxi_type.to_string(),
                pickup_ts: rows.pickup(idx)?,
                trip_distance: required(rows.distance.get(idx), TRIP_DISTANCE, idx)?,
                avg_mph: required(rows.avg_mph.get(idx), AVG_MPH, idx)?,
                trip_co2_kgs: co2,
            })
        })
        .collect()
}

/// For each category, the bucket of `feature` with the highest and the lowest mean CO2 per
/// trip. When several buckets share the extreme mean the largest bucket value wins.
pub fn heavy_light_by(
    enriched: &DataFrame,
    window: &TripWindow,
    feature: CalendarFeature,
) -> Result<Vec<HeavyLight>, AnalysisError> {
    let windowed = window.apply(enriched)?;
    let rows = EnrichedRows::new(&windowed)?;
    let buckets = windowed.column(feature.column())?.cast(&DataType::Int32)?;
    let buckets = buckets.i32()?;

    let mut sums: BTreeMap<&str, BTreeMap<i32, (f64, usize)>> = BTreeMap::new();
    for idx in 0..windowed.height() {
        let taxi_type = rows.taxi_type(idx)?;
        let co2 = rows.co2_kgs(idx)?;
        let bucket = required(buckets.get(idx), feature.column(), idx)?;

        let entry = sums
            .entry(taxi_type)
            .or_default()
            .entry(bucket)
            .or_insert((0.0, 0));
        entry.0 += co2;
        entry.1 += 1;
    }

    let mut results = Vec::with_capacity(sums.len());
    for (taxi_type, per_bucket) in sums {
        let mut heavy: Option<(i32, f64)> = None;
        let mut light: Option<(i32, f64)> = None;

        // Buckets iterate in ascending order, so `>=` / `<=` hand ties to the larger bucket.
        for (bucket, (sum, count)) in per_bucket {
            let avg = sum / count as f64;
            if heavy.map_or(true, |(_, best)| avg >= best) {
                heavy = Some((bucket, avg));
            }
            if light.map_or(true, |(_, best)| avg <= best) {
                light = Some((bucket, avg));
            }
        }

        if let (Some((heavy_bucket, heavy_avg)), Some((light_bucket, light_avg))) = (heavy, light)
        {
            results.push(HeavyLight {
                taxi_type: taxi_type.to_string(),
                feature,
                heavy_bucket,
                heavy_avg_co2_kgs: heavy_avg,
                light_bucket,
                light_avg_co2_kgs: light_avg,
            });
        }
    }

    Ok(results)
}

/// Total CO2 per category per calendar month of pickup, ordered by month then category.
pub fn monthly_totals(
    enriched: &DataFrame,
    window: &TripWindow,
) -> Result<Vec<MonthlyTotal>, AnalysisError> {
    let windowed = window.apply(enriched)?;
    let rows = EnrichedRows::new(&windowed)?;

    let mut totals: BTreeMap<(i32, u32, &str), f64> = BTreeMap::new();
    for idx in 0..windowed.height() {
        let pickup = rows.pickup(idx)?;
        let taxi_type = rows.taxi_type(idx)?;
        *totals
            .entry((pickup.year(), pickup.month(), taxi_type))
            .or_insert(0.0) += rows.co2_kgs(idx)?;
    }

    Ok(totals
        .into_iter()
        .map(|((year, month, taxi_type), total_co2_kgs)| MonthlyTotal {
            taxi_type: taxi_type.to_string(),
            year,
            month,
            total_co2_kgs,
        })
        .collect())
}

pub fn analyze(enriched: &DataFrame, window: &TripWindow) -> Result<AnalysisReport, AnalysisError> {
    let mut heavy_light = Vec::new();
    for feature in CalendarFeature::ALL {
        heavy_light.extend(heavy_light_by(enriched, window, feature)?);
    }

    Ok(AnalysisReport {
        largest_trips: largest_trip_by_type(enriched, window)?,
        heavy_light,
        monthly_totals: monthly_totals(enriched, window)?,
    })
}

fn required<T>(value: Option<T>, column: &'static str, row_index: usize) -> Result<T, AnalysisError> {
    value.ok_or(AnalysisError::NullField { column, row_index })
}
