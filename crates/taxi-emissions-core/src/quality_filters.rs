use std::fmt;

use chrono::{DateTime, Datelike};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use taxi_emissions_parser::{DROPOFF_TS, PASSENGER_COUNT, PICKUP_TS, TRIP_DISTANCE};

pub const QUALITY_COLUMN: &str = "quality";
pub const QUALITY_EXPLANATION_COLUMN: &str = "quality_explanation";
pub const SUSPECT: &str = "SUSPECT";

const HOURS_TO_MICROS: f64 = 60.0 * 60.0 * 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub max_trip_distance_miles: f64,
    pub max_trip_duration_hours: f64,
    pub min_trip_year: i32,
    pub max_trip_year: i32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            max_trip_distance_miles: 100.0,
            max_trip_duration_hours: 24.0,
            min_trip_year: 2015,
            max_trip_year: 2024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityRule {
    PassengerCountZero,
    TripDistanceNonPositive,
    TripDistanceAboveMax,
    NegativeDuration,
    DurationAboveMax,
    TripYearOutOfRange,
}

impl QualityRule {
    pub const ALL: [QualityRule; 6] = [
        QualityRule::PassengerCountZero,
        QualityRule::TripDistanceNonPositive,
        QualityRule::TripDistanceAboveMax,
        QualityRule::NegativeDuration,
        QualityRule::DurationAboveMax,
        QualityRule::TripYearOutOfRange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityRule::PassengerCountZero => "passenger_count_zero",
            QualityRule::TripDistanceNonPositive => "trip_distance_non_positive",
            QualityRule::TripDistanceAboveMax => "trip_distance_above_max",
            QualityRule::NegativeDuration => "negative_duration",
            QualityRule::DurationAboveMax => "duration_above_max",
            QualityRule::TripYearOutOfRange => "trip_year_out_of_range",
        }
    }

    pub fn from_reason(reason: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rule| rule.as_str() == reason)
    }
}

impl fmt::Display for QualityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags suspicious canonical trips without dropping any row. Adds `quality` ("SUSPECT" or
/// null) and `quality_explanation` (`|`-joined rule names).
pub fn apply_quality_filters(
    df: &DataFrame,
    thresholds: &QualityThresholds,
) -> Result<DataFrame, PolarsError> {
    let len = df.height();

    let pickup_column = df.column(PICKUP_TS)?.cast(&DataType::Int64)?;
    let dropoff_column = df.column(DROPOFF_TS)?.cast(&DataType::Int64)?;
    let passenger_column = df.column(PASSENGER_COUNT)?.cast(&DataType::Int64)?;
    let pickup = pickup_column.i64()?;
    let dropoff = dropoff_column.i64()?;
    let passengers = passenger_column.i64()?;
    let distance = df.column(TRIP_DISTANCE)?.f64()?;

    let max_duration_micros = thresholds.max_trip_duration_hours * HOURS_TO_MICROS;

    let mut quality: Vec<Option<&str>> = Vec::with_capacity(len);
    let mut explanations: Vec<Option<String>> = Vec::with_capacity(len);

    for idx in 0..len {
        let mut reasons = Vec::new();

        if passengers.get(idx).unwrap_or(0) == 0 {
            reasons.push(QualityRule::PassengerCountZero.as_str());
        }

        if let Some(miles) = distance.get(idx) {
            if miles <= 0.0 {
                reasons.push(QualityRule::TripDistanceNonPositive.as_str());
            }
            if miles > thresholds.max_trip_distance_miles {
                reasons.push(QualityRule::TripDistanceAboveMax.as_str());
            }
        }

        if let (Some(pickup_us), Some(dropoff_us)) = (pickup.get(idx), dropoff.get(idx)) {
            if dropoff_us < pickup_us {
                reasons.push(QualityRule::NegativeDuration.as_str());
            }
            if (dropoff_us.saturating_sub(pickup_us) as f64) > max_duration_micros {
                reasons.push(QualityRule::DurationAboveMax.as_str());
            }
        }

        let years_in_range = [pickup.get(idx), dropoff.get(idx)]
            .into_iter()
            .flatten()
            .all(|micros| year_in_range(micros, thresholds));
        if !years_in_range {
            reasons.push(QualityRule::TripYearOutOfRange.as_str());
        }

        if reasons.is_empty() {
            quality.push(None);
            explanations.push(None);
        } else {
            quality.push(Some(SUSPECT));
            explanations.push(Some(reasons.join("|")));
        }
    }

    let quality_series = Series::new(QUALITY_COLUMN.into(), quality);
    let explanation_series = Series::new(
        QUALITY_EXPLANATION_COLUMN.into(),
        explanations
            .iter()
            .map(|opt| opt.as_deref())
            .collect::<Vec<Option<&str>>>(),
    );

    let mut output = df.clone();
    let mut columns = [quality_series.into(), explanation_series.into()];
    output.hstack_mut(columns.as_mut_slice())?;

    Ok(output)
}

/// Both pickup and dropoff must fall in `[min_trip_year, max_trip_year]`.
fn year_in_range(micros: i64, thresholds: &QualityThresholds) -> bool {
    DateTime::from_timestamp_micros(micros).is_some_and(|dt| {
        let year = dt.naive_utc().year();
        year >= thresholds.min_trip_year && year <= thresholds.max_trip_year
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub rows: usize,
    pub suspect_rows: usize,
    pub counts: Vec<(QualityRule, usize)>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.counts.iter().all(|(_, count)| *count == 0)
    }

    pub fn count(&self, rule: QualityRule) -> usize {
        self.counts
            .iter()
            .find(|(candidate, _)| *candidate == rule)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

/// Per-rule row counts over a frame produced by [`apply_quality_filters`]. Every rule is
/// listed, zero counts included.
pub fn quality_report(flagged: &DataFrame) -> Result<QualityReport, PolarsError> {
    let explanations = flagged.column(QUALITY_EXPLANATION_COLUMN)?.str()?;

    let mut counts = [0usize; QualityRule::ALL.len()];
    let mut suspect_rows = 0;
    for explanation in explanations.into_iter().flatten() {
        suspect_rows += 1;
        for reason in explanation.split('|') {
            if let Some(rule) = QualityRule::from_reason(reason) {
                counts[rule as usize] += 1;
            }
        }
    }

    Ok(QualityReport {
        rows: flagged.height(),
        suspect_rows,
        counts: QualityRule::ALL.into_iter().zip(counts).collect(),
    })
}
