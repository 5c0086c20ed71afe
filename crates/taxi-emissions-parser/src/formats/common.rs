use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::errors::NormalizeError;
use crate::model::TaxiType;

use super::schema::{
    canonical_timestamp_dtype, DROPOFF_TS, PASSENGER_COUNT, PICKUP_TS, TAXI_TYPE, TRIP_DISTANCE,
};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

/// Looks a raw column up by exact name, falling back to a unique case-insensitive match.
/// Early green exports spell the shared columns `Trip_distance` / `Passenger_count`.
pub(crate) fn find_column<'a>(raw: &'a DataFrame, name: &str) -> Option<&'a Column> {
    if let Ok(column) = raw.column(name) {
        return Some(column);
    }

    let mut matches = raw
        .get_columns()
        .iter()
        .filter(|column| column.name().as_str().eq_ignore_ascii_case(name));
    let first = matches.next();
    if matches.next().is_some() {
        return None;
    }
    first
}

pub(crate) fn parse_timestamp(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|dt| dt.and_utc().timestamp_micros())
}

/// Coerces a pickup/dropoff column into naive microseconds. Zoned columns are only taken when
/// the zone is UTC, where the stored instant already is the wall-clock reading.
pub(crate) fn coerce_timestamps(
    normalizer: &'static str,
    column: &Column,
) -> Result<Vec<i64>, NormalizeError> {
    let name = column.name().to_string();
    match column.dtype() {
        DataType::Datetime(_, Some(zone)) if *zone != TimeZone::UTC => {
            Err(unsupported_type(normalizer, &name, column.dtype()))
        }
        DataType::Datetime(_, _) | DataType::Date => {
            let micros = column
                .cast(&canonical_timestamp_dtype())?
                .cast(&DataType::Int64)?;
            collect_required(normalizer, &name, micros.i64()?.into_iter())
        }
        DataType::String => column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row_index, value)| {
                let text = value.ok_or_else(|| null_field(normalizer, &name, row_index))?;
                parse_timestamp(text).ok_or_else(|| NormalizeError::InvalidField {
                    normalizer,
                    column: name.clone(),
                    row_index,
                    message: format!("invalid timestamp '{}'", text.trim()),
                })
            })
            .collect(),
        DataType::Null => null_column(normalizer, &name, column.len()),
        other => Err(unsupported_type(normalizer, &name, other)),
    }
}

pub(crate) fn coerce_distances(
    normalizer: &'static str,
    column: &Column,
) -> Result<Vec<f64>, NormalizeError> {
    let name = column.name().to_string();
    let dtype = column.dtype();

    if dtype.is_float() || dtype.is_integer() {
        let values = column.cast(&DataType::Float64)?;
        return values
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row_index, value)| {
                let value = value.ok_or_else(|| null_field(normalizer, &name, row_index))?;
                finite_distance(normalizer, &name, row_index, value)
            })
            .collect();
    }

    match dtype {
        DataType::String => column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row_index, value)| {
                let text = value.ok_or_else(|| null_field(normalizer, &name, row_index))?;
                let parsed =
                    text.trim()
                        .parse::<f64>()
                        .map_err(|err| NormalizeError::InvalidField {
                            normalizer,
                            column: name.clone(),
                            row_index,
                            message: format!("failed to parse '{}' as a distance: {err}", text.trim()),
                        })?;
                finite_distance(normalizer, &name, row_index, parsed)
            })
            .collect(),
        DataType::Null => null_column(normalizer, &name, column.len()),
        other => Err(unsupported_type(normalizer, &name, other)),
    }
}

/// Passenger counts must land on a non-negative integer. Some monthly files store the column
/// as a double, so integral floats are accepted. Missing counts stay null; later yellow
/// exports leave the field empty on a share of rows.
pub(crate) fn coerce_passenger_counts(
    normalizer: &'static str,
    column: &Column,
) -> Result<Vec<Option<u32>>, NormalizeError> {
    let name = column.name().to_string();
    let dtype = column.dtype();

    if dtype.is_integer() {
        let values = column.cast(&DataType::Int64)?;
        return values
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(row_index, value)| {
                value
                    .map(|value| {
                        u32::try_from(value)
                            .map_err(|_| invalid_count(normalizer, &name, row_index, value))
                    })
                    .transpose()
            })
            .collect();
    }

    if dtype.is_float() {
        let values = column.cast(&DataType::Float64)?;
        return values
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row_index, value)| {
                value
                    .map(|value| {
                        float_to_count(value)
                            .ok_or_else(|| invalid_count(normalizer, &name, row_index, value))
                    })
                    .transpose()
            })
            .collect();
    }

    match dtype {
        DataType::String => column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row_index, value)| {
                let Some(trimmed) = value.map(str::trim).filter(|text| !text.is_empty()) else {
                    return Ok(None);
                };
                trimmed
                    .parse::<u32>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_count))
                    .map(Some)
                    .ok_or_else(|| invalid_count(normalizer, &name, row_index, trimmed))
            })
            .collect(),
        DataType::Null => Ok(vec![None; column.len()]),
        other => Err(unsupported_type(normalizer, &name, other)),
    }
}

pub(crate) fn build_canonical_frame(
    taxi_type: TaxiType,
    pickup_us: Vec<i64>,
    dropoff_us: Vec<i64>,
    distances: Vec<f64>,
    passenger_counts: Vec<Option<u32>>,
) -> Result<DataFrame, NormalizeError> {
    let height = pickup_us.len();

    let pickup = Series::new(PICKUP_TS.into(), pickup_us).cast(&canonical_timestamp_dtype())?;
    let dropoff = Series::new(DROPOFF_TS.into(), dropoff_us).cast(&canonical_timestamp_dtype())?;

    let columns: Vec<Column> = vec![
        pickup.into(),
        dropoff.into(),
        Series::new(TRIP_DISTANCE.into(), distances).into(),
        Series::new(PASSENGER_COUNT.into(), passenger_counts).into(),
        Series::new(TAXI_TYPE.into(), vec![taxi_type.as_str(); height]).into(),
    ];

    Ok(DataFrame::new(columns)?)
}

fn collect_required<T>(
    normalizer: &'static str,
    column: &str,
    values: impl Iterator<Item = Option<T>>,
) -> Result<Vec<T>, NormalizeError> {
    values
        .enumerate()
        .map(|(row_index, value)| value.ok_or_else(|| null_field(normalizer, column, row_index)))
        .collect()
}

fn finite_distance(
    normalizer: &'static str,
    column: &str,
    row_index: usize,
    value: f64,
) -> Result<f64, NormalizeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(NormalizeError::InvalidField {
            normalizer,
            column: column.to_string(),
            row_index,
            message: format!("distance {value} is not finite"),
        })
    }
}

fn float_to_count(value: f64) -> Option<u32> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

fn null_column<T>(
    normalizer: &'static str,
    column: &str,
    len: usize,
) -> Result<Vec<T>, NormalizeError> {
    if len == 0 {
        Ok(Vec::new())
    } else {
        Err(null_field(normalizer, column, 0))
    }
}

fn null_field(normalizer: &'static str, column: &str, row_index: usize) -> NormalizeError {
    NormalizeError::NullField {
        normalizer,
        column: column.to_string(),
        row_index,
    }
}

fn invalid_count(
    normalizer: &'static str,
    column: &str,
    row_index: usize,
    value: impl std::fmt::Display,
) -> NormalizeError {
    NormalizeError::InvalidField {
        normalizer,
        column: column.to_string(),
        row_index,
        message: format!("passenger count '{value}' is not a non-negative integer"),
    }
}

fn unsupported_type(normalizer: &'static str, column: &str, dtype: &DataType) -> NormalizeError {
    NormalizeError::UnsupportedType {
        normalizer,
        column: column.to_string(),
        dtype: dtype.to_string(),
    }
}
