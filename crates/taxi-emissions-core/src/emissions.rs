use std::collections::BTreeMap;

use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use taxi_emissions_parser::TaxiType;

pub const REFERENCE_KEY_COLUMN: &str = "taxi_type";
pub const VEHICLE_TYPE_COLUMN: &str = "vehicle_type";
pub const FACTOR_COLUMN: &str = "co2_grams_per_mile";

#[derive(Debug, Error)]
pub enum EmissionsError {
    #[error("emissions table is missing column '{0}'")]
    MissingColumn(String),
    #[error("emissions table has more than one factor for category '{key}'")]
    AmbiguousFactor { key: String },
    #[error("emissions table row {row_index} has no category key")]
    NullKey { row_index: usize },
    #[error("emissions factor for '{key}' at row {row_index} is not a finite number")]
    InvalidFactor { key: String, row_index: usize },
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Category → grams of CO2 per mile. Keys are uppercased so lookups are case-insensitive
/// on the category side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmissionsLookup {
    factors: BTreeMap<String, f64>,
}

pub fn category_key(raw: &str) -> String {
    raw.to_uppercase()
}

impl EmissionsLookup {
    /// Builds a lookup from explicit entries. Two keys that fold to the same uppercase value
    /// are ambiguous and rejected.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, EmissionsError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut factors = BTreeMap::new();
        for (row_index, (key, factor)) in entries.into_iter().enumerate() {
            let key = category_key(key.as_ref());
            if !factor.is_finite() {
                return Err(EmissionsError::InvalidFactor { key, row_index });
            }
            if factors.insert(key.clone(), factor).is_some() {
                return Err(EmissionsError::AmbiguousFactor { key });
            }
        }
        Ok(Self { factors })
    }

    /// Reads an already-normalized `taxi_type`, `co2_grams_per_mile` table.
    pub fn from_reference(table: &DataFrame) -> Result<Self, EmissionsError> {
        let keys = string_column(table, REFERENCE_KEY_COLUMN)?;
        let factors = table
            .column(FACTOR_COLUMN)
            .map_err(|_| EmissionsError::MissingColumn(FACTOR_COLUMN.to_string()))?
            .cast(&DataType::Float64)?;
        let factors = factors.f64()?;

        let mut entries = Vec::with_capacity(table.height());
        for (row_index, (key, factor)) in keys.str()?.into_iter().zip(factors).enumerate() {
            let key = key.ok_or(EmissionsError::NullKey { row_index })?;
            let factor = factor.ok_or_else(|| EmissionsError::InvalidFactor {
                key: category_key(key),
                row_index,
            })?;
            entries.push((key.to_string(), factor));
        }

        let lookup = Self::from_entries(entries)?;
        debug!(categories = lookup.len(), "loaded reference emissions lookup");
        Ok(lookup)
    }

    /// Reads a raw vehicle emissions table (`vehicle_type`, `co2_grams_per_mile`).
    ///
    /// Vehicle types mentioning "yellow" or "green" (any case) feed the matching taxi
    /// category and anything else is ignored. Factors that do not coerce to a number are
    /// skipped, and several rows for one category are averaged.
    pub fn from_vehicle_emissions(table: &DataFrame) -> Result<Self, EmissionsError> {
        let vehicle_types = string_column(table, VEHICLE_TYPE_COLUMN)?;
        let factors = table
            .column(FACTOR_COLUMN)
            .map_err(|_| EmissionsError::MissingColumn(FACTOR_COLUMN.to_string()))?
            .cast(&DataType::Float64)?;
        let factors = factors.f64()?;

        let mut sums: BTreeMap<TaxiType, (f64, usize)> = BTreeMap::new();
        let mut skipped = 0usize;
        for (vehicle_type, factor) in vehicle_types.str()?.into_iter().zip(factors) {
            let Some(taxi_type) = vehicle_type.and_then(taxi_type_for_vehicle) else {
                continue;
            };
            let Some(factor) = factor.filter(|value| value.is_finite()) else {
                skipped += 1;
                continue;
            };
            let entry = sums.entry(taxi_type).or_insert((0.0, 0));
            entry.0 += factor;
            entry.1 += 1;
        }

        if skipped > 0 {
            warn!(skipped, "ignored vehicle emissions rows without a numeric factor");
        }

        let lookup = Self::from_entries(
            sums.into_iter()
                .map(|(taxi_type, (sum, count))| (taxi_type.as_str(), sum / count as f64)),
        )?;
        debug!(categories = lookup.len(), "derived emissions lookup from vehicle table");
        Ok(lookup)
    }

    pub fn factor_for(&self, category: &str) -> Option<f64> {
        self.factors.get(&category_key(category)).copied()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.factors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// The lookup as a two-column reference table, sorted by category.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let keys: Vec<&str> = self.categories().collect();
        let factors: Vec<f64> = self.factors.values().copied().collect();
        DataFrame::new(vec![
            Series::new(REFERENCE_KEY_COLUMN.into(), keys).into(),
            Series::new(FACTOR_COLUMN.into(), factors).into(),
        ])
    }
}

fn taxi_type_for_vehicle(vehicle_type: &str) -> Option<TaxiType> {
    let lowered = vehicle_type.to_lowercase();
    if lowered.contains("yellow") {
        Some(TaxiType::Yellow)
    } else if lowered.contains("green") {
        Some(TaxiType::Green)
    } else {
        None
    }
}

fn string_column(table: &DataFrame, name: &str) -> Result<Column, EmissionsError> {
    Ok(table
        .column(name)
        .map_err(|_| EmissionsError::MissingColumn(name.to_string()))?
        .cast(&DataType::String)?)
}
