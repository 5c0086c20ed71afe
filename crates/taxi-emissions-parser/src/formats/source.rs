use polars::prelude::DataFrame;

use crate::errors::NormalizeError;
use crate::model::{SourceSchema, TaxiType};
use crate::registry::TripNormalizer;

use super::{
    build_canonical_frame, coerce_distances, coerce_passenger_counts, coerce_timestamps,
    find_column,
};

/// Maps one raw source frame onto the canonical trip columns. Every raw row yields exactly
/// one canonical row tagged with this normalizer's taxi type; nothing is filtered here.
#[derive(Debug, Clone)]
pub struct SourceNormalizer {
    taxi_type: TaxiType,
    schema: SourceSchema,
}

impl SourceNormalizer {
    pub fn new(taxi_type: TaxiType, schema: SourceSchema) -> Self {
        Self { taxi_type, schema }
    }

    pub fn yellow() -> Self {
        Self::new(TaxiType::Yellow, SourceSchema::yellow())
    }

    pub fn green() -> Self {
        Self::new(TaxiType::Green, SourceSchema::green())
    }

    pub fn schema(&self) -> &SourceSchema {
        &self.schema
    }
}

impl TripNormalizer for SourceNormalizer {
    fn name(&self) -> &'static str {
        match self.taxi_type {
            TaxiType::Yellow => "YELLOW_TPEP",
            TaxiType::Green => "GREEN_LPEP",
        }
    }

    fn taxi_type(&self) -> TaxiType {
        self.taxi_type
    }

    fn normalize(&self, raw: &DataFrame) -> Result<DataFrame, NormalizeError> {
        let normalizer = self.name();

        let pickup = find_column(raw, &self.schema.pickup_column).ok_or_else(|| {
            NormalizeError::FormatMismatch {
                normalizer,
                reason: format!("frame has no '{}' column", self.schema.pickup_column),
            }
        })?;
        let dropoff = find_column(raw, &self.schema.dropoff_column).ok_or_else(|| {
            NormalizeError::FormatMismatch {
                normalizer,
                reason: format!("frame has no '{}' column", self.schema.dropoff_column),
            }
        })?;
        let distance = find_column(raw, &self.schema.distance_column).ok_or_else(|| {
            NormalizeError::MissingColumn {
                normalizer,
                column: self.schema.distance_column.clone(),
            }
        })?;
        let passengers = find_column(raw, &self.schema.passenger_count_column).ok_or_else(|| {
            NormalizeError::MissingColumn {
                normalizer,
                column: self.schema.passenger_count_column.clone(),
            }
        })?;

        let pickup_us = coerce_timestamps(normalizer, pickup)?;
        let dropoff_us = coerce_timestamps(normalizer, dropoff)?;
        let distances = coerce_distances(normalizer, distance)?;
        let passenger_counts = coerce_passenger_counts(normalizer, passengers)?;

        build_canonical_frame(
            self.taxi_type,
            pickup_us,
            dropoff_us,
            distances,
            passenger_counts,
        )
    }
}
