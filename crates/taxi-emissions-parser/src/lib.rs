pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{NormalizeError, NormalizerAttempt};
pub use formats::schema::{
    canonical_timestamp_dtype, empty_canonical_frame, CANONICAL_COLUMNS, DROPOFF_TS,
    PASSENGER_COUNT, PICKUP_TS, TAXI_TYPE, TRIP_DISTANCE,
};
pub use formats::SourceNormalizer;
pub use model::{SourceSchema, TaxiType};
pub use registry::{normalize_trip_frame, normalize_with_normalizers, TripNormalizer};

#[cfg(test)]
mod tests;
