use polars::prelude::*;

pub const PICKUP_TS: &str = "pickup_ts";
pub const DROPOFF_TS: &str = "dropoff_ts";
pub const TRIP_DISTANCE: &str = "trip_distance";
pub const PASSENGER_COUNT: &str = "passenger_count";
pub const TAXI_TYPE: &str = "taxi_type";

pub const CANONICAL_COLUMNS: [&str; 5] = [
    PICKUP_TS,
    DROPOFF_TS,
    TRIP_DISTANCE,
    PASSENGER_COUNT,
    TAXI_TYPE,
];

/// Canonical timestamps are naive (no time zone); values are kept exactly as recorded.
pub fn canonical_timestamp_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Microseconds, None)
}

pub fn empty_canonical_frame() -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new_empty(PICKUP_TS.into(), &canonical_timestamp_dtype()).into(),
        Series::new_empty(DROPOFF_TS.into(), &canonical_timestamp_dtype()).into(),
        Series::new_empty(TRIP_DISTANCE.into(), &DataType::Float64).into(),
        Series::new_empty(PASSENGER_COUNT.into(), &DataType::UInt32).into(),
        Series::new_empty(TAXI_TYPE.into(), &DataType::String).into(),
    ])
}
