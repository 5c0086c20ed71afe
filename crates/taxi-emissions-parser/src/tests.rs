use chrono::NaiveDate;
use polars::prelude::*;

use crate::errors::NormalizeError;
use crate::formats::schema::{
    CANONICAL_COLUMNS, DROPOFF_TS, PASSENGER_COUNT, PICKUP_TS, TAXI_TYPE, TRIP_DISTANCE,
};
use crate::formats::SourceNormalizer;
use crate::model::{SourceSchema, TaxiType};
use crate::registry::{normalize_trip_frame, TripNormalizer};

fn micros(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> i64 {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(hh, mm, ss))
        .expect("valid fixture timestamp")
        .and_utc()
        .timestamp_micros()
}

fn column_micros(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    let physical = df
        .column(name)
        .expect("timestamp column present")
        .cast(&DataType::Int64)
        .expect("timestamp casts to physical");
    physical.i64().expect("int64 column").into_iter().collect()
}

fn yellow_raw() -> DataFrame {
    df!(
        "VendorID" => &[1i32, 2],
        "tpep_pickup_datetime" => &["2019-03-04 10:15:00", "2019-03-04 23:59:59"],
        "tpep_dropoff_datetime" => &["2019-03-04 10:45:00", "2019-03-05 00:20:30"],
        "passenger_count" => &[1i64, 3],
        "trip_distance" => &[2.5f64, 7.25],
        "fare_amount" => &[12.0f64, 24.5],
    )
    .expect("yellow fixture")
}

#[test]
fn yellow_normalizer_maps_tpep_columns() {
    let normalized = SourceNormalizer::yellow()
        .normalize(&yellow_raw())
        .expect("yellow frame normalizes");

    assert_eq!(normalized.get_column_names_str(), CANONICAL_COLUMNS);
    assert_eq!(normalized.height(), 2);

    assert_eq!(
        column_micros(&normalized, PICKUP_TS),
        vec![
            Some(micros(2019, 3, 4, 10, 15, 0)),
            Some(micros(2019, 3, 4, 23, 59, 59))
        ]
    );
    assert_eq!(
        column_micros(&normalized, DROPOFF_TS),
        vec![
            Some(micros(2019, 3, 4, 10, 45, 0)),
            Some(micros(2019, 3, 5, 0, 20, 30))
        ]
    );

    let distance = normalized.column(TRIP_DISTANCE).unwrap().f64().unwrap();
    assert_eq!(distance.get(0), Some(2.5));
    assert_eq!(distance.get(1), Some(7.25));

    let passengers = normalized.column(PASSENGER_COUNT).unwrap().u32().unwrap();
    assert_eq!(passengers.get(0), Some(1));
    assert_eq!(passengers.get(1), Some(3));

    let taxi_type = normalized.column(TAXI_TYPE).unwrap().str().unwrap();
    assert!(taxi_type.into_iter().all(|value| value == Some("YELLOW")));
}

#[test]
fn green_normalizer_accepts_capitalized_shared_columns() {
    let raw = df!(
        "lpep_pickup_datetime" => &["2015-06-01 08:00:00"],
        "Lpep_dropoff_datetime" => &["2015-06-01 08:12:00"],
        "Passenger_count" => &[2i64],
        "Trip_distance" => &[1.75f64],
    )
    .unwrap();

    let normalized = SourceNormalizer::green()
        .normalize(&raw)
        .expect("green frame normalizes");

    let taxi_type = normalized.column(TAXI_TYPE).unwrap().str().unwrap();
    assert_eq!(taxi_type.get(0), Some("GREEN"));
    assert_eq!(
        column_micros(&normalized, DROPOFF_TS),
        vec![Some(micros(2015, 6, 1, 8, 12, 0))]
    );
    let passengers = normalized.column(PASSENGER_COUNT).unwrap().u32().unwrap();
    assert_eq!(passengers.get(0), Some(2));
}

#[test]
fn registry_detects_green_frames() {
    let raw = df!(
        "lpep_pickup_datetime" => &["2020-01-01 00:05:00"],
        "lpep_dropoff_datetime" => &["2020-01-01 00:25:00"],
        "passenger_count" => &[1i64],
        "trip_distance" => &[3.0f64],
    )
    .unwrap();

    let normalized = normalize_trip_frame(&raw).expect("registry recognizes green frame");
    let taxi_type = normalized.column(TAXI_TYPE).unwrap().str().unwrap();
    assert_eq!(taxi_type.get(0), Some(TaxiType::Green.as_str()));
}

#[test]
fn registry_reports_attempts_for_unknown_frames() {
    let raw = df!("pickup" => &["2020-01-01 00:05:00"]).unwrap();

    match normalize_trip_frame(&raw) {
        Err(NormalizeError::NoMatchingNormalizer { attempts }) => {
            let names: Vec<&str> = attempts.iter().map(|attempt| attempt.normalizer).collect();
            assert_eq!(names, vec!["YELLOW_TPEP", "GREEN_LPEP"]);
        }
        other => panic!("expected NoMatchingNormalizer, got {other:?}"),
    }
}

#[test]
fn typed_datetime_columns_are_rescaled_to_microseconds() {
    let pickup_ns = micros(2016, 2, 29, 12, 0, 0) * 1_000;
    let dropoff_ns = micros(2016, 2, 29, 12, 30, 0) * 1_000;
    let ns_dtype = DataType::Datetime(TimeUnit::Nanoseconds, None);

    let raw = DataFrame::new(vec![
        Series::new("tpep_pickup_datetime".into(), vec![pickup_ns])
            .cast(&ns_dtype)
            .unwrap()
            .into(),
        Series::new("tpep_dropoff_datetime".into(), vec![dropoff_ns])
            .cast(&ns_dtype)
            .unwrap()
            .into(),
        Series::new("passenger_count".into(), vec![1.0f64]).into(),
        Series::new("trip_distance".into(), vec![4i64]).into(),
    ])
    .unwrap();

    let normalized = SourceNormalizer::yellow().normalize(&raw).unwrap();
    assert_eq!(
        column_micros(&normalized, PICKUP_TS),
        vec![Some(micros(2016, 2, 29, 12, 0, 0))]
    );
    let distance = normalized.column(TRIP_DISTANCE).unwrap().f64().unwrap();
    assert_eq!(distance.get(0), Some(4.0));
    let passengers = normalized.column(PASSENGER_COUNT).unwrap().u32().unwrap();
    assert_eq!(passengers.get(0), Some(1));
}

#[test]
fn unparseable_timestamp_is_fatal() {
    let raw = df!(
        "tpep_pickup_datetime" => &["2019-03-04 10:15:00", "not a time"],
        "tpep_dropoff_datetime" => &["2019-03-04 10:45:00", "2019-03-04 11:00:00"],
        "passenger_count" => &[1i64, 1],
        "trip_distance" => &[1.0f64, 1.0],
    )
    .unwrap();

    match SourceNormalizer::yellow().normalize(&raw) {
        Err(NormalizeError::InvalidField {
            column, row_index, ..
        }) => {
            assert_eq!(column, "tpep_pickup_datetime");
            assert_eq!(row_index, 1);
        }
        other => panic!("expected InvalidField, got {other:?}"),
    }
}

#[test]
fn missing_passenger_counts_stay_null() {
    let raw = df!(
        "tpep_pickup_datetime" => &["2021-03-04 10:15:00", "2021-03-04 11:15:00", "2021-03-04 12:15:00"],
        "tpep_dropoff_datetime" => &["2021-03-04 10:45:00", "2021-03-04 11:45:00", "2021-03-04 12:45:00"],
        "passenger_count" => &[Some(1.0f64), None, Some(2.0)],
        "trip_distance" => &[1.0f64, 1.0, 1.0],
    )
    .unwrap();

    let normalized = SourceNormalizer::yellow().normalize(&raw).unwrap();
    assert_eq!(normalized.height(), 3);
    let passengers = normalized.column(PASSENGER_COUNT).unwrap().u32().unwrap();
    assert_eq!(
        passengers.into_iter().collect::<Vec<_>>(),
        vec![Some(1), None, Some(2)]
    );

    let text = df!(
        "tpep_pickup_datetime" => &["2021-03-04 10:15:00", "2021-03-04 11:15:00"],
        "tpep_dropoff_datetime" => &["2021-03-04 10:45:00", "2021-03-04 11:45:00"],
        "passenger_count" => &["", "3"],
        "trip_distance" => &["1.0", "1.0"],
    )
    .unwrap();
    let normalized = SourceNormalizer::yellow().normalize(&text).unwrap();
    let passengers = normalized.column(PASSENGER_COUNT).unwrap().u32().unwrap();
    assert_eq!(passengers.get(0), None);
    assert_eq!(passengers.get(1), Some(3));
}

#[test]
fn null_timestamp_is_still_fatal() {
    let raw = df!(
        "tpep_pickup_datetime" => &[Some("2019-03-04 10:15:00"), None],
        "tpep_dropoff_datetime" => &["2019-03-04 10:45:00", "2019-03-04 11:45:00"],
        "passenger_count" => &[1i64, 1],
        "trip_distance" => &[1.0f64, 1.0],
    )
    .unwrap();

    let err = SourceNormalizer::yellow().normalize(&raw).unwrap_err();
    assert!(matches!(
        err,
        NormalizeError::NullField { row_index: 1, .. }
    ));
}

#[test]
fn utc_zoned_timestamps_keep_their_wall_clock() {
    let pickup = micros(2019, 6, 1, 8, 30, 0);
    let dropoff = micros(2019, 6, 1, 9, 0, 0);
    let zoned = DataType::Datetime(TimeUnit::Microseconds, Some(TimeZone::UTC));
    let raw = DataFrame::new(vec![
        Series::new("tpep_pickup_datetime".into(), vec![pickup])
            .cast(&zoned)
            .unwrap()
            .into(),
        Series::new("tpep_dropoff_datetime".into(), vec![dropoff])
            .cast(&zoned)
            .unwrap()
            .into(),
        Series::new("passenger_count".into(), vec![1i64]).into(),
        Series::new("trip_distance".into(), vec![3.0f64]).into(),
    ])
    .unwrap();

    let normalized = SourceNormalizer::yellow().normalize(&raw).unwrap();
    assert_eq!(
        normalized.column(PICKUP_TS).unwrap().dtype(),
        &DataType::Datetime(TimeUnit::Microseconds, None)
    );
    assert_eq!(column_micros(&normalized, PICKUP_TS), vec![Some(pickup)]);
    assert_eq!(column_micros(&normalized, DROPOFF_TS), vec![Some(dropoff)]);
}

#[test]
fn fractional_or_negative_passenger_counts_are_rejected() {
    let fractional = df!(
        "tpep_pickup_datetime" => &["2019-03-04 10:15:00"],
        "tpep_dropoff_datetime" => &["2019-03-04 10:45:00"],
        "passenger_count" => &[1.5f64],
        "trip_distance" => &[1.0f64],
    )
    .unwrap();
    assert!(matches!(
        SourceNormalizer::yellow().normalize(&fractional),
        Err(NormalizeError::InvalidField { .. })
    ));

    let negative = df!(
        "tpep_pickup_datetime" => &["2019-03-04 10:15:00"],
        "tpep_dropoff_datetime" => &["2019-03-04 10:45:00"],
        "passenger_count" => &[-1i64],
        "trip_distance" => &[1.0f64],
    )
    .unwrap();
    assert!(matches!(
        SourceNormalizer::yellow().normalize(&negative),
        Err(NormalizeError::InvalidField { .. })
    ));
}

#[test]
fn string_numeric_fields_are_coerced() {
    let raw = df!(
        "tpep_pickup_datetime" => &["2021-07-01T09:00:00"],
        "tpep_dropoff_datetime" => &["2021-07-01T09:10:00.500"],
        "passenger_count" => &["2"],
        "trip_distance" => &[" 3.4 "],
    )
    .unwrap();

    let normalized = SourceNormalizer::yellow().normalize(&raw).unwrap();
    assert_eq!(
        column_micros(&normalized, DROPOFF_TS),
        vec![Some(micros(2021, 7, 1, 9, 10, 0) + 500_000)]
    );
    let distance = normalized.column(TRIP_DISTANCE).unwrap().f64().unwrap();
    assert_eq!(distance.get(0), Some(3.4));
}

#[test]
fn missing_distance_column_is_reported_after_format_match() {
    let raw = df!(
        "tpep_pickup_datetime" => &["2019-03-04 10:15:00"],
        "tpep_dropoff_datetime" => &["2019-03-04 10:45:00"],
        "passenger_count" => &[1i64],
    )
    .unwrap();

    match SourceNormalizer::yellow().normalize(&raw) {
        Err(NormalizeError::MissingColumn { column, .. }) => assert_eq!(column, "trip_distance"),
        other => panic!("expected MissingColumn, got {other:?}"),
    }
}

#[test]
fn duplicates_and_reversed_timestamps_pass_through() {
    let raw = df!(
        "tpep_pickup_datetime" => &["2019-03-04 10:15:00", "2019-03-04 10:15:00"],
        "tpep_dropoff_datetime" => &["2019-03-04 10:00:00", "2019-03-04 10:00:00"],
        "passenger_count" => &[1i64, 1],
        "trip_distance" => &[0.0f64, 0.0],
    )
    .unwrap();

    let normalized = SourceNormalizer::yellow().normalize(&raw).unwrap();
    assert_eq!(normalized.height(), 2);
    assert_eq!(
        column_micros(&normalized, DROPOFF_TS),
        vec![
            Some(micros(2019, 3, 4, 10, 0, 0)),
            Some(micros(2019, 3, 4, 10, 0, 0))
        ]
    );
}

#[test]
fn configured_schema_overrides_column_names() {
    let raw = df!(
        "pu_time" => &["2018-12-31 23:50:00"],
        "do_time" => &["2019-01-01 00:10:00"],
        "pax" => &[4i64],
        "miles" => &[6.0f64],
    )
    .unwrap();

    let schema = SourceSchema {
        pickup_column: "pu_time".to_string(),
        dropoff_column: "do_time".to_string(),
        distance_column: "miles".to_string(),
        passenger_count_column: "pax".to_string(),
    };
    let normalizer = SourceNormalizer::new(TaxiType::Green, schema);

    let normalized = normalizer.normalize(&raw).unwrap();
    assert_eq!(normalizer.taxi_type(), TaxiType::Green);
    let passengers = normalized.column(PASSENGER_COUNT).unwrap().u32().unwrap();
    assert_eq!(passengers.get(0), Some(4));
}

#[test]
fn taxi_type_parses_case_insensitively() {
    assert_eq!(TaxiType::try_from(" yellow "), Ok(TaxiType::Yellow));
    assert_eq!(TaxiType::try_from("GREEN"), Ok(TaxiType::Green));
    assert!(TaxiType::try_from("fhv").is_err());
}
