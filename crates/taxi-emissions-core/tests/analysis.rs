use chrono::NaiveDate;
use polars::prelude::*;
use taxi_emissions_core::analysis::{
    analyze, day_of_week_label, heavy_light_by, largest_trip_by_type, monthly_totals,
    CalendarFeature,
};
use taxi_emissions_core::emissions::EmissionsLookup;
use taxi_emissions_core::enrichment::enrich_trips;
use taxi_emissions_core::trips::union_trips;
use taxi_emissions_core::window::TripWindow;
use taxi_emissions_parser::{SourceNormalizer, TripNormalizer};

fn normalize(normalizer: SourceNormalizer, rows: &[(&str, &str, f64)]) -> DataFrame {
    let schema = normalizer.schema().clone();
    let raw = DataFrame::new(vec![
        Series::new(
            schema.pickup_column.as_str().into(),
            rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            schema.dropoff_column.as_str().into(),
            rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            schema.passenger_count_column.as_str().into(),
            vec![1i64; rows.len()],
        )
        .into(),
        Series::new(
            schema.distance_column.as_str().into(),
            rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        )
        .into(),
    ])
    .unwrap();
    normalizer.normalize(&raw).unwrap()
}

fn enriched() -> DataFrame {
    let trips = union_trips(&[
        normalize(
            SourceNormalizer::yellow(),
            &[
                ("2019-01-01 00:46:40", "2019-01-01 00:53:20", 1.5),
                ("2019-01-01 08:00:00", "2019-01-01 08:30:00", 10.0),
                ("2019-01-15 12:00:00", "2019-01-15 12:00:00", 0.0),
                ("2019-02-03 17:20:00", "2019-02-03 17:50:00", 6.0),
                // Same emissions as the 08:00 trip but later, so it loses the tie.
                ("2019-03-01 08:00:00", "2019-03-01 09:00:00", 10.0),
            ],
        ),
        normalize(
            SourceNormalizer::green(),
            &[
                ("2019-01-05 09:00:00", "2019-01-05 09:20:00", 4.0),
                ("2019-01-06 22:10:00", "2019-01-06 22:05:00", 2.5),
            ],
        ),
    ])
    .unwrap();
    let lookup = EmissionsLookup::from_entries([("YELLOW", 400.0), ("GREEN", 300.0)]).unwrap();
    enrich_trips(&trips, &lookup).unwrap()
}

#[test]
fn largest_trip_prefers_earliest_pickup_on_ties() {
    let largest = largest_trip_by_type(&enriched(), &TripWindow::standard()).unwrap();
    assert_eq!(largest.len(), 2);

    let green = &largest[0];
    assert_eq!(green.taxi_type, "GREEN");
    assert_eq!(green.trip_co2_kgs, 1.2);
    assert!((green.avg_mph - 12.0).abs() < 1e-9);

    let yellow = &largest[1];
    assert_eq!(yellow.taxi_type, "YELLOW");
    assert_eq!(yellow.trip_co2_kgs, 4.0);
    assert_eq!(
        yellow.pickup_ts,
        NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    );
    assert_eq!(yellow.avg_mph, 20.0);
}

#[test]
fn heavy_and_light_months() {
    let results =
        heavy_light_by(&enriched(), &TripWindow::standard(), CalendarFeature::MonthOfYear)
            .unwrap();
    let yellow = results.iter().find(|r| r.taxi_type == "YELLOW").unwrap();
    // Jan averages (0.6 + 4.0 + 0.0) / 3, Feb 2.4, Mar 4.0.
    assert_eq!(yellow.heavy_bucket, 3);
    assert_eq!(yellow.light_bucket, 1);

    let green = results.iter().find(|r| r.taxi_type == "GREEN").unwrap();
    assert_eq!(green.heavy_bucket, 1);
    assert_eq!(green.light_bucket, 1);
    assert!((green.heavy_avg_co2_kgs - 0.975).abs() < 1e-12);
}

#[test]
fn tied_buckets_resolve_to_the_largest_value() {
    let trips = normalize(
        SourceNormalizer::yellow(),
        &[
            ("2019-01-01 03:00:00", "2019-01-01 03:10:00", 2.0),
            ("2019-01-01 05:00:00", "2019-01-01 05:10:00", 2.0),
            ("2019-01-01 09:00:00", "2019-01-01 09:10:00", 2.0),
        ],
    );
    let lookup = EmissionsLookup::from_entries([("YELLOW", 400.0)]).unwrap();
    let enriched = enrich_trips(&trips, &lookup).unwrap();

    let results =
        heavy_light_by(&enriched, &TripWindow::standard(), CalendarFeature::HourOfDay).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].heavy_bucket, 9);
    assert_eq!(results[0].light_bucket, 9);
}

#[test]
fn monthly_totals_are_ordered_by_month_then_category() {
    let totals = monthly_totals(&enriched(), &TripWindow::standard()).unwrap();
    let keys: Vec<(i32, u32, &str)> = totals
        .iter()
        .map(|t| (t.year, t.month, t.taxi_type.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![
            (2019, 1, "GREEN"),
            (2019, 1, "YELLOW"),
            (2019, 2, "YELLOW"),
            (2019, 3, "YELLOW"),
        ]
    );
    assert!((totals[0].total_co2_kgs - 1.95).abs() < 1e-12);
    assert!((totals[1].total_co2_kgs - 4.6).abs() < 1e-12);
    assert_eq!(totals[2].total_co2_kgs, 2.4);
}

#[test]
fn analysis_honours_the_window() {
    let narrow = TripWindow::from_dates(
        NaiveDate::from_ymd_opt(2019, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2019, 3, 1).unwrap(),
    )
    .unwrap();
    let report = analyze(&enriched(), &narrow).unwrap();
    assert_eq!(report.largest_trips.len(), 1);
    assert_eq!(report.monthly_totals.len(), 1);
    assert_eq!(report.heavy_light.len(), CalendarFeature::ALL.len());
}

#[test]
fn day_labels_start_on_sunday() {
    assert_eq!(day_of_week_label(0), "Sun");
    assert_eq!(day_of_week_label(6), "Sat");
    assert_eq!(day_of_week_label(7), "Sun");
    assert_eq!(CalendarFeature::DayOfWeek.label(3), "Wed");
    assert_eq!(CalendarFeature::HourOfDay.label(3), "3");
}
