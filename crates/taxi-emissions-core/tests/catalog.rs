use polars::prelude::*;
use taxi_emissions_core::catalog::{
    Materialization, MaterializationPolicies, OutputCatalog, FCT_TRIPS, FCT_TRIPS_ENRICHED,
};
use taxi_emissions_core::emissions::EmissionsLookup;
use taxi_emissions_core::error::PipelineError;
use taxi_emissions_core::pipelines::ExecutionContext;
use taxi_emissions_core::trips::RawTripSource;
use taxi_emissions_parser::SourceNormalizer;

fn yellow_raw(rows: usize) -> DataFrame {
    df!(
        "tpep_pickup_datetime" => vec!["2019-01-01 08:00:00"; rows],
        "tpep_dropoff_datetime" => vec!["2019-01-01 08:30:00"; rows],
        "passenger_count" => vec![1i64; rows],
        "trip_distance" => vec![10.0f64; rows],
    )
    .unwrap()
}

fn green_raw() -> DataFrame {
    df!(
        "lpep_pickup_datetime" => &["2019-01-05 09:00:00", "2011-01-05 09:00:00"],
        "lpep_dropoff_datetime" => &["2019-01-05 09:20:00", "2011-01-05 09:20:00"],
        "passenger_count" => &[1i64, 1],
        "trip_distance" => &[4.0f64, 4.0],
    )
    .unwrap()
}

fn catalog(policies: MaterializationPolicies) -> OutputCatalog {
    let lookup = EmissionsLookup::from_entries([("YELLOW", 400.0)]).unwrap();
    OutputCatalog::new(
        vec![
            RawTripSource::single(SourceNormalizer::yellow(), yellow_raw(2)),
            RawTripSource::single(SourceNormalizer::green(), green_raw()),
        ],
        ExecutionContext::new(lookup).with_audit_row_cap(1),
        policies,
    )
}

#[test]
fn default_policies() {
    let policies = MaterializationPolicies::default();
    assert_eq!(policies.for_output(FCT_TRIPS), Some(Materialization::View));
    assert_eq!(
        policies.for_output(FCT_TRIPS_ENRICHED),
        Some(Materialization::Table)
    );
    assert_eq!(policies.for_output("dim_vehicle"), None);
}

#[test]
fn views_are_never_cached() {
    let catalog = catalog(MaterializationPolicies {
        fct_trips: Materialization::View,
        fct_trips_enriched: Materialization::View,
    });

    let first = catalog.fct_trips().unwrap();
    let second = catalog.fct_trips().unwrap();
    assert_eq!(first.height(), 3);
    assert!(first.equals(&second));
    assert!(!catalog.is_materialized(FCT_TRIPS));
    assert!(!catalog.is_materialized(FCT_TRIPS_ENRICHED));
}

#[test]
fn tables_are_cached_until_invalidated() {
    let mut catalog = catalog(MaterializationPolicies::default());

    let enriched = catalog.fct_trips_enriched().unwrap();
    assert_eq!(enriched.height(), 2);
    assert!(catalog.is_materialized(FCT_TRIPS_ENRICHED));
    assert!(!catalog.is_materialized(FCT_TRIPS));

    catalog.invalidate();
    assert!(!catalog.is_materialized(FCT_TRIPS_ENRICHED));
}

#[test]
fn replacing_sources_regenerates_every_output() {
    let mut catalog = catalog(MaterializationPolicies {
        fct_trips: Materialization::Table,
        fct_trips_enriched: Materialization::Table,
    });
    assert_eq!(catalog.fct_trips_enriched().unwrap().height(), 2);
    assert!(catalog.is_materialized(FCT_TRIPS));

    catalog.replace_sources(vec![RawTripSource::single(
        SourceNormalizer::yellow(),
        yellow_raw(5),
    )]);
    assert!(!catalog.is_materialized(FCT_TRIPS));
    assert_eq!(catalog.fct_trips().unwrap().height(), 5);
    assert_eq!(catalog.fct_trips_enriched().unwrap().height(), 5);
}

#[test]
fn audit_and_category_count() {
    let catalog = catalog(MaterializationPolicies::default());
    assert_eq!(catalog.audit_sample().unwrap().height(), 1);
    assert_eq!(catalog.category_count().unwrap(), 2);
}

#[test]
fn outputs_are_readable_by_name() {
    let catalog = catalog(MaterializationPolicies::default());
    assert_eq!(catalog.read(FCT_TRIPS).unwrap().height(), 3);
    assert_eq!(catalog.read(FCT_TRIPS_ENRICHED).unwrap().height(), 2);
    assert!(matches!(
        catalog.read("fct_fares"),
        Err(PipelineError::UnknownOutput(name)) if name == "fct_fares"
    ));
}
