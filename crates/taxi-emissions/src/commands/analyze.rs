use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Table;

use taxi_emissions_core::analysis::analyze;
use taxi_emissions_core::config::PipelineConfig;
use taxi_emissions_core::plot::{render_monthly_totals, DEFAULT_PLOT_PATH};

use super::build_catalog;

#[derive(Args, Debug, Default)]
pub struct AnalyzeArgs {
    /// Also draw the monthly CO2 totals per taxi type as an SVG line chart
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_PLOT_PATH)]
    plot: Option<PathBuf>,
}

pub fn handle_analyze_command(config: &PipelineConfig, args: AnalyzeArgs) -> Result<()> {
    let catalog = build_catalog(config)?;
    let enriched = catalog.fct_trips_enriched()?;
    let report = analyze(&enriched, &catalog.context().window)?;

    let mut largest = Table::new();
    largest.set_header(vec!["taxi_type", "pickup", "miles", "avg_mph", "co2_kg"]);
    for trip in &report.largest_trips {
        largest.add_row(vec![
            trip.taxi_type.clone(),
            trip.pickup_ts.to_string(),
            format!("{:.2}", trip.trip_distance),
            format!("{:.2}", trip.avg_mph),
            format!("{:.3}", trip.trip_co2_kgs),
        ]);
    }
    println!("Largest CO2 trip per taxi type");
    println!("{largest}");

    let mut heavy_light = Table::new();
    heavy_light.set_header(vec![
        "taxi_type",
        "feature",
        "heavy",
        "heavy avg co2_kg",
        "light",
        "light avg co2_kg",
    ]);
    for row in &report.heavy_light {
        heavy_light.add_row(vec![
            row.taxi_type.clone(),
            row.feature.column().to_string(),
            row.feature.label(row.heavy_bucket),
            format!("{:.4}", row.heavy_avg_co2_kgs),
            row.feature.label(row.light_bucket),
            format!("{:.4}", row.light_avg_co2_kgs),
        ]);
    }
    println!("Heavy / light calendar buckets by mean trip CO2");
    println!("{heavy_light}");

    let mut monthly = Table::new();
    monthly.set_header(vec!["month", "taxi_type", "total co2_kg"]);
    for total in &report.monthly_totals {
        monthly.add_row(vec![
            format!("{}-{:02}", total.year, total.month),
            total.taxi_type.clone(),
            format!("{:.3}", total.total_co2_kgs),
        ]);
    }
    println!("Monthly CO2 totals");
    println!("{monthly}");

    if let Some(path) = args.plot {
        if report.monthly_totals.is_empty() {
            println!("No monthly totals to plot");
        } else {
            render_monthly_totals(&report.monthly_totals, &path)
                .with_context(|| format!("failed to plot {}", path.display()))?;
            println!("Saved plot to {}", path.display());
        }
    }
    Ok(())
}
