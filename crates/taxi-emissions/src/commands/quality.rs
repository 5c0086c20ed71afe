use anyhow::Result;
use comfy_table::Table;

use taxi_emissions_core::config::PipelineConfig;
use taxi_emissions_core::quality_filters::{apply_quality_filters, quality_report};

use super::build_catalog;

pub fn handle_quality_command(config: &PipelineConfig) -> Result<()> {
    let catalog = build_catalog(config)?;
    let fct_trips = catalog.fct_trips()?;
    let flagged = apply_quality_filters(&fct_trips, &catalog.context().quality_thresholds)?;
    let report = quality_report(&flagged)?;

    let mut table = Table::new();
    table.set_header(vec!["check", "failing rows", "status"]);
    for (rule, count) in &report.counts {
        let status = if *count == 0 { "PASS" } else { "FAIL" };
        table.add_row(vec![rule.to_string(), count.to_string(), status.to_string()]);
    }
    println!("{table}");
    println!(
        "{} of {} trips flagged SUSPECT; checklist {}",
        report.suspect_rows,
        report.rows,
        if report.passed() { "PASSED" } else { "FAILED" }
    );
    Ok(())
}
