use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Table;
use tracing::info;

use taxi_emissions_core::catalog::{Materialization, FCT_TRIPS, FCT_TRIPS_ENRICHED};
use taxi_emissions_core::config::PipelineConfig;
use taxi_emissions_core::pipelines::{find_pipeline, DEFAULT_PIPELINE};
use taxi_emissions_core::store::{write_json, write_parquet};

use super::{load_context, load_sources};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Write outputs here instead of the configured directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Registered pipeline to run
    #[arg(long, default_value = DEFAULT_PIPELINE)]
    pipeline: String,

    /// Also write the row-capped audit sample
    #[arg(long)]
    audit: bool,
}

pub fn handle_run_command(config: &PipelineConfig, args: RunArgs) -> Result<()> {
    let pipeline = find_pipeline(&args.pipeline)?;
    let context = load_context(config)?;
    let sources = load_sources(config)?;

    let output = pipeline.run_batch(&context, &sources)?;
    let directory = args
        .output_dir
        .unwrap_or_else(|| config.outputs.directory.clone());
    let policies = config.policies();

    for (name, frame) in [
        (FCT_TRIPS, &output.fct_trips),
        (FCT_TRIPS_ENRICHED, &output.fct_trips_enriched),
    ] {
        match policies.for_output(name) {
            Some(Materialization::Table) => {
                let path = directory.join(format!("{name}.parquet"));
                write_parquet(frame, &path)
                    .with_context(|| format!("failed to write {name}"))?;
            }
            _ => info!(output = name, "view output is recomputed on read; nothing written"),
        }
    }

    if args.audit {
        write_parquet(&output.audit_sample, &directory.join("audit_sample.parquet"))
            .context("failed to write audit sample")?;
    }

    let summary_path = directory.join("run_summary.json");
    write_json(&output.summary, &summary_path).context("failed to write run summary")?;

    let summary = &output.summary;
    let mut table = Table::new();
    table.set_header(vec!["metric", "value"]);
    table.add_row(vec!["run id".to_string(), summary.run_id.to_string()]);
    table.add_row(vec![
        "pipeline".to_string(),
        format!("{} {}", summary.pipeline, summary.pipeline_version),
    ]);
    table.add_row(vec![
        "window".to_string(),
        format!("[{}, {})", summary.window_start, summary.window_end),
    ]);
    for (taxi_type, rows) in &summary.raw_rows {
        table.add_row(vec![format!("raw rows ({taxi_type})"), rows.to_string()]);
    }
    table.add_row(vec![
        "fct_trips rows".to_string(),
        summary.fct_trips_rows.to_string(),
    ]);
    table.add_row(vec![
        "fct_trips_enriched rows".to_string(),
        summary.fct_trips_enriched_rows.to_string(),
    ]);
    table.add_row(vec![
        "excluded by emissions join".to_string(),
        summary.join_excluded_rows.to_string(),
    ]);
    table.add_row(vec![
        "distinct categories".to_string(),
        summary.category_count.to_string(),
    ]);
    table.add_row(vec![
        "fct_trips_enriched fingerprint".to_string(),
        summary.fct_trips_enriched_fingerprint.clone(),
    ]);
    println!("{table}");
    println!("Run summary written to {}", summary_path.display());

    Ok(())
}
