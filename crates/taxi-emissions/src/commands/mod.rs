pub mod analyze;
pub mod categories;
pub mod quality;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use taxi_emissions_core::config::{EmissionsFormat, PipelineConfig};
use taxi_emissions_core::store::{load_frame, load_source_frames};
use taxi_emissions_core::{EmissionsLookup, ExecutionContext, OutputCatalog, RawTripSource};

pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let config = PipelineConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            info!(path = %path.display(), "loaded pipeline config");
            Ok(config)
        }
        None => {
            info!("no config given, using built-in defaults");
            Ok(PipelineConfig::default())
        }
    }
}

pub fn load_sources(config: &PipelineConfig) -> Result<Vec<RawTripSource>> {
    config
        .sources
        .iter()
        .map(|source| {
            let frames = load_source_frames(&source.path, &source.schema())
                .with_context(|| format!("failed to load {} trips from {}", source.taxi_type, source.path))?;
            Ok(RawTripSource::new(source.normalizer(), frames))
        })
        .collect()
}

pub fn load_context(config: &PipelineConfig) -> Result<ExecutionContext> {
    let emissions_path = &config.emissions.path;
    let table = load_frame(emissions_path)
        .with_context(|| format!("failed to load emissions table {}", emissions_path.display()))?;
    let lookup = match config.emissions.format {
        EmissionsFormat::Reference => EmissionsLookup::from_reference(&table),
        EmissionsFormat::VehicleEmissions => EmissionsLookup::from_vehicle_emissions(&table),
    }
    .context("failed to build emissions lookup")?;

    info!(
        categories = ?lookup.categories().collect::<Vec<_>>(),
        "loaded emissions lookup"
    );

    Ok(ExecutionContext::new(lookup)
        .with_window(config.trip_window()?)
        .with_audit_row_cap(config.audit.row_cap)
        .with_quality_thresholds(config.quality))
}

pub fn build_catalog(config: &PipelineConfig) -> Result<OutputCatalog> {
    Ok(OutputCatalog::new(
        load_sources(config)?,
        load_context(config)?,
        config.policies(),
    ))
}
