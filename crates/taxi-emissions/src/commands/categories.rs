use anyhow::Result;

use taxi_emissions_core::config::PipelineConfig;

use super::build_catalog;

pub fn handle_categories_command(config: &PipelineConfig) -> Result<()> {
    let catalog = build_catalog(config)?;
    println!("{}", catalog.category_count()?);
    Ok(())
}
