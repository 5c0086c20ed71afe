use thiserror::Error;

use taxi_emissions_parser::NormalizeError;

use crate::analysis::AnalysisError;
use crate::config::ConfigError;
use crate::emissions::EmissionsError;
use crate::enrichment::EnrichmentError;
use crate::plot::PlotError;
use crate::store::StoreError;
use crate::window::WindowError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Emissions(#[from] EmissionsError),

    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plot(#[from] PlotError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("unknown output '{0}'")]
    UnknownOutput(String),

    #[error("unknown pipeline '{0}'")]
    UnknownPipeline(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
