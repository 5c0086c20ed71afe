pub mod analysis;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod emissions;
pub mod enrichment;
pub mod error;
pub mod fingerprint;
pub mod pipelines;
pub mod plot;
pub mod quality_filters;
pub mod store;
pub mod trips;
pub mod window;

pub use catalog::{Materialization, MaterializationPolicies, OutputCatalog};
pub use emissions::EmissionsLookup;
pub use error::{PipelineError, Result};
pub use pipelines::{ExecutionContext, PipelineBatchOutput, RunSummary, TripPipeline};
pub use trips::RawTripSource;
pub use window::TripWindow;
