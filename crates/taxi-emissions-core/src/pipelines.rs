use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use taxi_emissions_parser::TAXI_TYPE;

use crate::audit::{self, DEFAULT_AUDIT_ROW_CAP};
use crate::emissions::EmissionsLookup;
use crate::enrichment;
use crate::error::{PipelineError, Result};
use crate::fingerprint::frame_fingerprint;
use crate::quality_filters::QualityThresholds;
use crate::trips::{self, RawTripSource};
use crate::window::{format_micros, TripWindow};

/// Everything a pipeline run needs besides the raw frames. The emissions lookup is passed in
/// here rather than read from global state so tests can substitute fixtures.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub window: TripWindow,
    pub emissions: EmissionsLookup,
    pub audit_row_cap: usize,
    pub quality_thresholds: QualityThresholds,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            window: TripWindow::standard(),
            emissions: EmissionsLookup::default(),
            audit_row_cap: DEFAULT_AUDIT_ROW_CAP,
            quality_thresholds: QualityThresholds::default(),
        }
    }
}

impl ExecutionContext {
    pub fn new(emissions: EmissionsLookup) -> Self {
        Self {
            emissions,
            ..Self::default()
        }
    }

    pub fn with_window(mut self, window: TripWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_audit_row_cap(mut self, row_cap: usize) -> Self {
        self.audit_row_cap = row_cap;
        self
    }

    pub fn with_quality_thresholds(mut self, thresholds: QualityThresholds) -> Self {
        self.quality_thresholds = thresholds;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub pipeline: &'static str,
    pub pipeline_version: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub window_start: String,
    pub window_end: String,
    pub raw_rows: BTreeMap<String, usize>,
    pub fct_trips_rows: usize,
    pub fct_trips_enriched_rows: usize,
    pub join_excluded_rows: usize,
    pub unmatched_categories: Vec<String>,
    pub category_count: usize,
    pub audit_rows: usize,
    pub fct_trips_fingerprint: String,
    pub fct_trips_enriched_fingerprint: String,
}

pub struct PipelineBatchOutput {
    pub fct_trips: DataFrame,
    pub fct_trips_enriched: DataFrame,
    pub audit_sample: DataFrame,
    pub summary: RunSummary,
}

pub trait TripPipeline: Send + Sync {
    fn code_identifier(&self) -> &'static str;
    fn version(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn run_batch(
        &self,
        context: &ExecutionContext,
        sources: &[RawTripSource],
    ) -> Result<PipelineBatchOutput>;
}

static PIPELINE_IMPLEMENTATIONS: Lazy<Vec<&'static dyn TripPipeline>> =
    Lazy::new(|| vec![&TripEmissionsV1 as &dyn TripPipeline]);

pub fn all_pipelines() -> &'static [&'static dyn TripPipeline] {
    PIPELINE_IMPLEMENTATIONS.as_slice()
}

pub fn find_pipeline(code: &str) -> Result<&'static dyn TripPipeline> {
    all_pipelines()
        .iter()
        .copied()
        .find(|pipeline| pipeline.code_identifier() == code)
        .ok_or_else(|| PipelineError::UnknownPipeline(code.to_string()))
}

pub const DEFAULT_PIPELINE: &str = "trip_emissions_v1";

struct TripEmissionsV1;

impl TripPipeline for TripEmissionsV1 {
    fn code_identifier(&self) -> &'static str {
        DEFAULT_PIPELINE
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }

    fn description(&self) -> &'static str {
        "Normalize yellow/green trips + window filter + emissions enrichment"
    }

    fn run_batch(
        &self,
        context: &ExecutionContext,
        sources: &[RawTripSource],
    ) -> Result<PipelineBatchOutput> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, pipeline = self.code_identifier(), "starting pipeline run");

        if context.emissions.is_empty() {
            warn!("emissions lookup is empty; every trip will be excluded by the join");
        }

        let mut raw_rows = BTreeMap::new();
        for source in sources {
            *raw_rows.entry(source.taxi_type().to_string()).or_insert(0) += source.raw_rows();
        }

        let fct_trips = trips::build_fct_trips(sources, &context.window)?;
        let fct_trips_enriched =
            enrichment::build_fct_trips_enriched(&fct_trips, &context.window, &context.emissions)?;
        let audit_sample =
            audit::audit_sample(&fct_trips_enriched, &context.window, context.audit_row_cap)?;
        let category_count = audit::category_count(&fct_trips)?;
        let unmatched_categories = unmatched_categories(&fct_trips, &context.emissions)?;

        if !unmatched_categories.is_empty() {
            warn!(
                categories = ?unmatched_categories,
                "trip categories without an emissions factor were excluded"
            );
        }

        let summary = RunSummary {
            run_id,
            pipeline: self.code_identifier(),
            pipeline_version: self.version(),
            started_at,
            finished_at: Utc::now(),
            window_start: format_micros(context.window.start_micros()),
            window_end: format_micros(context.window.end_micros()),
            raw_rows,
            fct_trips_rows: fct_trips.height(),
            fct_trips_enriched_rows: fct_trips_enriched.height(),
            join_excluded_rows: fct_trips.height() - fct_trips_enriched.height(),
            unmatched_categories,
            category_count,
            audit_rows: audit_sample.height(),
            fct_trips_fingerprint: frame_fingerprint(&fct_trips)?,
            fct_trips_enriched_fingerprint: frame_fingerprint(&fct_trips_enriched)?,
        };

        info!(
            %run_id,
            fct_trips_rows = summary.fct_trips_rows,
            fct_trips_enriched_rows = summary.fct_trips_enriched_rows,
            "pipeline run finished"
        );

        Ok(PipelineBatchOutput {
            fct_trips,
            fct_trips_enriched,
            audit_sample,
            summary,
        })
    }
}

/// Categories present in `fct_trips` that the lookup has no factor for.
pub fn unmatched_categories(
    fct_trips: &DataFrame,
    lookup: &EmissionsLookup,
) -> Result<Vec<String>> {
    let categories = fct_trips
        .column(TAXI_TYPE)?
        .str()?
        .into_iter()
        .flatten()
        .filter(|category| lookup.factor_for(category).is_none())
        .map(str::to_string)
        .collect::<BTreeSet<_>>();
    Ok(categories.into_iter().collect())
}
