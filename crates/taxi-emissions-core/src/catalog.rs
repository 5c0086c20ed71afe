use std::fmt;

use once_cell::sync::OnceCell;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audit;
use crate::enrichment;
use crate::error::{PipelineError, Result};
use crate::pipelines::ExecutionContext;
use crate::trips::{self, RawTripSource};

pub const FCT_TRIPS: &str = "fct_trips";
pub const FCT_TRIPS_ENRICHED: &str = "fct_trips_enriched";
pub const OUTPUT_NAMES: [&str; 2] = [FCT_TRIPS, FCT_TRIPS_ENRICHED];

/// How a named output is served. A `View` is recomputed from its inputs on every read; a
/// `Table` is computed on first read and served from cache until invalidated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Materialization {
    #[default]
    View,
    Table,
}

impl fmt::Display for Materialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Materialization::View => f.write_str("view"),
            Materialization::Table => f.write_str("table"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationPolicies {
    pub fct_trips: Materialization,
    pub fct_trips_enriched: Materialization,
}

impl Default for MaterializationPolicies {
    fn default() -> Self {
        Self {
            fct_trips: Materialization::View,
            fct_trips_enriched: Materialization::Table,
        }
    }
}

impl MaterializationPolicies {
    pub fn for_output(&self, name: &str) -> Option<Materialization> {
        match name {
            FCT_TRIPS => Some(self.fct_trips),
            FCT_TRIPS_ENRICHED => Some(self.fct_trips_enriched),
            _ => None,
        }
    }
}

/// Named, read-only query surface over one set of raw sources. Regeneration is whole-set
/// replacement through [`OutputCatalog::replace_sources`].
pub struct OutputCatalog {
    sources: Vec<RawTripSource>,
    context: ExecutionContext,
    policies: MaterializationPolicies,
    fct_trips_table: OnceCell<DataFrame>,
    fct_trips_enriched_table: OnceCell<DataFrame>,
}

impl OutputCatalog {
    pub fn new(
        sources: Vec<RawTripSource>,
        context: ExecutionContext,
        policies: MaterializationPolicies,
    ) -> Self {
        Self {
            sources,
            context,
            policies,
            fct_trips_table: OnceCell::new(),
            fct_trips_enriched_table: OnceCell::new(),
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn policies(&self) -> MaterializationPolicies {
        self.policies
    }

    pub fn fct_trips(&self) -> Result<DataFrame> {
        serve(
            FCT_TRIPS,
            self.policies.fct_trips,
            &self.fct_trips_table,
            || trips::build_fct_trips(&self.sources, &self.context.window),
        )
    }

    /// Always reads `fct_trips` through the catalog and re-applies the window over it, so a
    /// stale or hand-built upstream never leaks out-of-window rows.
    pub fn fct_trips_enriched(&self) -> Result<DataFrame> {
        serve(
            FCT_TRIPS_ENRICHED,
            self.policies.fct_trips_enriched,
            &self.fct_trips_enriched_table,
            || {
                let fct_trips = self.fct_trips()?;
                Ok(enrichment::build_fct_trips_enriched(
                    &fct_trips,
                    &self.context.window,
                    &self.context.emissions,
                )?)
            },
        )
    }

    pub fn audit_sample(&self) -> Result<DataFrame> {
        let enriched = self.fct_trips_enriched()?;
        Ok(audit::audit_sample(
            &enriched,
            &self.context.window,
            self.context.audit_row_cap,
        )?)
    }

    pub fn category_count(&self) -> Result<usize> {
        Ok(audit::category_count(&self.fct_trips()?)?)
    }

    pub fn read(&self, name: &str) -> Result<DataFrame> {
        match name {
            FCT_TRIPS => self.fct_trips(),
            FCT_TRIPS_ENRICHED => self.fct_trips_enriched(),
            other => Err(PipelineError::UnknownOutput(other.to_string())),
        }
    }

    pub fn is_materialized(&self, name: &str) -> bool {
        match name {
            FCT_TRIPS => self.fct_trips_table.get().is_some(),
            FCT_TRIPS_ENRICHED => self.fct_trips_enriched_table.get().is_some(),
            _ => false,
        }
    }

    /// Drops every cached table; the next read recomputes.
    pub fn invalidate(&mut self) {
        self.fct_trips_table = OnceCell::new();
        self.fct_trips_enriched_table = OnceCell::new();
        debug!("invalidated materialized outputs");
    }

    pub fn replace_sources(&mut self, sources: Vec<RawTripSource>) {
        self.sources = sources;
        self.invalidate();
    }

    pub fn replace_context(&mut self, context: ExecutionContext) {
        self.context = context;
        self.invalidate();
    }
}

fn serve<F>(
    name: &str,
    policy: Materialization,
    table: &OnceCell<DataFrame>,
    compute: F,
) -> Result<DataFrame>
where
    F: FnOnce() -> Result<DataFrame>,
{
    match policy {
        Materialization::View => {
            debug!(output = name, "computing view");
            compute()
        }
        Materialization::Table => {
            let frame = table.get_or_try_init(|| {
                let frame = compute()?;
                info!(output = name, rows = frame.height(), "materialized table");
                Ok::<_, PipelineError>(frame)
            })?;
            Ok(frame.clone())
        }
    }
}
