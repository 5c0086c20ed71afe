use std::collections::HashSet;

use polars::prelude::*;
use tracing::debug;

use taxi_emissions_parser::TAXI_TYPE;

use crate::window::TripWindow;

pub const DEFAULT_AUDIT_ROW_CAP: usize = 1000;

/// Bounded look at the enriched output. The window is re-applied over the view rather than
/// trusting the caller to pass an already-filtered frame.
pub fn audit_sample(
    fct_trips_enriched: &DataFrame,
    window: &TripWindow,
    row_cap: usize,
) -> PolarsResult<DataFrame> {
    let windowed = window.apply(fct_trips_enriched)?;
    let sample = windowed.head(Some(row_cap));
    debug!(
        available_rows = windowed.height(),
        sample_rows = sample.height(),
        row_cap,
        "built audit sample"
    );
    Ok(sample)
}

/// Distinct non-null `taxi_type` values.
pub fn category_count(fct_trips: &DataFrame) -> PolarsResult<usize> {
    let categories = fct_trips.column(TAXI_TYPE)?.str()?;
    Ok(categories.into_iter().flatten().collect::<HashSet<_>>().len())
}
