use polars::prelude::*;
use tracing::{debug, info};

use taxi_emissions_parser::{
    empty_canonical_frame, NormalizeError, SourceNormalizer, TaxiType, TripNormalizer,
    CANONICAL_COLUMNS,
};

use crate::error::Result;
use crate::window::TripWindow;

/// Raw frames for one vehicle category together with the normalizer that understands them.
/// A category usually arrives as many monthly files, hence the frame list.
#[derive(Debug, Clone)]
pub struct RawTripSource {
    pub normalizer: SourceNormalizer,
    pub frames: Vec<DataFrame>,
}

impl RawTripSource {
    pub fn new(normalizer: SourceNormalizer, frames: Vec<DataFrame>) -> Self {
        Self { normalizer, frames }
    }

    pub fn single(normalizer: SourceNormalizer, frame: DataFrame) -> Self {
        Self::new(normalizer, vec![frame])
    }

    pub fn taxi_type(&self) -> TaxiType {
        self.normalizer.taxi_type()
    }

    pub fn raw_rows(&self) -> usize {
        self.frames.iter().map(DataFrame::height).sum()
    }
}

/// Normalizes every frame of a source and stacks the results.
pub fn normalize_source(source: &RawTripSource) -> std::result::Result<DataFrame, NormalizeError> {
    let mut normalized = Vec::with_capacity(source.frames.len());
    for (file_index, frame) in source.frames.iter().enumerate() {
        let canonical = source.normalizer.normalize(frame)?;
        debug!(
            normalizer = source.normalizer.name(),
            file_index,
            rows = canonical.height(),
            "normalized raw frame"
        );
        normalized.push(canonical);
    }
    Ok(union_trips(&normalized)?)
}

/// Bag union of canonical frames. Duplicates are kept; an empty input yields the empty
/// canonical frame so downstream stages always see the full schema.
pub fn union_trips(frames: &[DataFrame]) -> PolarsResult<DataFrame> {
    let mut iter = frames.iter();
    let Some(first) = iter.next() else {
        return empty_canonical_frame();
    };

    let mut combined = first.select(CANONICAL_COLUMNS)?;
    for frame in iter {
        combined.vstack_mut(&frame.select(CANONICAL_COLUMNS)?)?;
    }
    Ok(combined)
}

/// Builds `fct_trips`: every source normalized, unioned, then restricted to the window.
pub fn build_fct_trips(sources: &[RawTripSource], window: &TripWindow) -> Result<DataFrame> {
    let mut normalized = Vec::with_capacity(sources.len());
    for source in sources {
        let canonical = normalize_source(source)?;
        info!(
            taxi_type = %source.taxi_type(),
            files = source.frames.len(),
            rows = canonical.height(),
            "normalized trip source"
        );
        normalized.push(canonical);
    }

    let unioned = union_trips(&normalized)?;
    let filtered = window.apply(&unioned)?;
    info!(
        window = %window,
        unioned_rows = unioned.height(),
        kept_rows = filtered.height(),
        excluded_rows = unioned.height() - filtered.height(),
        "built fct_trips"
    );
    Ok(filtered)
}
