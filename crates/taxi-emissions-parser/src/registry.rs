use polars::prelude::DataFrame;

use crate::errors::{NormalizeError, NormalizerAttempt};
use crate::formats::SourceNormalizer;
use crate::model::TaxiType;

pub trait TripNormalizer {
    fn name(&self) -> &'static str;
    fn taxi_type(&self) -> TaxiType;
    fn normalize(&self, raw: &DataFrame) -> Result<DataFrame, NormalizeError>;
}

/// Normalizes a frame of unknown shape using the built-in yellow and green schemas.
pub fn normalize_trip_frame(raw: &DataFrame) -> Result<DataFrame, NormalizeError> {
    let yellow = SourceNormalizer::yellow();
    let green = SourceNormalizer::green();
    let normalizers: [&dyn TripNormalizer; 2] = [&yellow, &green];
    normalize_with_normalizers(raw, &normalizers)
}

pub fn normalize_with_normalizers(
    raw: &DataFrame,
    normalizers: &[&dyn TripNormalizer],
) -> Result<DataFrame, NormalizeError> {
    let mut attempts = Vec::new();

    for normalizer in normalizers {
        match normalizer.normalize(raw) {
            Ok(normalized) => return Ok(normalized),
            Err(NormalizeError::FormatMismatch { reason, .. }) => {
                attempts.push(NormalizerAttempt::new(normalizer.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(NormalizeError::NoMatchingNormalizer { attempts })
}
