mod common;
pub mod schema;
mod source;

pub use source::SourceNormalizer;

pub(crate) use common::{
    build_canonical_frame, coerce_distances, coerce_passenger_counts, coerce_timestamps,
    find_column,
};
