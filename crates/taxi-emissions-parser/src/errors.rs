use std::fmt;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct NormalizerAttempt {
    pub normalizer: &'static str,
    pub message: String,
}

impl NormalizerAttempt {
    pub fn new(normalizer: &'static str, message: impl Into<String>) -> Self {
        Self {
            normalizer,
            message: message.into(),
        }
    }
}

impl fmt::Display for NormalizerAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.normalizer, self.message)
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("{normalizer} format mismatch: {reason}")]
    FormatMismatch {
        normalizer: &'static str,
        reason: String,
    },

    #[error("{normalizer} missing required column '{column}'")]
    MissingColumn {
        normalizer: &'static str,
        column: String,
    },

    #[error("{normalizer} column '{column}' has unsupported type {dtype}")]
    UnsupportedType {
        normalizer: &'static str,
        column: String,
        dtype: String,
    },

    #[error("{normalizer} row {row_index} column '{column}' is null")]
    NullField {
        normalizer: &'static str,
        column: String,
        row_index: usize,
    },

    #[error("{normalizer} row {row_index} column '{column}' invalid: {message}")]
    InvalidField {
        normalizer: &'static str,
        column: String,
        row_index: usize,
        message: String,
    },

    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("no normalizer recognized this frame; attempts: {attempts:?}")]
    NoMatchingNormalizer { attempts: Vec<NormalizerAttempt> },
}
