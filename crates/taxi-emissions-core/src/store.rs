use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use taxi_emissions_parser::SourceSchema;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid source pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
    #[error("no files match '{0}'")]
    NoFilesMatched(String),
    #[error("unsupported file type for {0} (expected .csv or .parquet)")]
    UnsupportedExtension(PathBuf),
    #[error("failed to read or write {path}: {source}")]
    Polars {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Csv,
    Parquet,
}

fn file_kind(path: &Path) -> Result<FileKind, StoreError> {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("csv") => Ok(FileKind::Csv),
        Some("parquet") | Some("pq") => Ok(FileKind::Parquet),
        _ => Err(StoreError::UnsupportedExtension(path.to_path_buf())),
    }
}

/// Reads a single CSV or Parquet file. CSV columns are all read as strings, with no dtype
/// inference; the normalizers coerce them row by row.
pub fn load_frame(path: &Path) -> Result<DataFrame, StoreError> {
    let kind = file_kind(path)?;
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let polars_err = |source: PolarsError| StoreError::Polars {
        path: path.to_path_buf(),
        source,
    };
    let df = match kind {
        FileKind::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(polars_err)?,
        FileKind::Parquet => ParquetReader::new(file).finish().map_err(polars_err)?,
    };

    debug!(path = %path.display(), rows = df.height(), columns = df.width(), "loaded frame");
    Ok(df)
}

/// Expands a glob into matching file paths in sorted order.
pub fn matching_paths(pattern: &str) -> Result<Vec<PathBuf>, StoreError> {
    let entries = glob::glob(pattern).map_err(|source| StoreError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(StoreError::NoFilesMatched(pattern.to_string()));
    }
    Ok(paths)
}

/// Loads every file matching `pattern`, keeping only the columns `schema` names (matched
/// case-insensitively). Columns the schema does not need may be absent from any file.
pub fn load_source_frames(
    pattern: &str,
    schema: &SourceSchema,
) -> Result<Vec<DataFrame>, StoreError> {
    let paths = matching_paths(pattern)?;
    let wanted = schema.columns();

    let mut frames = Vec::with_capacity(paths.len());
    for path in &paths {
        let raw = load_frame(path)?;
        let keep: Vec<PlSmallStr> = raw
            .get_column_names()
            .into_iter()
            .filter(|name| wanted.iter().any(|w| w.eq_ignore_ascii_case(name.as_str())))
            .cloned()
            .collect();
        let projected = raw.select(keep).map_err(|source| StoreError::Polars {
            path: path.clone(),
            source,
        })?;
        frames.push(projected);
    }

    info!(pattern, files = frames.len(), "loaded trip source files");
    Ok(frames)
}

/// Writes a frame as Zstd-compressed Parquet, creating parent directories as needed.
pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let mut file = File::create(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut clone = df.clone();
    ParquetWriter::new(&mut file)
        .with_compression(ParquetCompression::Zstd(None))
        .finish(&mut clone)
        .map_err(|source| StoreError::Polars {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path.display(), rows = df.height(), "wrote parquet output");
    Ok(())
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), StoreError> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
