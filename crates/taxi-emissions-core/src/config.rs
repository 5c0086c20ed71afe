use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use taxi_emissions_parser::{SourceNormalizer, SourceSchema, TaxiType};

use crate::audit::DEFAULT_AUDIT_ROW_CAP;
use crate::catalog::{Materialization, MaterializationPolicies};
use crate::quality_filters::QualityThresholds;
use crate::window::{TripWindow, WindowError};

pub const CONFIG_ENV_VAR: &str = "TAXI_EMISSIONS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error("source '{0}' is configured more than once")]
    DuplicateSource(TaxiType),
    #[error("audit row_cap must be at least 1")]
    ZeroAuditCap,
}

/// Whole-run configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub window: WindowConfig,
    pub sources: Vec<SourceConfig>,
    pub emissions: EmissionsConfig,
    pub outputs: OutputsConfig,
    pub audit: AuditConfig,
    pub quality: QualityThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            sources: vec![
                SourceConfig::new(TaxiType::Yellow, "data/raw/yellow_tripdata_*.parquet"),
                SourceConfig::new(TaxiType::Green, "data/raw/green_tripdata_*.parquet"),
            ],
            emissions: EmissionsConfig::default(),
            outputs: OutputsConfig::default(),
            audit: AuditConfig::default(),
            quality: QualityThresholds::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.trip_window()?;
        if self.audit.row_cap == 0 {
            return Err(ConfigError::ZeroAuditCap);
        }
        for (idx, source) in self.sources.iter().enumerate() {
            if self.sources[..idx]
                .iter()
                .any(|earlier| earlier.taxi_type == source.taxi_type)
            {
                return Err(ConfigError::DuplicateSource(source.taxi_type));
            }
        }
        Ok(())
    }

    pub fn trip_window(&self) -> Result<TripWindow, WindowError> {
        self.window.trip_window()
    }

    pub fn policies(&self) -> MaterializationPolicies {
        MaterializationPolicies {
            fct_trips: self.outputs.fct_trips,
            fct_trips_enriched: self.outputs.fct_trips_enriched,
        }
    }
}

/// Pickup window as whole dates; `end` is exclusive. Unset bounds fall back to the standard
/// 2015-01-01 / 2025-01-01 window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl WindowConfig {
    pub fn trip_window(&self) -> Result<TripWindow, WindowError> {
        let standard = TripWindow::standard();
        let start = match self.start {
            Some(date) => midnight_micros(date)?,
            None => standard.start_micros(),
        };
        let end = match self.end {
            Some(date) => midnight_micros(date)?,
            None => standard.end_micros(),
        };
        TripWindow::from_micros(start, end)
    }
}

fn midnight_micros(date: NaiveDate) -> Result<i64, WindowError> {
    date.and_hms_opt(0, 0, 0)
        .map(|ts| ts.and_utc().timestamp_micros())
        .ok_or_else(|| WindowError::OutOfRange(date.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub taxi_type: TaxiType,
    /// File path or glob, e.g. `data/raw/yellow_tripdata_*.parquet`.
    pub path: String,
    #[serde(default)]
    pub columns: ColumnOverrides,
}

impl SourceConfig {
    pub fn new(taxi_type: TaxiType, path: impl Into<String>) -> Self {
        Self {
            taxi_type,
            path: path.into(),
            columns: ColumnOverrides::default(),
        }
    }

    /// Built-in column names for the taxi type with any configured overrides applied.
    pub fn schema(&self) -> SourceSchema {
        let mut schema = SourceSchema::for_taxi_type(self.taxi_type);
        let overrides = &self.columns;
        if let Some(name) = &overrides.pickup {
            schema.pickup_column = name.clone();
        }
        if let Some(name) = &overrides.dropoff {
            schema.dropoff_column = name.clone();
        }
        if let Some(name) = &overrides.trip_distance {
            schema.distance_column = name.clone();
        }
        if let Some(name) = &overrides.passenger_count {
            schema.passenger_count_column = name.clone();
        }
        schema
    }

    pub fn normalizer(&self) -> SourceNormalizer {
        SourceNormalizer::new(self.taxi_type, self.schema())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOverrides {
    pub pickup: Option<String>,
    pub dropoff: Option<String>,
    pub trip_distance: Option<String>,
    pub passenger_count: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionsFormat {
    /// Normalized `taxi_type`, `co2_grams_per_mile` table.
    Reference,
    /// Raw `vehicle_type`, `co2_grams_per_mile` table.
    #[default]
    VehicleEmissions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionsConfig {
    pub path: PathBuf,
    pub format: EmissionsFormat,
}

impl Default for EmissionsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/vehicle_emissions.csv"),
            format: EmissionsFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
    pub directory: PathBuf,
    pub fct_trips: Materialization,
    pub fct_trips_enriched: Materialization,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        let policies = MaterializationPolicies::default();
        Self {
            directory: PathBuf::from("outputs"),
            fct_trips: policies.fct_trips,
            fct_trips_enriched: policies.fct_trips_enriched,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub row_cap: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            row_cap: DEFAULT_AUDIT_ROW_CAP,
        }
    }
}
