use std::fmt;

use serde::{Deserialize, Serialize};

/// Vehicle category a trip was recorded under. The uppercase literal is part of the
/// output contract and is what lands in the `taxi_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaxiType {
    #[serde(rename = "YELLOW", alias = "yellow", alias = "Yellow")]
    Yellow,
    #[serde(rename = "GREEN", alias = "green", alias = "Green")]
    Green,
}

impl TaxiType {
    pub const ALL: [TaxiType; 2] = [TaxiType::Yellow, TaxiType::Green];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxiType::Yellow => "YELLOW",
            TaxiType::Green => "GREEN",
        }
    }
}

impl fmt::Display for TaxiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaxiType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "YELLOW" => Ok(TaxiType::Yellow),
            "GREEN" => Ok(TaxiType::Green),
            other => Err(format!("unknown taxi type '{other}'")),
        }
    }
}

/// Raw column names for one source. The TLC publishes yellow trips with `tpep_` timestamps
/// and green trips with `lpep_` timestamps; everything else is shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchema {
    pub pickup_column: String,
    pub dropoff_column: String,
    pub distance_column: String,
    pub passenger_count_column: String,
}

impl SourceSchema {
    pub fn yellow() -> Self {
        Self::with_timestamp_prefix("tpep")
    }

    pub fn green() -> Self {
        Self::with_timestamp_prefix("lpep")
    }

    pub fn for_taxi_type(taxi_type: TaxiType) -> Self {
        match taxi_type {
            TaxiType::Yellow => Self::yellow(),
            TaxiType::Green => Self::green(),
        }
    }

    fn with_timestamp_prefix(prefix: &str) -> Self {
        Self {
            pickup_column: format!("{prefix}_pickup_datetime"),
            dropoff_column: format!("{prefix}_dropoff_datetime"),
            distance_column: "trip_distance".to_string(),
            passenger_count_column: "passenger_count".to_string(),
        }
    }

    pub fn columns(&self) -> [&str; 4] {
        [
            self.pickup_column.as_str(),
            self.dropoff_column.as_str(),
            self.distance_column.as_str(),
            self.passenger_count_column.as_str(),
        ]
    }
}
