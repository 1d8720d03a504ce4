use crate::constants::{DO_LOCATION_ID, PU_LOCATION_ID};
use crate::error::{PipelineError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The year and month a batch run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PipelineError::Config(format!("month must be in 1..=12, got {}", month)));
        }
        if !(0..=9999).contains(&year) {
            return Err(PipelineError::Config(format!("year must be in 0..=9999, got {}", year)));
        }
        Ok(Self { year, month })
    }

    /// Builds the synthetic ride identifier `"{year:04}/{month:02}_{row_index}"`
    pub fn ride_id(&self, row_index: usize) -> String {
        format!("{:04}/{:02}_{}", self.year, self.month, row_index)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One row of the input trip file
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    /// Position of the row in the input file
    pub row_index: usize,
    pub pu_location_id: Option<i64>,
    pub do_location_id: Option<i64>,
    pub pickup_datetime: Option<NaiveDateTime>,
    pub dropoff_datetime: Option<NaiveDateTime>,
}

impl TripRecord {
    /// Trip length in minutes, `None` when either timestamp is missing
    pub fn duration_minutes(&self) -> Option<f64> {
        let pickup = self.pickup_datetime?;
        let dropoff = self.dropoff_datetime?;
        let micros = (dropoff - pickup).num_microseconds()?;
        Some(micros as f64 / 1_000_000.0 / 60.0)
    }

    /// Looks up a location column by its file column name
    pub fn location_id(&self, field: &str) -> Result<Option<i64>> {
        match field {
            PU_LOCATION_ID => Ok(self.pu_location_id),
            DO_LOCATION_ID => Ok(self.do_location_id),
            other => Err(PipelineError::Schema(format!("unknown categorical field '{}'", other))),
        }
    }
}

pub type RecordSet = Vec<TripRecord>;

/// Categorical tokens keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureRecord {
    values: BTreeMap<String, String>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, token: impl Into<String>) {
        self.values.insert(field.into(), token.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A trip that passed the duration filter, ready to be scored
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTrip {
    pub row_index: usize,
    pub duration: f64,
    pub features: FeatureRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub ride_id: String,
    pub predicted_duration: f64,
}
