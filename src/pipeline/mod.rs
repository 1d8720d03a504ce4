//! The batch job: read, snapshot, prepare, score, write.

pub mod ingestion;
pub mod output;
pub mod parquet_in;
pub mod parquet_out;
pub mod prepare;
pub mod score;

pub use ingestion::read;
pub use output::write;
pub use prepare::prepare;
pub use score::score;

use crate::constants::CATEGORICAL_FIELDS;
use crate::error::Result;
use crate::model::{ModelArtifact, UnseenCategoryPolicy};
use crate::storage::{Location, ObjectStore};
use crate::types::{Period, PredictionRecord};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, instrument};

/// Where one run reads from and writes to
#[derive(Debug, Clone)]
pub struct Job {
    pub period: Period,
    pub input: Location,
    /// Verbatim copy of the input bytes, skipped when `None`
    pub snapshot: Option<Location>,
    pub output: Location,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub period: String,
    pub input: String,
    pub snapshot: Option<String>,
    pub output: String,
    pub rows_read: usize,
    pub rows_scored: usize,
    pub rows_dropped: usize,
    pub predicted_duration_sum: f64,
    pub duration_secs: f64,
}

pub struct Pipeline<'a> {
    store: &'a dyn ObjectStore,
    model: &'a ModelArtifact,
    policy: UnseenCategoryPolicy,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a dyn ObjectStore, model: &'a ModelArtifact) -> Self {
        Self { store, model, policy: UnseenCategoryPolicy::default() }
    }

    pub fn with_unseen_policy(mut self, policy: UnseenCategoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[instrument(skip(self, job), fields(period = %job.period))]
    pub async fn run(&self, job: &Job) -> Result<RunSummary> {
        let t_run = Instant::now();
        info!(input = %job.input, "Starting run");

        let t_stage = Instant::now();
        let raw = ingestion::fetch(self.store, &job.input).await?;
        let records = ingestion::decode(raw.clone())?;
        if let Some(snapshot) = &job.snapshot {
            self.store.put(snapshot, raw).await?;
            info!(snapshot = %snapshot, "Saved input snapshot");
        }
        histogram!("ride_duration_stage_seconds", "stage" => "read").record(t_stage.elapsed().as_secs_f64());

        let t_stage = Instant::now();
        let prepared = prepare(&records, &CATEGORICAL_FIELDS)?;
        let rows_dropped = records.len() - prepared.len();
        info!(kept = prepared.len(), dropped = rows_dropped, "Prepared records");
        histogram!("ride_duration_stage_seconds", "stage" => "prepare").record(t_stage.elapsed().as_secs_f64());

        let t_stage = Instant::now();
        let predictions = score(
            &prepared,
            &CATEGORICAL_FIELDS,
            &self.model.encoder,
            &self.model.regressor,
            self.policy,
        )?;
        histogram!("ride_duration_stage_seconds", "stage" => "score").record(t_stage.elapsed().as_secs_f64());

        let results: Vec<PredictionRecord> = prepared
            .iter()
            .zip(&predictions)
            .map(|(trip, &predicted_duration)| PredictionRecord {
                ride_id: job.period.ride_id(trip.row_index),
                predicted_duration,
            })
            .collect();
        let predicted_duration_sum: f64 = predictions.iter().sum();
        info!(predicted_duration_sum, "Scored records");

        let t_stage = Instant::now();
        write(self.store, &results, &job.output).await?;
        histogram!("ride_duration_stage_seconds", "stage" => "write").record(t_stage.elapsed().as_secs_f64());

        counter!("ride_duration_rows_read_total").increment(records.len() as u64);
        counter!("ride_duration_rows_scored_total").increment(results.len() as u64);
        counter!("ride_duration_rows_dropped_total").increment(rows_dropped as u64);
        gauge!("ride_duration_predicted_sum").set(predicted_duration_sum);

        Ok(RunSummary {
            period: job.period.to_string(),
            input: job.input.to_string(),
            snapshot: job.snapshot.as_ref().map(Location::to_string),
            output: job.output.to_string(),
            rows_read: records.len(),
            rows_scored: results.len(),
            rows_dropped,
            predicted_duration_sum,
            duration_secs: t_run.elapsed().as_secs_f64(),
        })
    }
}
