use crate::constants::{
    DEFAULT_INPUT_PATTERN, DEFAULT_LOCAL_OUTPUT_PATTERN, DEFAULT_LOCAL_SNAPSHOT_PATTERN, DEFAULT_MODEL_PATH,
    DEFAULT_REGION, DEFAULT_S3_OUTPUT_PATTERN, DEFAULT_S3_SNAPSHOT_PATTERN,
};
use crate::error::Result;
use crate::model::UnseenCategoryPolicy;
use crate::paths;
use crate::pipeline::Job;
use crate::storage::sigv4::Credentials;
use crate::storage::{Location, S3Store};
use crate::types::Period;
use std::path::PathBuf;

/// Runtime settings, read from the environment.
///
/// Output and snapshot patterns default to the `nyc-duration` bucket when an
/// S3 endpoint is configured and to `out/` and `in/` otherwise.
#[derive(Debug, Clone)]
pub struct Config {
    pub period: Period,
    pub input_pattern: String,
    /// Set when `INPUT_FILE_PATTERN` was given explicitly
    pub input_pattern_overridden: bool,
    pub snapshot_pattern: String,
    pub output_pattern: String,
    pub s3_endpoint: Option<String>,
    pub region: String,
    pub credentials: Option<Credentials>,
    pub model_path: PathBuf,
    pub unseen_categories: UnseenCategoryPolicy,
    pub pushgateway_url: Option<String>,
}

impl Config {
    pub fn from_env(period: Period) -> Result<Self> {
        Self::from_lookup(period, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(period: Period, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let s3_endpoint = var("S3_ENDPOINT_URL");
        let (default_snapshot, default_output) = if s3_endpoint.is_some() {
            (DEFAULT_S3_SNAPSHOT_PATTERN, DEFAULT_S3_OUTPUT_PATTERN)
        } else {
            (DEFAULT_LOCAL_SNAPSHOT_PATTERN, DEFAULT_LOCAL_OUTPUT_PATTERN)
        };

        let input_override = var("INPUT_FILE_PATTERN");
        let credentials = match (var("AWS_ACCESS_KEY_ID"), var("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
                access_key_id,
                secret_access_key,
                session_token: var("AWS_SESSION_TOKEN"),
            }),
            _ => None,
        };
        let unseen_categories = match var("UNSEEN_CATEGORIES") {
            Some(v) => v.parse()?,
            None => UnseenCategoryPolicy::default(),
        };

        Ok(Self {
            period,
            input_pattern_overridden: input_override.is_some(),
            input_pattern: input_override.unwrap_or_else(|| DEFAULT_INPUT_PATTERN.to_string()),
            snapshot_pattern: var("SNAPSHOT_FILE_PATTERN").unwrap_or_else(|| default_snapshot.to_string()),
            output_pattern: var("OUTPUT_FILE_PATTERN").unwrap_or_else(|| default_output.to_string()),
            s3_endpoint,
            region: var("AWS_DEFAULT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            credentials,
            model_path: PathBuf::from(var("MODEL_PATH").unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string())),
            unseen_categories,
            pushgateway_url: var("PUSHGATEWAY_URL"),
        })
    }

    pub fn input_location(&self) -> Result<Location> {
        Location::parse(&paths::render(&self.input_pattern, self.period)?)
    }

    pub fn snapshot_location(&self) -> Result<Location> {
        Location::parse(&paths::render(&self.snapshot_pattern, self.period)?)
    }

    pub fn output_location(&self) -> Result<Location> {
        Location::parse(&paths::render(&self.output_pattern, self.period)?)
    }

    pub fn job(&self) -> Result<Job> {
        Ok(Job {
            period: self.period,
            input: self.input_location()?,
            snapshot: Some(self.snapshot_location()?),
            output: self.output_location()?,
        })
    }

    pub fn s3_store(&self) -> S3Store {
        S3Store::new(self.s3_endpoint.as_deref(), &self.region, self.credentials.clone())
    }
}

/// Buckets the job writes into, without duplicates. With `seeding` the input
/// bucket is included, since the fixture trips are written there first.
pub fn target_buckets(job: &Job, seeding: bool) -> Vec<String> {
    let input = Some(&job.input).filter(|_| seeding);
    let mut buckets: Vec<String> = Vec::new();
    for location in input.into_iter().chain(job.snapshot.iter()).chain(std::iter::once(&job.output)) {
        if let Location::S3 { bucket, .. } = location {
            if !buckets.contains(bucket) {
                buckets.push(bucket.clone());
            }
        }
    }
    buckets
}
