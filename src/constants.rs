/// Column names of the FHV trip files
pub const PU_LOCATION_ID: &str = "PUlocationID";
pub const DO_LOCATION_ID: &str = "DOlocationID";
pub const PICKUP_DATETIME: &str = "pickup_datetime";
pub const DROPOFF_DATETIME: &str = "dropOff_datetime";

/// Columns fed to the vectorizer, in the order the model was trained with
pub const CATEGORICAL_FIELDS: [&str; 2] = [PU_LOCATION_ID, DO_LOCATION_ID];

/// Column names of the predictions file
pub const RIDE_ID: &str = "ride_id";
pub const PREDICTED_DURATION: &str = "predicted_duration";

/// Stand-in for a missing location id
pub const MISSING_LOCATION_ID: i64 = -1;

// Trips shorter or longer than this (in minutes) are not scored
pub const MIN_DURATION_MINUTES: f64 = 1.0;
pub const MAX_DURATION_MINUTES: f64 = 60.0;

pub const DEFAULT_BUCKET: &str = "nyc-duration";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_MODEL_PATH: &str = "model/model.json";

pub const DEFAULT_INPUT_PATTERN: &str = "https://raw.githubusercontent.com/alexeygrigorev/datasets/master/nyc-tlc/fhv/fhv_tripdata_{year:04d}-{month:02d}.parquet";
pub const DEFAULT_S3_SNAPSHOT_PATTERN: &str = "s3://nyc-duration/fhv-{year:04d}-{month:02d}-input.parquet";
pub const DEFAULT_S3_OUTPUT_PATTERN: &str = "s3://nyc-duration/fhv-{year:04d}-{month:02d}-predictions.parquet";
pub const DEFAULT_LOCAL_SNAPSHOT_PATTERN: &str = "in/fhv-{year:04d}-{month:02d}-input.parquet";
pub const DEFAULT_LOCAL_OUTPUT_PATTERN: &str = "out/fhv-{year:04d}-{month:02d}-predictions.parquet";

pub const PUSHGATEWAY_JOB: &str = "ride_duration";
