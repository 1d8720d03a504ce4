use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage request to {url} failed with status {status}: {body}")]
    Storage { url: String, status: u16, body: String },

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema mismatch: {0}")]
    Schema(String),

    #[error("Unseen category {value:?} for field {field}")]
    UnseenCategory { field: String, value: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
