//! Object storage for input, snapshot and prediction files.
//!
//! A path string is parsed into a [`Location`]; [`StorageRouter`] sends each
//! location to the backend that serves it.

pub mod http;
pub mod in_memory;
pub mod local;
pub mod s3;
pub mod sigv4;

use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::path::PathBuf;

pub use http::HttpStore;
pub use in_memory::InMemoryStore;
pub use local::LocalStore;
pub use s3::S3Store;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Local(PathBuf),
    Http(String),
    S3 { bucket: String, key: String },
}

impl Location {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PipelineError::Config("empty storage path".to_string()));
        }
        if let Some(rest) = raw.strip_prefix("s3://") {
            let (bucket, key) = rest
                .split_once('/')
                .ok_or_else(|| PipelineError::Config(format!("S3 path '{}' has no object key", raw)))?;
            if bucket.is_empty() || key.is_empty() {
                return Err(PipelineError::Config(format!("S3 path '{}' needs both bucket and key", raw)));
            }
            return Ok(Location::S3 { bucket: bucket.to_string(), key: key.to_string() });
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Location::Http(raw.to_string()));
        }
        let path = raw.strip_prefix("file://").unwrap_or(raw);
        Ok(Location::Local(PathBuf::from(path)))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Http(url) => write!(f, "{}", url),
            Location::S3 { bucket, key } => write!(f, "s3://{}/{}", bucket, key),
        }
    }
}

/// Byte-level access to a storage backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, location: &Location) -> Result<Bytes>;
    async fn put(&self, location: &Location, bytes: Bytes) -> Result<()>;
}

pub(crate) fn unsupported(backend: &str, op: &str, location: &Location) -> PipelineError {
    PipelineError::Unsupported(format!("{} store cannot {} {}", backend, op, location))
}

/// Dispatches each location to the local, HTTP or S3 backend
pub struct StorageRouter {
    local: LocalStore,
    http: HttpStore,
    s3: S3Store,
}

impl StorageRouter {
    pub fn new(s3: S3Store) -> Self {
        Self { local: LocalStore::new(), http: HttpStore::new(), s3 }
    }

    pub fn s3(&self) -> &S3Store {
        &self.s3
    }
}

#[async_trait]
impl ObjectStore for StorageRouter {
    async fn get(&self, location: &Location) -> Result<Bytes> {
        match location {
            Location::Local(_) => self.local.get(location).await,
            Location::Http(_) => self.http.get(location).await,
            Location::S3 { .. } => self.s3.get(location).await,
        }
    }

    async fn put(&self, location: &Location, bytes: Bytes) -> Result<()> {
        match location {
            Location::Local(_) => self.local.put(location, bytes).await,
            Location::Http(_) => self.http.put(location, bytes).await,
            Location::S3 { .. } => self.s3.put(location, bytes).await,
        }
    }
}
