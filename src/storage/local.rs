use super::{unsupported, Location, ObjectStore};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use tokio::fs;
use tracing::debug;

/// Reads and writes files on the local filesystem
#[derive(Debug, Default, Clone)]
pub struct LocalStore;

impl LocalStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn get(&self, location: &Location) -> Result<Bytes> {
        let Location::Local(path) = location else {
            return Err(unsupported("local", "read", location));
        };
        match fs::read(path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "Read local file");
                Ok(Bytes::from(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PipelineError::NotFound(location.to_string())),
            Err(e) => Err(PipelineError::Io(e)),
        }
    }

    async fn put(&self, location: &Location, bytes: Bytes) -> Result<()> {
        let Location::Local(path) = location else {
            return Err(unsupported("local", "write", location));
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, &bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "Wrote local file");
        Ok(())
    }
}
