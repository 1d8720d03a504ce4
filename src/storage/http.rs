use super::{unsupported, Location, ObjectStore};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::info;

/// Read-only access to files served over plain HTTP(S)
#[derive(Debug, Clone, Default)]
pub struct HttpStore {
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn get(&self, location: &Location) -> Result<Bytes> {
        let Location::Http(url) = location else {
            return Err(unsupported("http", "read", location));
        };
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PipelineError::NotFound(url.clone()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Storage { url: url.clone(), status: status.as_u16(), body });
        }
        let bytes = resp.bytes().await?;
        info!(url = %url, bytes = bytes.len(), "Downloaded file");
        Ok(bytes)
    }

    async fn put(&self, location: &Location, _bytes: Bytes) -> Result<()> {
        Err(unsupported("http", "write", location))
    }
}
