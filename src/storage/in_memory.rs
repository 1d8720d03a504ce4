use super::{Location, ObjectStore};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory store for development/testing; accepts every location kind
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    objects: Arc<Mutex<HashMap<Location, Bytes>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get(&self, location: &Location) -> Result<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(location)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(location.to_string()))
    }

    async fn put(&self, location: &Location, bytes: Bytes) -> Result<()> {
        self.objects.lock().unwrap().insert(location.clone(), bytes);
        Ok(())
    }
}
