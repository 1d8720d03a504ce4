use super::parquet_in::decode_trips;
use crate::error::Result;
use crate::storage::{Location, ObjectStore};
use crate::types::RecordSet;
use bytes::Bytes;
use tracing::{info, instrument};

/// Fetches the raw input bytes without decoding them
#[instrument(skip(store), fields(location = %location))]
pub async fn fetch(store: &dyn ObjectStore, location: &Location) -> Result<Bytes> {
    let bytes = store.get(location).await?;
    info!(bytes = bytes.len(), "Fetched input");
    Ok(bytes)
}

pub fn decode(bytes: Bytes) -> Result<RecordSet> {
    let trips = decode_trips(bytes)?;
    info!(rows = trips.len(), "Decoded trip records");
    Ok(trips)
}

/// Loads a trip record set from a local path, URL or S3 object
pub async fn read(store: &dyn ObjectStore, location: &Location) -> Result<RecordSet> {
    decode(fetch(store, location).await?)
}
