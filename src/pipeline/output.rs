use super::parquet_out::encode_predictions;
use crate::error::Result;
use crate::storage::{Location, ObjectStore};
use crate::types::PredictionRecord;
use bytes::Bytes;
use tracing::{info, instrument};

/// Persists the prediction set as a Parquet file
#[instrument(skip(store, records), fields(location = %location, rows = records.len()))]
pub async fn write(store: &dyn ObjectStore, records: &[PredictionRecord], location: &Location) -> Result<()> {
    let bytes = encode_predictions(records)?;
    let size = bytes.len();
    store.put(location, Bytes::from(bytes)).await?;
    info!(bytes = size, "Wrote predictions");
    Ok(())
}
