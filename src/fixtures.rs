use crate::error::Result;
use crate::pipeline::parquet_out::encode_trips;
use crate::storage::{Location, ObjectStore};
use crate::types::TripRecord;
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

fn dt(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 1, 1)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .unwrap_or_default()
}

/// Four trips covering a null-id row, a normal row, a too-short and a too-long trip
pub fn fixture_trips() -> Vec<TripRecord> {
    let rows = [
        (None, None, dt(1, 2, 0), dt(1, 10, 0)),
        (Some(1), Some(1), dt(1, 2, 0), dt(1, 10, 0)),
        (Some(1), Some(1), dt(1, 2, 0), dt(1, 2, 50)),
        (Some(1), Some(1), dt(1, 2, 0), dt(2, 2, 1)),
    ];
    rows.into_iter()
        .enumerate()
        .map(|(row_index, (pu, dol, pickup, dropoff))| TripRecord {
            row_index,
            pu_location_id: pu,
            do_location_id: dol,
            pickup_datetime: Some(pickup),
            dropoff_datetime: Some(dropoff),
        })
        .collect()
}

/// Writes the fixture trips as a Parquet file to `location`
pub async fn seed(store: &dyn ObjectStore, location: &Location) -> Result<()> {
    let bytes = encode_trips(&fixture_trips())?;
    store.put(location, Bytes::from(bytes)).await?;
    info!(location = %location, "Seeded fixture input");
    Ok(())
}
