use crate::constants::{MAX_DURATION_MINUTES, MIN_DURATION_MINUTES, MISSING_LOCATION_ID};
use crate::error::Result;
use crate::types::{FeatureRecord, PreparedTrip, TripRecord};

/// Derives duration, drops trips outside [1, 60] minutes and turns the
/// categorical fields into string tokens, nulls becoming `"-1"`.
///
/// Row indices are carried over so filtered rows leave gaps.
pub fn prepare(records: &[TripRecord], categorical_fields: &[&str]) -> Result<Vec<PreparedTrip>> {
    let mut prepared = Vec::with_capacity(records.len());
    for trip in records {
        let Some(duration) = trip.duration_minutes() else { continue };
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
            continue;
        }
        let mut features = FeatureRecord::new();
        for field in categorical_fields {
            let id = trip.location_id(field)?.unwrap_or(MISSING_LOCATION_ID);
            features.insert(*field, id.to_string());
        }
        prepared.push(PreparedTrip { row_index: trip.row_index, duration, features });
    }
    Ok(prepared)
}
