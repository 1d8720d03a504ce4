use crate::constants::{DO_LOCATION_ID, DROPOFF_DATETIME, PICKUP_DATETIME, PREDICTED_DURATION, PU_LOCATION_ID, RIDE_ID};
use crate::error::{PipelineError, Result};
use crate::types::{PredictionRecord, RecordSet, TripRecord};
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use parquet::basic::{LogicalType, TimeUnit};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use parquet::schema::types::Type;

const TRIP_COLUMNS: [&str; 4] = [PU_LOCATION_ID, DO_LOCATION_ID, PICKUP_DATETIME, DROPOFF_DATETIME];
const PREDICTION_COLUMNS: [&str; 2] = [RIDE_ID, PREDICTED_DURATION];

// Select only the named top-level columns; a missing one is a schema error
fn projection(reader: &SerializedFileReader<Bytes>, columns: &[&str]) -> Result<Type> {
    let root = reader.metadata().file_metadata().schema();
    let mut selected = Vec::with_capacity(columns.len());
    for name in columns {
        let field = root
            .get_fields()
            .iter()
            .find(|f| f.name() == *name)
            .ok_or_else(|| PipelineError::Schema(format!("input has no column '{}'", name)))?;
        selected.push(field.clone());
    }
    Ok(Type::group_type_builder(root.name()).with_fields(selected).build()?)
}

fn location_id(column: &str, field: &Field) -> Result<Option<i64>> {
    let id = match field {
        Field::Null => None,
        Field::Byte(v) => Some(i64::from(*v)),
        Field::Short(v) => Some(i64::from(*v)),
        Field::Int(v) => Some(i64::from(*v)),
        Field::Long(v) => Some(*v),
        Field::UByte(v) => Some(i64::from(*v)),
        Field::UShort(v) => Some(i64::from(*v)),
        Field::UInt(v) => Some(i64::from(*v)),
        Field::ULong(v) => Some(*v as i64),
        Field::Float(v) if v.is_nan() => None,
        Field::Float(v) => Some(v.trunc() as i64),
        Field::Double(v) if v.is_nan() => None,
        Field::Double(v) => Some(v.trunc() as i64),
        other => {
            return Err(PipelineError::Schema(format!("column '{}' holds non-numeric value {:?}", column, other)))
        }
    };
    Ok(id)
}

// Unit declared by a column's timestamp logical type. Columns with no legacy
// converted type (nanoseconds) reach the row API as plain longs.
fn timestamp_unit(schema: &Type, column: &str) -> Option<TimeUnit> {
    let field = schema.get_fields().iter().find(|f| f.name() == column)?;
    match field.get_basic_info().logical_type() {
        Some(LogicalType::Timestamp { unit, .. }) => Some(unit),
        _ => None,
    }
}

fn timestamp(column: &str, field: &Field, unit: Option<&TimeUnit>) -> Result<Option<NaiveDateTime>> {
    let parsed = match (field, unit) {
        (Field::Null, _) => return Ok(None),
        (Field::TimestampMillis(ms), _) => DateTime::<Utc>::from_timestamp_millis(*ms),
        (Field::TimestampMicros(us), _) => DateTime::<Utc>::from_timestamp_micros(*us),
        (Field::Long(ms), Some(TimeUnit::MILLIS(_))) => DateTime::<Utc>::from_timestamp_millis(*ms),
        (Field::Long(us), Some(TimeUnit::MICROS(_))) => DateTime::<Utc>::from_timestamp_micros(*us),
        (Field::Long(ns), Some(TimeUnit::NANOS(_))) => {
            DateTime::<Utc>::from_timestamp(ns.div_euclid(1_000_000_000), ns.rem_euclid(1_000_000_000) as u32)
        }
        (other, _) => {
            return Err(PipelineError::Schema(format!("column '{}' holds non-timestamp value {:?}", column, other)))
        }
    };
    parsed
        .map(|dt| Some(dt.naive_utc()))
        .ok_or_else(|| PipelineError::Schema(format!("column '{}' has an out-of-range timestamp", column)))
}

/// Decodes a trip file, keeping each row's position as its index
pub fn decode_trips(bytes: Bytes) -> Result<RecordSet> {
    let reader = SerializedFileReader::new(bytes)?;
    let projection = projection(&reader, &TRIP_COLUMNS)?;
    let pickup_unit = timestamp_unit(&projection, PICKUP_DATETIME);
    let dropoff_unit = timestamp_unit(&projection, DROPOFF_DATETIME);
    let expected = reader.metadata().file_metadata().num_rows().max(0) as usize;

    let mut trips = Vec::with_capacity(expected);
    for (row_index, row) in reader.get_row_iter(Some(projection))?.enumerate() {
        let row = row?;
        let mut trip = TripRecord {
            row_index,
            pu_location_id: None,
            do_location_id: None,
            pickup_datetime: None,
            dropoff_datetime: None,
        };
        for (name, field) in row.get_column_iter() {
            match name.as_str() {
                PU_LOCATION_ID => trip.pu_location_id = location_id(name, field)?,
                DO_LOCATION_ID => trip.do_location_id = location_id(name, field)?,
                PICKUP_DATETIME => trip.pickup_datetime = timestamp(name, field, pickup_unit.as_ref())?,
                DROPOFF_DATETIME => trip.dropoff_datetime = timestamp(name, field, dropoff_unit.as_ref())?,
                _ => {}
            }
        }
        trips.push(trip);
    }
    Ok(trips)
}

/// Decodes a predictions file written by [`super::parquet_out::encode_predictions`]
pub fn decode_predictions(bytes: Bytes) -> Result<Vec<PredictionRecord>> {
    let reader = SerializedFileReader::new(bytes)?;
    let projection = projection(&reader, &PREDICTION_COLUMNS)?;

    let mut out = Vec::new();
    for row in reader.get_row_iter(Some(projection))? {
        let row = row?;
        let mut ride_id = None;
        let mut predicted_duration = None;
        for (name, field) in row.get_column_iter() {
            match (name.as_str(), field) {
                (RIDE_ID, Field::Str(s)) => ride_id = Some(s.clone()),
                (PREDICTED_DURATION, Field::Double(v)) => predicted_duration = Some(*v),
                (PREDICTED_DURATION, Field::Float(v)) => predicted_duration = Some(f64::from(*v)),
                (column, other) => {
                    return Err(PipelineError::Schema(format!("unexpected value {:?} in column '{}'", other, column)))
                }
            }
        }
        match (ride_id, predicted_duration) {
            (Some(ride_id), Some(predicted_duration)) => out.push(PredictionRecord { ride_id, predicted_duration }),
            _ => return Err(PipelineError::Schema("prediction row is missing a value".to_string())),
        }
    }
    Ok(out)
}
