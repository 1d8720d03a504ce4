use crate::constants::{DO_LOCATION_ID, DROPOFF_DATETIME, PICKUP_DATETIME, PREDICTED_DURATION, PU_LOCATION_ID, RIDE_ID};
use crate::error::{PipelineError, Result};
use crate::types::{PredictionRecord, TripRecord};
use chrono::NaiveDateTime;
use parquet::basic::{Compression, ConvertedType, LogicalType, Repetition, Type as PhysicalType};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::{Type, TypePtr};
use std::sync::Arc;

// ride_id: utf8, predicted_duration: double
fn prediction_schema() -> Result<TypePtr> {
    let fields = vec![
        Arc::new(
            Type::primitive_type_builder(RIDE_ID, PhysicalType::BYTE_ARRAY)
                .with_repetition(Repetition::REQUIRED)
                .with_logical_type(Some(LogicalType::String))
                .build()?,
        ),
        Arc::new(
            Type::primitive_type_builder(PREDICTED_DURATION, PhysicalType::DOUBLE)
                .with_repetition(Repetition::REQUIRED)
                .build()?,
        ),
    ];
    Ok(Arc::new(Type::group_type_builder("schema").with_fields(fields).build()?))
}

// Same layout as the FHV trip files: nullable int64 ids, nullable microsecond timestamps
fn trip_schema() -> Result<TypePtr> {
    let optional_i64 = |name: &str, converted: ConvertedType| -> Result<TypePtr> {
        Ok(Arc::new(
            Type::primitive_type_builder(name, PhysicalType::INT64)
                .with_repetition(Repetition::OPTIONAL)
                .with_converted_type(converted)
                .build()?,
        ))
    };
    let fields = vec![
        optional_i64(PU_LOCATION_ID, ConvertedType::NONE)?,
        optional_i64(DO_LOCATION_ID, ConvertedType::NONE)?,
        optional_i64(PICKUP_DATETIME, ConvertedType::TIMESTAMP_MICROS)?,
        optional_i64(DROPOFF_DATETIME, ConvertedType::TIMESTAMP_MICROS)?,
    ];
    Ok(Arc::new(Type::group_type_builder("schema").with_fields(fields).build()?))
}

fn writer_properties() -> Arc<WriterProperties> {
    Arc::new(WriterProperties::builder().set_compression(Compression::UNCOMPRESSED).build())
}

/// Encodes predictions as a single-row-group, uncompressed Parquet file
pub fn encode_predictions(records: &[PredictionRecord]) -> Result<Vec<u8>> {
    let ride_ids: Vec<ByteArray> = records.iter().map(|r| ByteArray::from(r.ride_id.as_str())).collect();
    let durations: Vec<f64> = records.iter().map(|r| r.predicted_duration).collect();

    let mut buf = Vec::new();
    {
        let mut writer = SerializedFileWriter::new(&mut buf, prediction_schema()?, writer_properties())?;
        let mut rg = writer.next_row_group()?;
        let mut col_index = 0;
        while let Some(mut col_writer) = rg.next_column()? {
            match col_index {
                0 => {
                    col_writer.typed::<ByteArrayType>().write_batch(&ride_ids, None, None)?;
                }
                1 => {
                    col_writer.typed::<DoubleType>().write_batch(&durations, None, None)?;
                }
                _ => return Err(PipelineError::Schema("unexpected column in prediction schema".to_string())),
            }
            col_writer.close()?;
            col_index += 1;
        }
        rg.close()?;
        writer.close()?;
    }
    Ok(buf)
}

// Values for an optional column plus its definition levels
fn optional_column<T>(values: impl Iterator<Item = Option<T>>) -> (Vec<T>, Vec<i16>) {
    let mut present = Vec::new();
    let mut def_levels = Vec::new();
    for value in values {
        match value {
            Some(v) => {
                present.push(v);
                def_levels.push(1);
            }
            None => def_levels.push(0),
        }
    }
    (present, def_levels)
}

fn micros(ts: Option<NaiveDateTime>) -> Option<i64> {
    ts.map(|t| t.and_utc().timestamp_micros())
}

/// Encodes trips in the input file layout
pub fn encode_trips(trips: &[TripRecord]) -> Result<Vec<u8>> {
    let columns = [
        optional_column(trips.iter().map(|t| t.pu_location_id)),
        optional_column(trips.iter().map(|t| t.do_location_id)),
        optional_column(trips.iter().map(|t| micros(t.pickup_datetime))),
        optional_column(trips.iter().map(|t| micros(t.dropoff_datetime))),
    ];

    let mut buf = Vec::new();
    {
        let mut writer = SerializedFileWriter::new(&mut buf, trip_schema()?, writer_properties())?;
        let mut rg = writer.next_row_group()?;
        let mut col_index = 0;
        while let Some(mut col_writer) = rg.next_column()? {
            let (values, def_levels) = columns
                .get(col_index)
                .ok_or_else(|| PipelineError::Schema("unexpected column in trip schema".to_string()))?;
            col_writer.typed::<Int64Type>().write_batch(values, Some(def_levels.as_slice()), None)?;
            col_writer.close()?;
            col_index += 1;
        }
        rg.close()?;
        writer.close()?;
    }
    Ok(buf)
}
