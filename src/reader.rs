//! Contributor table reading.
//!
//! Loads a delimited table into a polars `DataFrame` with the configured
//! header offset and separator, then converts rows into untyped
//! [`RawRecord`]s for the record-level stages.

use crate::config::InputConfig;
use crate::error::{CuratorError, Result};
use crate::models::{RawRecord, RawValue};
use polars::prelude::*;
use tracing::debug;

/// Read the contributor table described by `input`
pub fn read_table(input: &InputConfig) -> Result<DataFrame> {
    if !input.path.exists() {
        return Err(CuratorError::DatasetNotFound {
            path: input.path.clone(),
        });
    }

    let separator = u8::try_from(input.separator).map_err(|_| {
        CuratorError::configuration(format!(
            "separator '{}' is not a single-byte character",
            input.separator
        ))
    })?;

    let parse_options = CsvParseOptions::default()
        .with_separator(separator)
        .with_null_values(Some(NullValues::AllColumns(vec!["NA".into()])));

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows(input.header_offset)
        .with_infer_schema_length(Some(input.infer_schema_rows))
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(input.path.clone()))?
        .finish()?;

    debug!(
        "Read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        input.path.display()
    );
    Ok(df)
}

/// Convert every row of a frame into a [`RawRecord`]
///
/// Categorical and enum columns are read through their string values.
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<RawRecord>> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| match column.dtype() {
            DataType::Categorical(..) | DataType::Enum(..) => column.cast(&DataType::String),
            _ => Ok(column.clone()),
        })
        .collect::<PolarsResult<Vec<Column>>>()?;
    let mut records = Vec::with_capacity(df.height());

    for row in 0..df.height() {
        let mut record = RawRecord::new(row + 1);
        for column in &columns {
            let value = column.get(row)?;
            record
                .fields
                .insert(column.name().to_string(), raw_value_from_any(&value));
        }
        records.push(record);
    }

    Ok(records)
}

fn raw_value_from_any(value: &AnyValue) -> RawValue {
    match value {
        AnyValue::Null => RawValue::Null,
        AnyValue::Int8(v) => RawValue::Int(*v as i64),
        AnyValue::Int16(v) => RawValue::Int(*v as i64),
        AnyValue::Int32(v) => RawValue::Int(*v as i64),
        AnyValue::Int64(v) => RawValue::Int(*v),
        AnyValue::UInt8(v) => RawValue::Int(*v as i64),
        AnyValue::UInt16(v) => RawValue::Int(*v as i64),
        AnyValue::UInt32(v) => RawValue::Int(*v as i64),
        AnyValue::UInt64(v) => RawValue::Int(*v as i64),
        AnyValue::Float32(v) => RawValue::Float(*v as f64),
        AnyValue::Float64(v) => RawValue::Float(*v),
        AnyValue::String(s) => RawValue::Text(s.to_string()),
        AnyValue::StringOwned(s) => RawValue::Text(s.to_string()),
        other => RawValue::Text(other.to_string()),
    }
}
