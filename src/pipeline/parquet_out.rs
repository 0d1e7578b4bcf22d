use parquet::basic::{Compression, LogicalType, Repetition, Type as PhysicalType, ZstdLevel};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::format::KeyValue;
use parquet::schema::types::{Type, TypePtr};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::constants::PARQUET_TABLE_NAME;
use crate::error::{DemographicsError, Result};
use crate::types::{FinalRecord, PopulationCategory};

/// Text columns of the columnar export, in schema order. The five
/// `*_Percentage` doubles follow in [`PopulationCategory::ALL`] order.
pub const PARQUET_TEXT_COLUMNS: [&str; 4] = ["Voter_ID", "Name", "Address", "ZIP"];

/// The fixed nine-column schema: four required UTF-8 strings, five optional doubles.
pub fn build_schema() -> std::result::Result<TypePtr, ParquetError> {
    let mut fields = Vec::with_capacity(PARQUET_TEXT_COLUMNS.len() + PopulationCategory::ALL.len());
    for name in PARQUET_TEXT_COLUMNS {
        fields.push(Arc::new(
            Type::primitive_type_builder(name, PhysicalType::BYTE_ARRAY)
                .with_repetition(Repetition::REQUIRED)
                .with_logical_type(Some(LogicalType::String))
                .build()?,
        ));
    }
    for category in PopulationCategory::ALL {
        fields.push(Arc::new(
            Type::primitive_type_builder(category.percentage_column(), PhysicalType::DOUBLE)
                .with_repetition(Repetition::OPTIONAL)
                .build()?,
        ));
    }
    Ok(Arc::new(
        Type::group_type_builder(PARQUET_TABLE_NAME)
            .with_fields(fields)
            .build()?,
    ))
}

fn text_values(records: &[FinalRecord], index: usize) -> Vec<ByteArray> {
    records
        .iter()
        .map(|r| {
            let voter = r.voter();
            let value = match index {
                0 => voter.voter_id.as_str(),
                1 => voter.name.as_str(),
                2 => voter.street.as_str(),
                _ => voter.zip.as_str(),
            };
            ByteArray::from(value)
        })
        .collect()
}

/// Non-null values plus definition levels (1 present, 0 null).
fn percentage_values(records: &[FinalRecord], category: PopulationCategory) -> (Vec<f64>, Vec<i16>) {
    let mut values = Vec::with_capacity(records.len());
    let mut def_levels = Vec::with_capacity(records.len());
    for record in records {
        match record.percentages.get(category) {
            Some(v) if v.is_finite() => {
                values.push(*v);
                def_levels.push(1);
            }
            _ => def_levels.push(0),
        }
    }
    (values, def_levels)
}

fn write_file(records: &[FinalRecord], file: File) -> std::result::Result<(), ParquetError> {
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .set_key_value_metadata(Some(vec![KeyValue::new(
            "table_name".to_string(),
            PARQUET_TABLE_NAME.to_string(),
        )]))
        .build();
    let mut writer = SerializedFileWriter::new(file, build_schema()?, Arc::new(props))?;

    if !records.is_empty() {
        let mut row_group = writer.next_row_group()?;
        let mut col_index = 0;
        while let Some(mut column) = row_group.next_column()? {
            if col_index < PARQUET_TEXT_COLUMNS.len() {
                let values = text_values(records, col_index);
                column.typed::<ByteArrayType>().write_batch(&values, None, None)?;
            } else {
                let category = PopulationCategory::ALL[col_index - PARQUET_TEXT_COLUMNS.len()];
                let (values, def_levels) = percentage_values(records, category);
                column
                    .typed::<DoubleType>()
                    .write_batch(&values, Some(def_levels.as_slice()), None)?;
            }
            column.close()?;
            col_index += 1;
        }
        row_group.close()?;
    }

    writer.close()?;
    Ok(())
}

/// Writes the records as a single row group. Returns the number of rows written.
pub fn write_parquet(records: &[FinalRecord], path: &Path) -> Result<usize> {
    info!("Exporting data to Parquet file at {}", path.display());
    let file = File::create(path).map_err(|source| DemographicsError::ExportIo {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(records, file).map_err(|source| DemographicsError::ParquetExport {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(records.len())
}
