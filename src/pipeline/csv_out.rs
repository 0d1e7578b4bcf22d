use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{DemographicsError, Result};
use crate::types::{FinalRecord, PopulationCategory};

/// Header of the CSV export, in column order.
pub const CSV_HEADER: [&str; 19] = [
    "Voter_ID",
    "Name",
    "Address",
    "City",
    "State",
    "ZIP",
    "Latitude",
    "Longitude",
    "White",
    "Black",
    "Hispanic",
    "Asian",
    "Other",
    "Total_Population",
    "White_Percentage",
    "Black_Percentage",
    "Hispanic_Percentage",
    "Asian_Percentage",
    "Other_Percentage",
];

/// One CSV line. Field order must match [`CSV_HEADER`]; `None` is an empty cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    #[serde(rename = "Voter_ID")]
    pub voter_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "ZIP")]
    pub zip: String,
    #[serde(rename = "Latitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,
    #[serde(rename = "White")]
    pub white: Option<f64>,
    #[serde(rename = "Black")]
    pub black: Option<f64>,
    #[serde(rename = "Hispanic")]
    pub hispanic: Option<f64>,
    #[serde(rename = "Asian")]
    pub asian: Option<f64>,
    #[serde(rename = "Other")]
    pub other: Option<f64>,
    #[serde(rename = "Total_Population")]
    pub total_population: Option<f64>,
    #[serde(rename = "White_Percentage")]
    pub white_percentage: Option<f64>,
    #[serde(rename = "Black_Percentage")]
    pub black_percentage: Option<f64>,
    #[serde(rename = "Hispanic_Percentage")]
    pub hispanic_percentage: Option<f64>,
    #[serde(rename = "Asian_Percentage")]
    pub asian_percentage: Option<f64>,
    #[serde(rename = "Other_Percentage")]
    pub other_percentage: Option<f64>,
}

impl From<&FinalRecord> for CsvRow {
    fn from(record: &FinalRecord) -> Self {
        let voter = record.voter();
        let coordinate = record.coordinate();
        let reference = record.reference();
        let count = |c: PopulationCategory| reference.and_then(|r| *r.counts.get(c));
        let pct = |c: PopulationCategory| *record.percentages.get(c);

        Self {
            voter_id: voter.voter_id.clone(),
            name: voter.name.clone(),
            address: voter.street.clone(),
            city: voter.city.clone(),
            state: voter.state.clone(),
            zip: voter.zip.clone(),
            latitude: coordinate.map(|c| c.latitude()),
            longitude: coordinate.map(|c| c.longitude()),
            white: count(PopulationCategory::White),
            black: count(PopulationCategory::Black),
            hispanic: count(PopulationCategory::Hispanic),
            asian: count(PopulationCategory::Asian),
            other: count(PopulationCategory::Other),
            total_population: reference.and_then(|r| r.total_population),
            white_percentage: pct(PopulationCategory::White),
            black_percentage: pct(PopulationCategory::Black),
            hispanic_percentage: pct(PopulationCategory::Hispanic),
            asian_percentage: pct(PopulationCategory::Asian),
            other_percentage: pct(PopulationCategory::Other),
        }
    }
}

/// Writes header plus one line per record. Returns the number of rows written.
pub fn write_csv(records: &[FinalRecord], path: &Path) -> Result<usize> {
    info!("Exporting data to CSV at {}", path.display());
    let export_error = |source: csv::Error| DemographicsError::CsvExport {
        path: path.to_path_buf(),
        source,
    };

    // Header is written by hand so an empty export still carries it.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(export_error)?;
    writer.write_record(CSV_HEADER).map_err(export_error)?;
    for record in records {
        writer.serialize(CsvRow::from(record)).map_err(export_error)?;
    }
    writer.flush().map_err(|e| DemographicsError::ExportIo {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(records.len())
}

/// Reads a CSV export back into rows.
pub fn read_csv(path: &Path) -> Result<Vec<CsvRow>> {
    let input_error = |source: csv::Error| DemographicsError::InputRead {
        table: "export",
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(input_error)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<CsvRow>, csv::Error>>()
        .map_err(input_error)
}
