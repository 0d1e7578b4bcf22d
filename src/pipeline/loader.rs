use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

use crate::constants::{CENSUS_REQUIRED_COLUMNS, VOTER_REQUIRED_COLUMNS};
use crate::error::{DemographicsError, Result};
use crate::types::{CategoryValues, PopulationCategory, ReferenceRecord, VoterRecord};

#[derive(Debug, Deserialize)]
struct VoterRow {
    #[serde(rename = "Voter_ID")]
    voter_id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Address")]
    address: String,
    #[serde(rename = "City")]
    city: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "ZIP")]
    zip: String,
}

impl From<VoterRow> for VoterRecord {
    fn from(row: VoterRow) -> Self {
        Self {
            voter_id: row.voter_id,
            name: row.name,
            street: row.address,
            city: row.city,
            state: row.state,
            zip: row.zip,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CensusRow {
    #[serde(rename = "ZIP")]
    zip: String,
    #[serde(rename = "White")]
    white: Option<f64>,
    #[serde(rename = "Black")]
    black: Option<f64>,
    #[serde(rename = "Hispanic")]
    hispanic: Option<f64>,
    #[serde(rename = "Asian")]
    asian: Option<f64>,
    #[serde(rename = "Other")]
    other: Option<f64>,
    #[serde(rename = "Total_Population")]
    total_population: Option<f64>,
}

impl From<CensusRow> for ReferenceRecord {
    fn from(row: CensusRow) -> Self {
        let counts = CategoryValues::from_fn(|category| match category {
            PopulationCategory::White => row.white,
            PopulationCategory::Black => row.black,
            PopulationCategory::Hispanic => row.hispanic,
            PopulationCategory::Asian => row.asian,
            PopulationCategory::Other => row.other,
        });
        Self {
            zip: row.zip,
            counts,
            total_population: row.total_population,
        }
    }
}

/// Loads the voter roster. Columns beyond the required ones are ignored.
#[instrument]
pub fn load_voter_data(path: &Path) -> Result<Vec<VoterRecord>> {
    info!("Loading voter data from {}", path.display());
    let rows: Vec<VoterRow> = load_table(path, "voter", &VOTER_REQUIRED_COLUMNS)?;
    Ok(rows.into_iter().map(VoterRecord::from).collect())
}

/// Loads census counts keyed by postal code. Blank counts load as absent.
#[instrument]
pub fn load_census_data(path: &Path) -> Result<Vec<ReferenceRecord>> {
    info!("Loading Census data from {}", path.display());
    let rows: Vec<CensusRow> = load_table(path, "census", &CENSUS_REQUIRED_COLUMNS)?;
    Ok(rows.into_iter().map(ReferenceRecord::from).collect())
}

fn load_table<T: DeserializeOwned>(
    path: &Path,
    table: &'static str,
    required: &[&str],
) -> Result<Vec<T>> {
    let input_error = |source: csv::Error| DemographicsError::InputRead {
        table,
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(input_error)?;

    let headers = reader.headers().map_err(input_error)?.clone();
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DemographicsError::MissingColumns {
            table,
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, csv::Error>>()
        .map_err(input_error)?;
    info!("Loaded {} {} rows", rows.len(), table);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_voter_data_ignores_extra_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("voters.csv");
        fs::write(
            &path,
            "Voter_ID,Name,Address,City,State,ZIP,Party\n\
             101,Ada Lovelace,12 Analytical Way,Albany,NY,12207,IND\n\
             102,\"Hopper, Grace\",1 Navy Pl,Arlington,VA,02201,DEM\n",
        )
        .unwrap();

        let voters = load_voter_data(&path).unwrap();
        assert_eq!(voters.len(), 2);
        assert_eq!(voters[0].voter_id, "101");
        assert_eq!(voters[1].name, "Hopper, Grace");
        assert_eq!(voters[1].zip, "02201");
        assert_eq!(voters[1].formatted_address(), "1 Navy Pl, Arlington, VA");
    }

    #[test]
    fn test_load_census_data_blank_counts_are_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("census.csv");
        fs::write(
            &path,
            "ZIP,White,Black,Hispanic,Asian,Other,Total_Population\n\
             12207,500,200,150,100,50,1000\n\
             02201,,10,10,10,10,\n",
        )
        .unwrap();

        let census = load_census_data(&path).unwrap();
        assert_eq!(census.len(), 2);
        assert_eq!(*census[0].counts.get(PopulationCategory::Hispanic), Some(150.0));
        assert_eq!(census[0].total_population, Some(1000.0));
        assert_eq!(*census[1].counts.get(PopulationCategory::White), None);
        assert_eq!(census[1].total_population, None);
    }

    #[test]
    fn test_missing_columns_are_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("voters.csv");
        fs::write(&path, "Voter_ID,Name,Address,State\n1,A,B,NY\n").unwrap();

        let err = load_voter_data(&path).unwrap_err();
        match err {
            DemographicsError::MissingColumns { table, columns, .. } => {
                assert_eq!(table, "voter");
                assert_eq!(columns, vec!["City".to_string(), "ZIP".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unreadable_file_is_input_error() {
        let dir = tempdir().unwrap();
        let err = load_census_data(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, DemographicsError::InputRead { table: "census", .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_non_numeric_count_is_input_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("census.csv");
        fs::write(
            &path,
            "ZIP,White,Black,Hispanic,Asian,Other,Total_Population\n10001,many,1,1,1,1,5\n",
        )
        .unwrap();
        assert!(matches!(
            load_census_data(&path),
            Err(DemographicsError::InputRead { .. })
        ));
    }
}
