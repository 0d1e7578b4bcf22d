use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemographicsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to read {table} table at {}: {source}", .path.display())]
    InputRead {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{table} table at {} is missing required columns: {}", .path.display(), .columns.join(", "))]
    MissingColumns {
        table: &'static str,
        path: PathBuf,
        columns: Vec<String>,
    },

    #[error("CSV export to {} failed: {source}", .path.display())]
    CsvExport {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Parquet export to {} failed: {source}", .path.display())]
    ParquetExport {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },

    #[error("Could not finalize export at {}: {source}", .path.display())]
    ExportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DemographicsError {
    /// Process exit code for this failure.
    ///
    /// `2` configuration, `3` input tables, `4` export sinks, `1` anything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            DemographicsError::Config(_)
            | DemographicsError::Toml(_)
            | DemographicsError::HttpClient(_) => 2,
            DemographicsError::InputRead { .. } | DemographicsError::MissingColumns { .. } => 3,
            DemographicsError::CsvExport { .. }
            | DemographicsError::ParquetExport { .. }
            | DemographicsError::ExportIo { .. } => 4,
            DemographicsError::Io(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, DemographicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_failure_class() {
        assert_eq!(DemographicsError::Config("bad".into()).exit_code(), 2);

        let missing = DemographicsError::MissingColumns {
            table: "voter",
            path: PathBuf::from("voters.csv"),
            columns: vec!["ZIP".into(), "City".into()],
        };
        assert_eq!(missing.exit_code(), 3);
        assert_eq!(
            missing.to_string(),
            "voter table at voters.csv is missing required columns: ZIP, City"
        );

        let export = DemographicsError::ExportIo {
            path: PathBuf::from("out.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(export.exit_code(), 4);
    }
}
