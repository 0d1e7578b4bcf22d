use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::error::{DemographicsError, Result};
use crate::observability::metrics;
use crate::pipeline::csv_out::write_csv;
use crate::pipeline::parquet_out::write_parquet;
use crate::types::FinalRecord;

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub csv: PathBuf,
    pub parquet: PathBuf,
}

/// `<name>.partial` next to the final path.
fn staging_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|source| DemographicsError::ExportIo {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn promote(staged: &Path, target: &Path) -> Result<()> {
    fs::rename(staged, target).map_err(|source| DemographicsError::ExportIo {
        path: target.to_path_buf(),
        source,
    })
}

fn discard(files: &[&Path]) {
    for file in files {
        if file.is_file() {
            if let Err(e) = fs::remove_file(file) {
                warn!("Could not remove {}: {}", file.display(), e);
            }
        }
    }
}

/// Writes both exports into staging files and moves them into place only
/// when both succeeded. A failed run leaves neither export nor staging file
/// behind.
#[instrument(skip(records), fields(rows = records.len()))]
pub fn export_all(records: &[FinalRecord], paths: &ExportPaths) -> Result<()> {
    let csv_staged = staging_path(&paths.csv);
    let parquet_staged = staging_path(&paths.parquet);

    let written = ensure_parent(&paths.csv)
        .and_then(|_| ensure_parent(&paths.parquet))
        .and_then(|_| write_csv(records, &csv_staged))
        .and_then(|csv_rows| write_parquet(records, &parquet_staged).map(|pq| (csv_rows, pq)));

    let (csv_rows, parquet_rows) = match written {
        Ok(counts) => counts,
        Err(e) => {
            discard(&[&csv_staged, &parquet_staged]);
            return Err(e);
        }
    };

    if let Err(e) = promote(&csv_staged, &paths.csv) {
        discard(&[&csv_staged, &parquet_staged]);
        return Err(e);
    }
    if let Err(e) = promote(&parquet_staged, &paths.parquet) {
        // The CSV is already in place; take it back out with the staged parquet.
        discard(&[&paths.csv, &parquet_staged]);
        return Err(e);
    }

    metrics::export::rows_written("csv", csv_rows);
    metrics::export::rows_written("parquet", parquet_rows);
    info!("CSV export successful: {}", paths.csv.display());
    info!("Parquet export successful: {}", paths.parquet.display());
    Ok(())
}
