//! Data file ingestion
//!
//! Loads a directory of instrument logs into the measurement store.
//!
//! ```text
//! data_dir/*.dat (sorted) → file name → (position, filter)
//!                        → lines     → readings (bad lines warned, optionally stripped)
//!                        → one INSERT transaction per file
//! ```

mod parser;

pub use parser::{parse_readings, rewrite_without_rejects, DataFileName, LogParser, ParsedLog};

use crate::config::IngestConfig;
use crate::storage::{Measurement, MeasurementStore, StorageResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of a directory ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Data files found in the directory
    pub files_seen: usize,
    /// Files that contributed at least one row
    pub files_ingested: usize,
    /// Files skipped for a bad name or no valid lines
    pub files_skipped: Vec<PathBuf>,
    /// Rows written to the store
    pub rows_inserted: usize,
    /// Lines rejected across all files
    pub lines_rejected: usize,
}

/// Data files in a directory with the configured extension, sorted by name
pub fn data_files(dir: &Path, extension: &str) -> StorageResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(extension))
        .collect();
    files.sort();
    Ok(files)
}

/// Ingest a single data file
///
/// Returns `(rows inserted, lines rejected)`.
///
/// Files whose name does not encode position and filter are an error.
pub fn ingest_file(
    path: &Path,
    parser: &LogParser,
    store: &mut MeasurementStore,
    config: &IngestConfig,
) -> StorageResult<(usize, usize)> {
    let meta = parser.parse_file_name(path)?;
    let parsed = parser.parse_file(path)?;
    let rejected = parsed.rejected.len();

    if parsed.has_rejects() {
        tracing::warn!("Bad format for {} lines in {:?}", rejected, path);
        if config.rewrite_bad_files {
            rewrite_without_rejects(path, &parsed)?;
        }
    }

    let measurements: Vec<Measurement> = parsed
        .readings
        .into_iter()
        .map(|r| Measurement::from_reading(r, meta.position, meta.filter_name.clone()))
        .collect();

    let inserted = store.insert_batch(&measurements)?;
    Ok((inserted, rejected))
}

/// Ingest every data file of a directory into the store
pub fn ingest_directory(
    dir: &Path,
    store: &mut MeasurementStore,
    config: &IngestConfig,
) -> StorageResult<IngestReport> {
    let parser = LogParser::new(&config.extension)?;
    let files = data_files(dir, &config.extension)?;

    let mut report = IngestReport {
        files_seen: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        tracing::warn!("No data files available in {:?}", dir);
        return Ok(report);
    }
    tracing::info!("{} data files found", files.len());

    for path in files {
        tracing::info!("Working on data file {:?}", path);

        match ingest_file(&path, &parser, store, config) {
            Ok((0, rejected)) => {
                tracing::warn!("No valid rows in {:?}, nothing inserted", path);
                report.lines_rejected += rejected;
                report.files_skipped.push(path);
            }
            Ok((inserted, rejected)) => {
                report.rows_inserted += inserted;
                report.lines_rejected += rejected;
                report.files_ingested += 1;
            }
            Err(crate::storage::StorageError::InvalidFileName(p)) => {
                tracing::warn!("Non valid data file name {:?}, skipping", p);
                report.files_skipped.push(path);
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        "Ingested {} rows from {}/{} files ({} lines rejected)",
        report.rows_inserted,
        report.files_ingested,
        report.files_seen,
        report.lines_rejected
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Query, QueryExecutor, TimeSelection};
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_ingest_directory() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "abr2020pos2_V.dat",
            "30/04/2020 22:00:00  0  0.950000  21.100000\n01/05/2020 03:02:05  0  0.819527  20.402396\n",
        );
        write(
            dir.path(),
            "may2020pos3_B.dat",
            "02/05/2020 01:00:00  1  0.300000  18.900000\nnot a reading\n",
        );
        write(dir.path(), "readme.dat", "01/05/2020 03:02:05  0  0.5  20.0\n");
        write(dir.path(), "jun2020pos4_R.dat", "header only\n");
        write(dir.path(), "ignored.txt", "whatever");

        let mut store = MeasurementStore::open_in_memory().unwrap();
        let config = IngestConfig::default();
        let report = ingest_directory(dir.path(), &mut store, &config).unwrap();

        assert_eq!(report.files_seen, 4);
        assert_eq!(report.files_ingested, 2);
        assert_eq!(report.rows_inserted, 3);
        assert_eq!(report.lines_rejected, 2);
        assert_eq!(report.files_skipped.len(), 2);
        assert_eq!(store.count().unwrap(), 3);

        // bad lines stripped, original kept
        assert!(dir.path().join("may2020pos3_B.dat.ori").exists());

        let executor = QueryExecutor::new(store);
        let table = executor
            .execute(&Query::new(TimeSelection::dates(&[2020], &[5], &[2])).filters(["B"]))
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].position, 3);
        assert!(table.rows[0].is_moon);
    }

    #[test]
    fn test_ingest_file_counts() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "may2020pos3_B.dat",
            "02/05/2020 01:00:00  1  0.300000  18.900000\nnot a reading\n02/05/2020 01:01:00  1  0.310000  18.950000\n",
        );

        let mut store = MeasurementStore::open_in_memory().unwrap();
        let parser = LogParser::new("dat").unwrap();
        let config = IngestConfig {
            rewrite_bad_files: false,
            ..Default::default()
        };
        let (inserted, rejected) = ingest_file(
            &dir.path().join("may2020pos3_B.dat"),
            &parser,
            &mut store,
            &config,
        )
        .unwrap();

        assert_eq!((inserted, rejected), (2, 1));
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_rewrite_disabled_leaves_file() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "may2020pos3_B.dat",
            "02/05/2020 01:00:00  1  0.300000  18.900000\nnot a reading\n",
        );

        let mut store = MeasurementStore::open_in_memory().unwrap();
        let config = IngestConfig {
            rewrite_bad_files: false,
            ..Default::default()
        };
        ingest_directory(dir.path(), &mut store, &config).unwrap();
        assert!(!dir.path().join("may2020pos3_B.dat.ori").exists());
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        let mut store = MeasurementStore::open_in_memory().unwrap();
        let report = ingest_directory(dir.path(), &mut store, &IngestConfig::default()).unwrap();
        assert_eq!(report, IngestReport::default());
    }

    #[test]
    fn test_data_files_sorted() {
        let dir = tempdir().unwrap();
        write(dir.path(), "may2020pos1_V.dat", "");
        write(dir.path(), "abr2020pos1_V.dat", "");
        let files = data_files(dir.path(), "dat").unwrap();
        assert_eq!(files[0].file_name().unwrap(), "abr2020pos1_V.dat");
    }
}
