//! Measurement Store - SQLite table of sky-brightness measurements
//!
//! A single append-only `measurement` table. Every value that reaches SQL goes
//! through a bound parameter, both on insert and on select.
//!
//! # Schema
//!
//! ```text
//! measurement(datetime_obs INTEGER, is_moon INTEGER, photo_night REAL,
//!             sky_bright REAL, position INTEGER, filter_name TEXT)
//! ```

use crate::storage::{Measurement, StorageError, StorageResult};
use rusqlite::types::{FromSql, Value};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};

/// Table name in the store
pub const MEASUREMENT_TABLE: &str = "measurement";

/// Columns the query layer relies on, in select order
pub const MEASUREMENT_COLUMNS: [&str; 6] = [
    "datetime_obs",
    "is_moon",
    "photo_night",
    "sky_bright",
    "position",
    "filter_name",
];

/// A parameterised `WHERE` fragment
///
/// `clause` holds only `?` placeholders; `params` holds the values in
/// placeholder order. A `None` clause selects every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFilter {
    pub clause: Option<String>,
    pub params: Vec<Value>,
}

/// SQLite-backed measurement store
pub struct MeasurementStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl MeasurementStore {
    /// Create the store file and its table
    ///
    /// With `overwrite`, an existing file is deleted first. Otherwise an
    /// existing store is opened and left untouched.
    pub fn create(path: &Path, overwrite: bool) -> StorageResult<Self> {
        if path.exists() {
            if overwrite {
                tracing::info!("Removing existing database {:?}", path);
                std::fs::remove_file(path)?;
            } else {
                tracing::info!("Database {:?} exists, reusing it", path);
            }
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;

        let mut store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Open an existing store for reading and appending
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    /// Open an existing store without write access
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        Self::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    fn open_with_flags(path: &Path, flags: OpenFlags) -> StorageResult<Self> {
        let conn = Connection::open_with_flags(path, flags)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory store with the schema created
    pub fn open_in_memory() -> StorageResult<Self> {
        let mut store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&mut self) -> StorageResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS measurement (
                datetime_obs INTEGER,
                is_moon INTEGER,
                photo_night REAL,
                sky_bright REAL,
                position INTEGER,
                filter_name TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_measurement_time ON measurement(datetime_obs)",
            [],
        )?;

        Ok(())
    }

    /// Insert measurements in a single transaction
    ///
    /// Returns the number of rows written.
    pub fn insert_batch(&mut self, measurements: &[Measurement]) -> StorageResult<usize> {
        if measurements.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO measurement
                 (datetime_obs, is_moon, photo_night, sky_bright, position, filter_name)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?;

            for m in measurements {
                stmt.execute(params![
                    m.timestamp,
                    m.is_moon as i64,
                    m.photo_night,
                    m.sky_bright,
                    m.position,
                    m.filter_name,
                ])?;
            }
        }
        tx.commit()?;

        Ok(measurements.len())
    }

    /// Select every row matching a parameterised filter, in store order
    ///
    /// `photo_night` is the only nullable column; a NULL anywhere else fails
    /// the select with [`StorageError::NullColumn`].
    pub fn select_where(&self, filter: &SqlFilter) -> StorageResult<Vec<Measurement>> {
        let mut sql = format!(
            "SELECT {} FROM {}",
            MEASUREMENT_COLUMNS.join(", "),
            MEASUREMENT_TABLE
        );
        if let Some(clause) = &filter.clause {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(filter.params.iter()))?;

        let mut measurements = Vec::new();
        while let Some(row) = rows.next()? {
            measurements.push(row_to_measurement(row, measurements.len())?);
        }
        Ok(measurements)
    }

    /// Columns of [`MEASUREMENT_COLUMNS`] absent from the table
    ///
    /// Every column is reported missing when the table itself does not exist.
    pub fn missing_columns(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(measurement)")?;
        let present: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<_, _>>()?;

        Ok(MEASUREMENT_COLUMNS
            .iter()
            .filter(|col| !present.iter().any(|p| p == *col))
            .map(|col| col.to_string())
            .collect())
    }

    /// Number of stored rows
    pub fn count(&self) -> StorageResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM measurement", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Earliest and latest `datetime_obs`, None for an empty store
    pub fn time_bounds(&self) -> StorageResult<Option<(i64, i64)>> {
        let bounds: (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(datetime_obs), MAX(datetime_obs) FROM measurement",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(match bounds {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        })
    }

    /// Database file path, None for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn row_to_measurement(row: &Row<'_>, index: usize) -> StorageResult<Measurement> {
    Ok(Measurement {
        timestamp: required(row, 0, index)?,
        is_moon: required::<i64>(row, 1, index)? != 0,
        photo_night: row.get(2)?,
        sky_bright: required(row, 3, index)?,
        position: required(row, 4, index)?,
        filter_name: required(row, 5, index)?,
    })
}

fn required<T: FromSql>(row: &Row<'_>, column: usize, index: usize) -> StorageResult<T> {
    row.get::<_, Option<T>>(column)?
        .ok_or(StorageError::NullColumn {
            column: MEASUREMENT_COLUMNS[column],
            row: index,
        })
}
