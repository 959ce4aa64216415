//! Storage layer error types
//!
//! Defines all errors that can occur while creating, filling or reading the
//! measurement store and while reading instrument logs.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite operation failed
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row holds NULL in a column that must have a value
    #[error("NULL in column '{column}' of row {row}")]
    NullColumn { column: &'static str, row: usize },

    /// Data file name does not carry position and filter
    #[error("Invalid data file name: {0:?}")]
    InvalidFileName(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::InvalidFileName(PathBuf::from("notes.dat"));
        assert_eq!(err.to_string(), "Invalid data file name: \"notes.dat\"");

        let err = StorageError::NullColumn {
            column: "sky_bright",
            row: 3,
        };
        assert_eq!(err.to_string(), "NULL in column 'sky_bright' of row 3");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io(_)));
    }
}
