//! Query error types
//!
//! Defines all error conditions that can occur while resolving a selection,
//! querying the store and classifying the result.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Unsupported selection shape or malformed interval bounds
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store could not be opened or read
    #[error("Store error: {0}")]
    Store(String),

    /// Store table lacks columns the query needs
    #[error("Schema mismatch: missing columns {missing:?}")]
    SchemaMismatch { missing: Vec<String> },

    /// A record lacks a required field (NULL in the store, or no
    /// `photo_night` at classification)
    #[error("Missing field '{field}' on record {row}")]
    MissingField { field: &'static str, row: usize },
}

impl QueryError {
    /// True for rejected selections (no store access happened)
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// True for classification failures on incomplete records
    pub fn is_missing_field(&self) -> bool {
        matches!(self, Self::MissingField { .. })
    }
}

impl From<crate::storage::StorageError> for QueryError {
    fn from(err: crate::storage::StorageError) -> Self {
        match err {
            crate::storage::StorageError::NullColumn { column, row } => {
                QueryError::MissingField { field: column, row }
            }
            other => QueryError::Store(other.to_string()),
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::MissingField {
            field: "photo_night",
            row: 4,
        };
        assert_eq!(err.to_string(), "Missing field 'photo_night' on record 4");
        assert!(err.is_missing_field());

        let err = QueryError::Validation("days given without months".to_string());
        assert!(err.is_validation());
    }

    #[test]
    fn test_storage_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: QueryError = crate::storage::StorageError::from(io).into();
        assert!(matches!(err, QueryError::Store(_)));

        let err: QueryError = crate::storage::StorageError::NullColumn {
            column: "is_moon",
            row: 2,
        }
        .into();
        assert!(matches!(
            err,
            QueryError::MissingField { field: "is_moon", row: 2 }
        ));
    }
}
