//! Astmon Storage
//!
//! This module provides the persisted side of the system:
//!
//! - **types**: Core data structures (Reading, Measurement, TimeInterval)
//! - **store**: SQLite `measurement` table with parameterised reads and writes
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   .dat file → ingest → Measurement batch → INSERT (one transaction)
//!
//! Read Path:
//!   SelectionPredicate → SqlFilter (placeholders + params) → SELECT → rows
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use astmon::storage::{Measurement, MeasurementStore, SqlFilter};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut store = MeasurementStore::create(Path::new("astmonDB.db"), false)?;
//!     store.insert_batch(&[Measurement::new(1_588_302_125, 0.82, 20.4, 2, "V")])?;
//!
//!     let rows = store.select_where(&SqlFilter::default())?;
//!     println!("{} rows", rows.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use store::{MeasurementStore, SqlFilter, MEASUREMENT_COLUMNS, MEASUREMENT_TABLE};
pub use types::{days_in_month, Measurement, Reading, TimeInterval, INTERVAL_FORMAT};
