//! # Astmon
//!
//! Sky-quality monitor: ingest photometric sky-brightness measurements from
//! ground stations, select subsets by time, position and filter, and classify
//! each night as bad, good or excellent.
//!
//! ## Modules
//!
//! - [`storage`]: SQLite measurement store and core data types
//! - [`query`]: time selection resolution, predicates, execution, classification
//! - [`ingest`]: instrument log parsing and directory loading
//! - [`report`]: classified tables and their writers
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use astmon::query::{Query, QueryExecutor, TimeSelection};
//! use astmon::report::ClassifiedTable;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = QueryExecutor::open(Path::new("astmonDB.db"))?;
//!
//!     // May 2020 at position 2, V filter
//!     let query = Query::new(TimeSelection::year_months(&[2020], &[5]))
//!         .positions([2])
//!         .filters(["V"]);
//!
//!     let table = executor.execute(&query)?;
//!     let classified = ClassifiedTable::from_measurements(&table.rows)?;
//!     println!("{} measurements", classified.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod ingest;
pub mod query;
pub mod report;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    Measurement, MeasurementStore, Reading, StorageError, StorageResult, TimeInterval,
};

pub use query::{
    classify, resolve, Category, Query, QueryError, QueryExecutor, QueryResult,
    SelectionPredicate, SelectionRequest, TimeSelection,
};

pub use ingest::{ingest_directory, IngestReport};

pub use report::{ClassifiedTable, OutputFormat};

pub use config::{Config, ConfigError, IngestConfig, LoggingConfig, StoreConfig};
