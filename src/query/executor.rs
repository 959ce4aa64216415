//! Query Executor
//!
//! Runs a selection against the measurement store:
//! 1. Resolve the time selection into intervals
//! 2. Build the selection predicate
//! 3. Check the store schema and run the parameterised select
//!
//! # Execution Pipeline
//!
//! ```text
//! Query → resolve → build → SqlFilter → SELECT → MeasurementTable
//! ```
//!
//! The store is only read. Failures are returned as-is; nothing is retried.

use crate::query::classify::{classify, Category};
use crate::query::error::{QueryError, QueryResult};
use crate::query::predicate::{self, SelectionPredicate};
use crate::query::selection::TimeSelection;
use crate::storage::{Measurement, MeasurementStore};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A selection over time, positions and filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub selection: TimeSelection,
    pub positions: BTreeSet<i64>,
    pub filters: BTreeSet<String>,
}

impl Query {
    /// Start a query from a time selection
    pub fn new(selection: TimeSelection) -> Self {
        Self {
            selection,
            ..Default::default()
        }
    }

    /// Query every stored measurement
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a set of positions
    pub fn positions(mut self, positions: impl IntoIterator<Item = i64>) -> Self {
        self.positions.extend(positions);
        self
    }

    /// Restrict to a set of filter names
    pub fn filters<S: Into<String>>(mut self, filters: impl IntoIterator<Item = S>) -> Self {
        self.filters.extend(filters.into_iter().map(Into::into));
        self
    }

    /// Resolve the time selection and assemble the predicate
    pub fn predicate(&self) -> QueryResult<SelectionPredicate> {
        let intervals = self.selection.resolve()?;
        Ok(predicate::build(
            intervals,
            self.positions.iter().copied(),
            self.filters.iter().cloned(),
        ))
    }
}

/// Rows returned by a query, in store order
#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    pub rows: Vec<Measurement>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl MeasurementTable {
    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One category per row, in row order
    pub fn categories(&self) -> QueryResult<Vec<Category>> {
        classify(&self.rows)
    }
}

/// Run a predicate against the store
///
/// Returns every matching row with no limit and no ordering beyond the
/// store's own. Zero matches is an empty vector, not an error.
///
/// # Errors
/// `QueryError::SchemaMismatch` when the table lacks a required column,
/// `QueryError::Store` when the read fails.
pub fn query(store: &MeasurementStore, predicate: &SelectionPredicate) -> QueryResult<Vec<Measurement>> {
    let missing = store.missing_columns()?;
    if !missing.is_empty() {
        return Err(QueryError::SchemaMismatch { missing });
    }

    let filter = predicate.to_sql();
    tracing::debug!(
        clause = filter.clause.as_deref().unwrap_or("<all>"),
        params = filter.params.len(),
        "Selecting measurements"
    );

    Ok(store.select_where(&filter)?)
}

/// Query executor
///
/// Holds the store behind a mutex so it can be shared with worker threads.
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<Mutex<MeasurementStore>>,
}

impl QueryExecutor {
    /// Create a new query executor
    pub fn new(store: MeasurementStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Open a store file read-only and wrap it
    pub fn open(path: &Path) -> QueryResult<Self> {
        let store = MeasurementStore::open_read_only(path)?;
        Ok(Self::new(store))
    }

    /// Execute a query on the calling thread
    pub fn execute(&self, query: &Query) -> QueryResult<MeasurementTable> {
        let start = Instant::now();

        let predicate = query.predicate()?;
        tracing::debug!(
            intervals = predicate.intervals.len(),
            positions = predicate.positions.len(),
            filters = predicate.filters.len(),
            "Built selection predicate"
        );

        let rows = {
            let store = self
                .store
                .lock()
                .map_err(|_| QueryError::Store("store lock poisoned".to_string()))?;
            self::query(&store, &predicate)?
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!("Query returned {} rows in {}ms", rows.len(), execution_time_ms);

        Ok(MeasurementTable {
            rows,
            execution_time_ms,
        })
    }

    /// Execute a query on a blocking worker thread
    pub async fn execute_async(&self, query: Query) -> QueryResult<MeasurementTable> {
        let executor = self.clone();
        tokio::task::spawn_blocking(move || executor.execute(&query))
            .await
            .map_err(|e| QueryError::Store(format!("query worker failed: {e}")))?
    }
}
