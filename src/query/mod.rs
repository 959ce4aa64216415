//! Astmon Query Engine
//!
//! Turns a loose selection into rows and labels:
//!
//! - **Selection**: time selection shapes and the interval resolver
//! - **Predicate**: intervals + position set + filter set → one predicate
//! - **Executor**: run the predicate against the measurement store
//! - **Classify**: bad / good / excellent from `photo_night`
//!
//! # Examples
//!
//! ```rust,ignore
//! use astmon::query::{Query, QueryExecutor, TimeSelection};
//!
//! // February 2020 at positions 3 and 5, V filter only
//! let query = Query::new(TimeSelection::year_months(&[2020], &[2]))
//!     .positions([3, 5])
//!     .filters(["V"]);
//!
//! let table = executor.execute(&query)?;
//! let categories = table.categories()?;
//! ```

mod classify;
mod error;
mod executor;
mod predicate;
mod selection;

pub use classify::{classify, Category, PhotoNight, EXCELLENT_THRESHOLD, GOOD_THRESHOLD};
pub use error::{QueryError, QueryResult};
pub use executor::{query, MeasurementTable, Query, QueryExecutor};
pub use predicate::{build, SelectionPredicate};
pub use selection::{parse_component, resolve, ComponentSelection, SelectionRequest, TimeSelection};
