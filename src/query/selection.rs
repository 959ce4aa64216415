//! Time Selection and Interval Resolution
//!
//! A caller describes *when* loosely: an explicit period, some combination of
//! years/months/days, or nothing at all. [`TimeSelection`] is the closed set of
//! shapes that description can take, and [`resolve`] turns a selection into the
//! ordered list of inclusive intervals the store is filtered with.
//!
//! # Precedence
//!
//! ```text
//! explicit period present      → ExplicitPeriod   (years/months/days ignored)
//! any of years/months/days set → Components
//! otherwise                    → Empty            (no time restriction)
//! ```
//!
//! Precedence is applied once, when a [`SelectionRequest`] is converted into a
//! [`TimeSelection`]; the resolver only ever sees one shape.

use crate::query::error::{QueryError, QueryResult};
use crate::storage::{TimeInterval, INTERVAL_FORMAT};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Literal formats accepted for explicit period bounds
const PERIOD_FORMATS: [&str; 2] = [INTERVAL_FORMAT, "%Y-%m-%dT%H:%M:%S"];

/// Date-only literal format (resolved to midnight)
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Loosely specified time selection, as it arrives from a caller
///
/// Every field is optional. Convert with [`TimeSelection::try_from`] to apply
/// the precedence rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(default)]
    pub months: Vec<u32>,
    #[serde(default)]
    pub days: Vec<u32>,
}

/// Years, months and days paired by position
///
/// An empty sequence means the component was not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSelection {
    pub years: Vec<i32>,
    pub months: Vec<u32>,
    pub days: Vec<u32>,
}

impl ComponentSelection {
    pub fn is_empty(&self) -> bool {
        self.years.is_empty() && self.months.is_empty() && self.days.is_empty()
    }
}

/// One of the three mutually exclusive time selection shapes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeSelection {
    /// A single literal interval
    ExplicitPeriod { start: String, end: String },
    /// Positionally paired years/months/days
    Components(ComponentSelection),
    /// No temporal restriction
    #[default]
    Empty,
}

impl TimeSelection {
    /// Select one literal period
    pub fn period(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::ExplicitPeriod {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Select whole years
    pub fn years(years: &[i32]) -> Self {
        Self::components(years, &[], &[])
    }

    /// Select whole months, pairing `years[i]` with `months[i]`
    pub fn year_months(years: &[i32], months: &[u32]) -> Self {
        Self::components(years, months, &[])
    }

    /// Select single days, pairing `years[i]`, `months[i]` and `days[i]`
    pub fn dates(years: &[i32], months: &[u32], days: &[u32]) -> Self {
        Self::components(years, months, days)
    }

    /// Select by components; all-empty collapses to [`TimeSelection::Empty`]
    pub fn components(years: &[i32], months: &[u32], days: &[u32]) -> Self {
        let selection = ComponentSelection {
            years: years.to_vec(),
            months: months.to_vec(),
            days: days.to_vec(),
        };
        if selection.is_empty() {
            Self::Empty
        } else {
            Self::Components(selection)
        }
    }

    /// Resolve into inclusive time intervals
    pub fn resolve(&self) -> QueryResult<Vec<TimeInterval>> {
        resolve(self)
    }
}

impl TryFrom<SelectionRequest> for TimeSelection {
    type Error = QueryError;

    fn try_from(request: SelectionRequest) -> QueryResult<Self> {
        match (request.start, request.end) {
            (Some(start), Some(end)) => Ok(Self::ExplicitPeriod { start, end }),
            (Some(_), None) => Err(QueryError::Validation(
                "period start given without period end".to_string(),
            )),
            (None, Some(_)) => Err(QueryError::Validation(
                "period end given without period start".to_string(),
            )),
            (None, None) => Ok(Self::components(
                &request.years,
                &request.months,
                &request.days,
            )),
        }
    }
}

/// Resolve a time selection into an ordered list of inclusive intervals
///
/// - `ExplicitPeriod` yields exactly one interval from its literal bounds.
/// - `Empty` yields no intervals, meaning "no temporal restriction".
/// - `Components` yields one interval per position across the supplied
///   sequences: whole years, whole months (leap-aware) or single days.
///
/// Sequences of unequal length are paired by index and truncated to the
/// shortest supplied one: `years=[2020, 2021], months=[1]` resolves to the
/// single interval for January 2020. Unsupplied sequences do not take part
/// in the pairing.
///
/// Output order follows input order; overlapping or repeated intervals are
/// neither merged nor deduplicated.
///
/// # Errors
/// `QueryError::Validation` for days without months, months without years,
/// malformed or reversed period bounds, and out-of-range months or days.
pub fn resolve(selection: &TimeSelection) -> QueryResult<Vec<TimeInterval>> {
    match selection {
        TimeSelection::ExplicitPeriod { start, end } => {
            let start_dt = parse_bound(start)?;
            let end_dt = parse_bound(end)?;
            let interval = TimeInterval::try_new(start_dt, end_dt).ok_or_else(|| {
                QueryError::Validation(format!("period start '{start}' is after end '{end}'"))
            })?;
            Ok(vec![interval])
        }
        TimeSelection::Empty => Ok(Vec::new()),
        TimeSelection::Components(components) => resolve_components(components),
    }
}

fn resolve_components(c: &ComponentSelection) -> QueryResult<Vec<TimeInterval>> {
    let has_years = !c.years.is_empty();
    let has_months = !c.months.is_empty();
    let has_days = !c.days.is_empty();

    match (has_years, has_months, has_days) {
        (true, true, true) => c
            .years
            .iter()
            .zip(&c.months)
            .zip(&c.days)
            .map(|((&y, &m), &d)| {
                check_month(m)?;
                TimeInterval::day(y, m, d).ok_or_else(|| {
                    QueryError::Validation(format!("day {d} does not exist in {y}-{m:02}"))
                })
            })
            .collect(),
        (true, true, false) => c
            .years
            .iter()
            .zip(&c.months)
            .map(|(&y, &m)| {
                check_month(m)?;
                TimeInterval::month(y, m)
                    .ok_or_else(|| QueryError::Validation(format!("year {y} out of range")))
            })
            .collect(),
        (true, false, false) => c
            .years
            .iter()
            .map(|&y| {
                TimeInterval::year(y)
                    .ok_or_else(|| QueryError::Validation(format!("year {y} out of range")))
            })
            .collect(),
        (false, false, false) => Ok(Vec::new()),
        (true, false, true) => Err(QueryError::Validation(
            "days given without months".to_string(),
        )),
        (false, _, _) => Err(QueryError::Validation(
            "months or days given without years".to_string(),
        )),
    }
}

fn check_month(month: u32) -> QueryResult<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(QueryError::Validation(format!(
            "month {month} is outside 1..=12"
        )))
    }
}

fn parse_bound(literal: &str) -> QueryResult<NaiveDateTime> {
    let literal = literal.trim();

    for fmt in PERIOD_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(literal, fmt) {
            return Ok(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(literal, DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    Err(QueryError::Validation(format!(
        "malformed period bound '{literal}', expected YYYY-MM-DD[ hh:mm:ss]"
    )))
}

/// Parse a month or day component, accepting `"5"` and `"05"` alike
pub fn parse_component(value: &str) -> QueryResult<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| QueryError::Validation(format!("'{value}' is not a month or day number")))
}
