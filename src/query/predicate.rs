//! Selection Predicate
//!
//! Combines resolved time intervals with optional position and filter sets:
//!
//! ```text
//! (t ∈ I₁ OR t ∈ I₂ OR ...) AND position IN {..} AND filter_name IN {..}
//! ```
//!
//! An empty interval list or an empty set leaves that dimension unrestricted.
//! The predicate can be evaluated in memory ([`SelectionPredicate::matches`])
//! or rendered into a parameterised SQL filter ([`SelectionPredicate::to_sql`]).

use crate::storage::{Measurement, SqlFilter, TimeInterval};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Time, position and filter restrictions for one query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPredicate {
    /// Any-of inclusive intervals; empty means every time
    pub intervals: Vec<TimeInterval>,
    /// Allowed positions; empty means every position
    pub positions: BTreeSet<i64>,
    /// Allowed filter names; empty means every filter
    pub filters: BTreeSet<String>,
}

/// Assemble a selection predicate
///
/// Pure data assembly; empty `positions` or `filters` stay unrestricted.
pub fn build<P, F, S>(intervals: Vec<TimeInterval>, positions: P, filters: F) -> SelectionPredicate
where
    P: IntoIterator<Item = i64>,
    F: IntoIterator<Item = S>,
    S: Into<String>,
{
    SelectionPredicate {
        intervals,
        positions: positions.into_iter().collect(),
        filters: filters.into_iter().map(Into::into).collect(),
    }
}

impl SelectionPredicate {
    /// Predicate that matches every record
    pub fn all() -> Self {
        Self::default()
    }

    /// True when no dimension is restricted
    pub fn is_unrestricted(&self) -> bool {
        self.intervals.is_empty() && self.positions.is_empty() && self.filters.is_empty()
    }

    /// Evaluate against a single measurement
    pub fn matches(&self, m: &Measurement) -> bool {
        let in_time =
            self.intervals.is_empty() || self.intervals.iter().any(|i| i.contains(m.timestamp));
        let at_position = self.positions.is_empty() || self.positions.contains(&m.position);
        let with_filter = self.filters.is_empty() || self.filters.contains(&m.filter_name);

        in_time && at_position && with_filter
    }

    /// Interval bounds as a JSON array of `[start_epoch, end_epoch]` pairs
    fn intervals_json(&self) -> String {
        let pairs: Vec<[i64; 2]> = self
            .intervals
            .iter()
            .map(|i| [i.start_epoch(), i.end_epoch()])
            .collect();
        serde_json::json!(pairs).to_string()
    }

    /// Render as a `WHERE` fragment with bound parameters
    ///
    /// Interval bounds, positions and filter names never appear in the SQL
    /// text; each is a `?` placeholder with its value in `params`.
    pub fn to_sql(&self) -> SqlFilter {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if !self.intervals.is_empty() {
            // One JSON array parameter keeps the expression depth constant
            // however many intervals the selection resolves to.
            clauses.push(INTERVALS_CLAUSE.to_string());
            params.push(Value::Text(self.intervals_json()));
        }

        if !self.positions.is_empty() {
            clauses.push(format!("position IN ({})", placeholders(self.positions.len())));
            params.extend(self.positions.iter().map(|&p| Value::Integer(p)));
        }

        if !self.filters.is_empty() {
            clauses.push(format!("filter_name IN ({})", placeholders(self.filters.len())));
            params.extend(self.filters.iter().map(|f| Value::Text(f.clone())));
        }

        SqlFilter {
            clause: if clauses.is_empty() {
                None
            } else {
                Some(clauses.join(" AND "))
            },
            params,
        }
    }
}

/// Any-of membership over a bound `[[start, end], ...]` array
const INTERVALS_CLAUSE: &str = "EXISTS (SELECT 1 FROM json_each(?) \
     WHERE datetime_obs BETWEEN json_extract(value, '$[0]') AND json_extract(value, '$[1]'))";

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(timestamp: i64, position: i64, filter: &str) -> Measurement {
        Measurement::new(timestamp, 0.7, 20.0, position, filter)
    }

    #[test]
    fn test_empty_sets_are_unrestricted() {
        let predicate = build(Vec::new(), Vec::new(), Vec::<String>::new());
        assert!(predicate.is_unrestricted());
        assert!(predicate.matches(&m(0, 1, "B")));
        assert!(predicate.matches(&m(1_600_000_000, 10, "I")));
        assert_eq!(predicate.to_sql(), SqlFilter::default());
    }

    #[test]
    fn test_position_set_restricts() {
        let predicate = build(Vec::new(), [3, 5], Vec::<String>::new());
        assert!(predicate.matches(&m(0, 3, "V")));
        assert!(predicate.matches(&m(0, 5, "V")));
        assert!(!predicate.matches(&m(0, 4, "V")));
    }

    #[test]
    fn test_filter_set_restricts() {
        let predicate = build(Vec::new(), Vec::new(), ["V", "R"]);
        assert!(predicate.matches(&m(0, 1, "V")));
        assert!(!predicate.matches(&m(0, 1, "B")));
    }

    #[test]
    fn test_intervals_are_or_dimensions_are_and() {
        let jan = TimeInterval::month(2020, 1).unwrap();
        let mar = TimeInterval::month(2020, 3).unwrap();
        let predicate = build(vec![jan, mar], [2], ["V"]);

        let feb_ts = TimeInterval::day(2020, 2, 10).unwrap().start_epoch();
        let mar_ts = mar.end_epoch();

        assert!(predicate.matches(&m(jan.start_epoch(), 2, "V")));
        assert!(predicate.matches(&m(mar_ts, 2, "V")));
        assert!(!predicate.matches(&m(feb_ts, 2, "V")));
        assert!(!predicate.matches(&m(mar_ts, 3, "V")));
        assert!(!predicate.matches(&m(mar_ts, 2, "B")));
    }

    #[test]
    fn test_sql_rendering_uses_placeholders() {
        let day = TimeInterval::day(2020, 5, 1).unwrap();
        let predicate = build(vec![day, day], [5, 3], ["V'; DROP TABLE measurement; --"]);
        let sql = predicate.to_sql();

        assert_eq!(
            sql.clause,
            Some(format!(
                "{INTERVALS_CLAUSE} AND position IN (?, ?) AND filter_name IN (?)"
            ))
        );
        assert_eq!(sql.params.len(), 4);
        assert_eq!(
            sql.params[0],
            Value::Text(format!(
                "[[{0},{1}],[{0},{1}]]",
                day.start_epoch(),
                day.end_epoch()
            ))
        );
        assert_eq!(sql.params[1], Value::Integer(3));
        assert_eq!(sql.params[2], Value::Integer(5));
        assert_eq!(
            sql.params[3],
            Value::Text("V'; DROP TABLE measurement; --".to_string())
        );
    }

    #[test]
    fn test_sql_size_independent_of_interval_count() {
        let one = build(
            vec![TimeInterval::day(2020, 1, 1).unwrap()],
            Vec::new(),
            Vec::<String>::new(),
        );
        let many = build(
            (1..=28)
                .flat_map(|d| (1..=12).map(move |mo| TimeInterval::day(2020, mo, d).unwrap()))
                .collect(),
            Vec::new(),
            Vec::<String>::new(),
        );

        assert_eq!(one.to_sql().clause, many.to_sql().clause);
        assert_eq!(many.to_sql().params.len(), 1);
    }
}
