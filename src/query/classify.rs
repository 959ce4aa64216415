//! Night-quality classification from `photo_night`
//!
//! | photo_night          | category    |
//! |----------------------|-------------|
//! | `< 0.5`              | bad         |
//! | `>= 0.5` and `< 0.9` | good        |
//! | `>= 0.9`             | excellent   |
//!
//! Values outside `[0, 1]` are not clamped. NaN satisfies none of the rules and
//! is labelled `unclassified`.

use crate::query::error::{QueryError, QueryResult};
use crate::storage::{Measurement, Reading};
use serde::{Deserialize, Serialize};

/// Upper bound (exclusive) of a bad night
pub const GOOD_THRESHOLD: f64 = 0.5;

/// Lower bound (inclusive) of an excellent night
pub const EXCELLENT_THRESHOLD: f64 = 0.9;

/// Observing-night quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Bad,
    Good,
    Excellent,
    Unclassified,
}

impl Category {
    /// Get all categories for iteration
    pub fn all() -> &'static [Category] {
        &[
            Category::Bad,
            Category::Good,
            Category::Excellent,
            Category::Unclassified,
        ]
    }

    /// Label a single photo_night value
    ///
    /// Rules are applied in order and a later match overwrites an earlier one.
    pub fn from_photo_night(value: f64) -> Self {
        let mut category = Category::Unclassified;
        if value < GOOD_THRESHOLD {
            category = Category::Bad;
        }
        if (GOOD_THRESHOLD..EXCELLENT_THRESHOLD).contains(&value) {
            category = Category::Good;
        }
        if value >= EXCELLENT_THRESHOLD {
            category = Category::Excellent;
        }
        category
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Bad => write!(f, "bad"),
            Category::Good => write!(f, "good"),
            Category::Excellent => write!(f, "excellent"),
            Category::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// Anything carrying a `photo_night` field
pub trait PhotoNight {
    fn photo_night(&self) -> Option<f64>;
}

impl PhotoNight for Measurement {
    fn photo_night(&self) -> Option<f64> {
        self.photo_night
    }
}

impl PhotoNight for Reading {
    fn photo_night(&self) -> Option<f64> {
        self.photo_night
    }
}

impl PhotoNight for Option<f64> {
    fn photo_night(&self) -> Option<f64> {
        *self
    }
}

/// Label every record, one category per record in input order
///
/// # Errors
/// `QueryError::MissingField` for the first record without `photo_night`;
/// no partial result is returned.
pub fn classify<T: PhotoNight>(records: &[T]) -> QueryResult<Vec<Category>> {
    records
        .iter()
        .enumerate()
        .map(|(row, record)| {
            record
                .photo_night()
                .map(Category::from_photo_night)
                .ok_or(QueryError::MissingField {
                    field: "photo_night",
                    row,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(Category::from_photo_night(0.49), Category::Bad);
        assert_eq!(Category::from_photo_night(0.5), Category::Good);
        assert_eq!(Category::from_photo_night(0.89), Category::Good);
        assert_eq!(Category::from_photo_night(0.9), Category::Excellent);
        assert_eq!(Category::from_photo_night(1.0), Category::Excellent);
    }

    #[test]
    fn test_out_of_range_values_fall_through() {
        assert_eq!(Category::from_photo_night(-0.3), Category::Bad);
        assert_eq!(Category::from_photo_night(1.7), Category::Excellent);
        assert_eq!(Category::from_photo_night(f64::NAN), Category::Unclassified);
    }

    #[test]
    fn test_classify_preserves_order() {
        let records = vec![
            Measurement::new(1, 0.95, 21.0, 1, "V"),
            Measurement::new(2, 0.1, 18.0, 1, "V"),
            Measurement::new(3, 0.6, 20.0, 1, "V"),
        ];
        let categories = classify(&records).unwrap();
        assert_eq!(
            categories,
            vec![Category::Excellent, Category::Bad, Category::Good]
        );
    }

    #[test]
    fn test_classify_is_idempotent() {
        let records = vec![
            Measurement::new(1, 0.49, 19.0, 2, "B"),
            Measurement::new(2, 0.9, 21.0, 2, "B"),
        ];
        assert_eq!(classify(&records).unwrap(), classify(&records).unwrap());
    }

    #[test]
    fn test_missing_photo_night_aborts_batch() {
        let mut broken = Measurement::new(2, 0.7, 20.0, 1, "V");
        broken.photo_night = None;
        let records = vec![Measurement::new(1, 0.7, 20.0, 1, "V"), broken];

        let err = classify(&records).unwrap_err();
        assert!(matches!(
            err,
            QueryError::MissingField {
                field: "photo_night",
                row: 1
            }
        ));
    }

    #[test]
    fn test_classify_raw_values() {
        let values = [Some(0.2), Some(0.7)];
        assert_eq!(
            classify(&values).unwrap(),
            vec![Category::Bad, Category::Good]
        );
        assert!(classify::<Option<f64>>(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(
            serde_json::to_string(&Category::Excellent).unwrap(),
            "\"excellent\""
        );
        assert_eq!(Category::Unclassified.to_string(), "unclassified");
    }
}
