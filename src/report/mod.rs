//! Classified result tables
//!
//! The hand-off to presentation: one `(timestamp, sky_bright, category)` row
//! per queried record, in query order, plus grouping by category and simple
//! writers (text table, CSV, JSON).

use crate::query::{classify, Category, QueryResult};
use crate::storage::{Measurement, Reading, INTERVAL_FORMAT};
use chrono::DateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// One classified row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRow {
    /// UTC seconds since epoch
    pub timestamp: i64,
    pub sky_bright: f64,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_name: Option<String>,
}

impl ClassifiedRow {
    /// Timestamp as a `YYYY-MM-DD hh:mm:ss` UTC literal
    pub fn datetime(&self) -> String {
        DateTime::from_timestamp(self.timestamp, 0)
            .map(|dt| dt.format(INTERVAL_FORMAT).to_string())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

/// Sky-brightness statistics for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub count: usize,
    pub sky_bright_min: f64,
    pub sky_bright_mean: f64,
    pub sky_bright_max: f64,
}

/// Output formats for classified tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

impl OutputFormat {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(Self::Table),
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Classified rows in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassifiedTable {
    pub rows: Vec<ClassifiedRow>,
}

impl ClassifiedTable {
    /// Classify queried measurements
    ///
    /// Fails as a whole if any record lacks `photo_night`.
    pub fn from_measurements(measurements: &[Measurement]) -> QueryResult<Self> {
        let categories = classify(measurements)?;
        let rows = measurements
            .iter()
            .zip(categories)
            .map(|(m, category)| ClassifiedRow {
                timestamp: m.timestamp,
                sky_bright: m.sky_bright,
                category,
                position: Some(m.position),
                filter_name: Some(m.filter_name.clone()),
            })
            .collect();
        Ok(Self { rows })
    }

    /// Classify raw readings of a single log file
    pub fn from_readings(readings: &[Reading]) -> QueryResult<Self> {
        let categories = classify(readings)?;
        let rows = readings
            .iter()
            .zip(categories)
            .map(|(r, category)| ClassifiedRow {
                timestamp: r.timestamp,
                sky_bright: r.sky_bright,
                category,
                position: None,
                filter_name: None,
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows grouped by category, each group in input order
    pub fn group_by_category(&self) -> BTreeMap<Category, Vec<&ClassifiedRow>> {
        let mut groups: BTreeMap<Category, Vec<&ClassifiedRow>> = BTreeMap::new();
        for row in &self.rows {
            groups.entry(row.category).or_default().push(row);
        }
        groups
    }

    /// Per-category sky-brightness statistics
    pub fn summary(&self) -> BTreeMap<Category, CategorySummary> {
        self.group_by_category()
            .into_iter()
            .map(|(category, rows)| {
                let values: Vec<f64> = rows.iter().map(|r| r.sky_bright).collect();
                let count = values.len();
                let summary = CategorySummary {
                    count,
                    sky_bright_min: values.iter().cloned().fold(f64::INFINITY, f64::min),
                    sky_bright_mean: values.iter().sum::<f64>() / count as f64,
                    sky_bright_max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
                };
                (category, summary)
            })
            .collect()
    }

    /// Write in the requested format
    pub fn write<W: Write>(&self, format: OutputFormat, out: W) -> std::io::Result<()> {
        match format {
            OutputFormat::Table => self.write_table(out),
            OutputFormat::Csv => self.write_csv(out),
            OutputFormat::Json => self.write_json(out),
        }
    }

    /// CSV with a header row
    pub fn write_csv<W: Write>(&self, out: W) -> std::io::Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(["datetime", "sky_bright", "category", "position", "filter_name"])?;
        for row in &self.rows {
            writer.write_record([
                row.datetime(),
                row.sky_bright.to_string(),
                row.category.to_string(),
                row.position.map(|p| p.to_string()).unwrap_or_default(),
                row.filter_name.clone().unwrap_or_default(),
            ])?;
        }
        writer.flush()
    }

    /// JSON object with the rows and the per-category summary
    pub fn write_json<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        let doc = serde_json::json!({
            "rows": self.rows,
            "summary": self.summary(),
        });
        serde_json::to_writer_pretty(&mut out, &doc)?;
        writeln!(out)
    }

    /// Aligned plain-text table followed by category counts
    pub fn write_table<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(
            out,
            "{:<19}  {:>10}  {:<12}  {:>3}  {:<6}",
            "datetime", "sky_bright", "category", "pos", "filter"
        )?;
        for row in &self.rows {
            writeln!(
                out,
                "{:<19}  {:>10.4}  {:<12}  {:>3}  {:<6}",
                row.datetime(),
                row.sky_bright,
                row.category.to_string(),
                row.position.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                row.filter_name.as_deref().unwrap_or("-"),
            )?;
        }
        writeln!(out)?;
        for (category, summary) in self.summary() {
            writeln!(
                out,
                "{:<12} {:>6} rows  sky_bright {:.2} / {:.2} / {:.2}",
                category.to_string(),
                summary.count,
                summary.sky_bright_min,
                summary.sky_bright_mean,
                summary.sky_bright_max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryError;

    fn measurements() -> Vec<Measurement> {
        vec![
            Measurement::new(1_588_302_125, 0.82, 20.0, 2, "V"),
            Measurement::new(1_588_302_185, 0.3, 18.0, 2, "V"),
            Measurement::new(1_588_302_245, 0.91, 21.0, 2, "V"),
            Measurement::new(1_588_302_305, 0.6, 20.5, 2, "V"),
        ]
    }

    #[test]
    fn test_rows_follow_input_order() {
        let table = ClassifiedTable::from_measurements(&measurements()).unwrap();
        let categories: Vec<Category> = table.rows.iter().map(|r| r.category).collect();
        assert_eq!(
            categories,
            vec![Category::Good, Category::Bad, Category::Excellent, Category::Good]
        );
        assert_eq!(table.rows[0].datetime(), "2020-05-01 03:02:05");
    }

    #[test]
    fn test_group_by_category() {
        let table = ClassifiedTable::from_measurements(&measurements()).unwrap();
        let groups = table.group_by_category();
        assert_eq!(groups.len(), 3);
        let good = &groups[&Category::Good];
        assert_eq!(good.len(), 2);
        assert!(good[0].timestamp < good[1].timestamp);
    }

    #[test]
    fn test_summary() {
        let table = ClassifiedTable::from_measurements(&measurements()).unwrap();
        let summary = table.summary();
        let good = &summary[&Category::Good];
        assert_eq!(good.count, 2);
        assert_eq!(good.sky_bright_min, 20.0);
        assert_eq!(good.sky_bright_max, 20.5);
        assert_eq!(good.sky_bright_mean, 20.25);
    }

    #[test]
    fn test_missing_photo_night_fails_whole_table() {
        let mut rows = measurements();
        rows[2].photo_night = None;
        let err = ClassifiedTable::from_measurements(&rows).unwrap_err();
        assert!(matches!(err, QueryError::MissingField { row: 2, .. }));
    }

    #[test]
    fn test_empty_table_writes() {
        let table = ClassifiedTable::default();
        let mut out = Vec::new();
        table.write(OutputFormat::Csv, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "datetime,sky_bright,category,position,filter_name\n"
        );
    }

    #[test]
    fn test_csv_output() {
        let table = ClassifiedTable::from_measurements(&measurements()[..1]).unwrap();
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("2020-05-01 03:02:05,20,good,2,V\n"));
    }

    #[test]
    fn test_json_output() {
        let table = ClassifiedTable::from_measurements(&measurements()).unwrap();
        let mut out = Vec::new();
        table.write(OutputFormat::Json, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["rows"].as_array().unwrap().len(), 4);
        assert_eq!(value["rows"][1]["category"], "bad");
        assert_eq!(value["summary"]["excellent"]["count"], 1);
    }

    #[test]
    fn test_from_readings_has_no_station() {
        let readings = vec![Reading {
            timestamp: 0,
            is_moon: false,
            photo_night: Some(0.95),
            sky_bright: 21.5,
        }];
        let table = ClassifiedTable::from_readings(&readings).unwrap();
        assert_eq!(table.rows[0].position, None);
        assert_eq!(table.rows[0].category, Category::Excellent);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::from_str("CSV"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }
}
