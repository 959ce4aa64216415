//! Instrument log parsing
//!
//! Decodes the fixed-width text logs written by the sky-quality photometers:
//!
//! ```text
//! 01/05/2020 03:02:05      0      0.819527      20.402396
//! date (day first) time   moon   photo_night   sky_bright
//! ```
//!
//! and the file names that carry the station metadata (`abr2020pos2_V.dat`:
//! month tag, year, position, filter).

use crate::storage::{Reading, StorageError, StorageResult};
use chrono::NaiveDateTime;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Day-first timestamp layout used by the instrument
const LOG_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Station metadata encoded in a data file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileName {
    /// Three-letter month tag as written by the station (e.g. `abr`)
    pub month_tag: String,
    pub year: i32,
    pub position: i64,
    pub filter_name: String,
}

/// Result of parsing one log file
#[derive(Debug, Default)]
pub struct ParsedLog {
    /// Decoded readings, in file order
    pub readings: Vec<Reading>,
    /// Matched text of every accepted line
    pub accepted_lines: Vec<String>,
    /// Rejected lines as (1-based line number, raw text)
    pub rejected: Vec<(usize, String)>,
}

impl ParsedLog {
    pub fn has_rejects(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// Compiled line and file-name patterns
pub struct LogParser {
    line: Regex,
    file_name: Regex,
}

impl LogParser {
    /// Create a parser for data files with the given extension (e.g. `dat`)
    pub fn new(extension: &str) -> StorageResult<Self> {
        let line = Regex::new(
            r"(\d{2}/\d{2}/\d{4})\s+(\d{2}:\d{2}:\d{2})\s+(\d)\s+(\d\.\d+)\s+(\d+\.\d+)",
        )
        .map_err(|e| StorageError::Config(e.to_string()))?;

        let file_name = Regex::new(&format!(
            r"^(\w{{3}})(\d{{4}})pos(\d)_(\w)\.{}$",
            regex::escape(extension)
        ))
        .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self { line, file_name })
    }

    /// Extract position and filter from a data file path
    pub fn parse_file_name(&self, path: &Path) -> StorageResult<DataFileName> {
        let invalid = || StorageError::InvalidFileName(path.to_path_buf());

        let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
        let caps = self.file_name.captures(name).ok_or_else(invalid)?;

        Ok(DataFileName {
            month_tag: caps[1].to_string(),
            year: caps[2].parse().map_err(|_| invalid())?,
            position: caps[3].parse().map_err(|_| invalid())?,
            filter_name: caps[4].to_string(),
        })
    }

    /// Decode one line, None if it does not have the expected shape
    pub fn parse_line(&self, line: &str) -> Option<(Reading, String)> {
        let caps = self.line.captures(line)?;

        let datetime =
            NaiveDateTime::parse_from_str(&format!("{} {}", &caps[1], &caps[2]), LOG_DATETIME_FORMAT)
                .ok()?;
        let is_moon = &caps[3] != "0";
        let photo_night: f64 = caps[4].parse().ok()?;
        let sky_bright: f64 = caps[5].parse().ok()?;

        let reading = Reading {
            timestamp: datetime.and_utc().timestamp(),
            is_moon,
            photo_night: Some(photo_night),
            sky_bright,
        };
        Some((reading, caps[0].to_string()))
    }

    /// Decode log text; blank lines are ignored, malformed lines collected
    pub fn parse_str(&self, content: &str) -> ParsedLog {
        let mut parsed = ParsedLog::default();

        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match self.parse_line(line) {
                Some((reading, text)) => {
                    parsed.readings.push(reading);
                    parsed.accepted_lines.push(text);
                }
                None => parsed.rejected.push((idx + 1, line.to_string())),
            }
        }

        parsed
    }

    /// Read and decode a log file
    pub fn parse_file(&self, path: &Path) -> StorageResult<ParsedLog> {
        let content = std::fs::read_to_string(path)?;
        let parsed = self.parse_str(&content);

        for (line, text) in &parsed.rejected {
            tracing::warn!("Bad line {} in {:?}: '{}'", line, path, text);
        }

        Ok(parsed)
    }
}

/// Keep only the accepted lines of a log file
///
/// The original file is renamed to `<name>.ori` and a new file with the
/// accepted lines is written in its place. Returns the backup path.
pub fn rewrite_without_rejects(path: &Path, parsed: &ParsedLog) -> StorageResult<PathBuf> {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".ori");
    let backup = PathBuf::from(backup);

    std::fs::rename(path, &backup)?;
    std::fs::write(path, parsed.accepted_lines.join("\n"))?;

    tracing::info!(
        "Rewrote {:?} without {} bad lines (original kept as {:?})",
        path,
        parsed.rejected.len(),
        backup
    );
    Ok(backup)
}

/// Parse a standalone reading file (no file-name metadata needed)
pub fn parse_readings(path: &Path) -> StorageResult<Vec<Reading>> {
    let parser = LogParser::new("dat")?;
    Ok(parser.parse_file(path)?.readings)
}
