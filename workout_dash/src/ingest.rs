//! Turns an uploaded workout CSV into validated [`WorkoutRecord`]s.
//!
//! Rows whose `date` cannot be parsed are dropped and counted; every other
//! field is coerced on a best-effort basis and never causes a row to be
//! dropped.

use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use log::{debug, info};

use crate::data::WorkoutRecord;

pub const COLUMN_DATE: &str = "date";
pub const COLUMN_WORKOUT_TYPE: &str = "workout_type";
pub const COLUMN_CALORIES: &str = "calories";
pub const COLUMN_AVG_HR: &str = "avg_hr";
pub const COLUMN_MAX_HR: &str = "max_hr";
pub const COLUMN_START: &str = "start";
pub const COLUMN_END: &str = "end";

/// Calendar date forms, month before day where ambiguous.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Failed to read input")]
    Io(#[from] io::Error),
}

/// Validated records in input order, plus the number of rows dropped for an
/// unparseable date.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub records: Vec<WorkoutRecord>,
    pub rejected: usize,
}

impl Ingested {
    pub fn total_rows(&self) -> usize {
        self.records.len() + self.rejected
    }
}

/// Positions of the known columns in the header row.
struct Columns {
    date: usize,
    workout_type: usize,
    calories: Option<usize>,
    avg_hr: Option<usize>,
    max_hr: Option<usize>,
    start: Option<usize>,
    end: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Columns, IngestError> {
        let position = |name: &str| headers.iter().position(|h| h == name);
        let required = |name: &str| {
            position(name).ok_or_else(|| {
                IngestError::MalformedInput(format!("missing required column '{}'", name))
            })
        };

        Ok(Columns {
            date: required(COLUMN_DATE)?,
            workout_type: required(COLUMN_WORKOUT_TYPE)?,
            calories: position(COLUMN_CALORIES),
            avg_hr: position(COLUMN_AVG_HR),
            max_hr: position(COLUMN_MAX_HR),
            start: position(COLUMN_START),
            end: position(COLUMN_END),
        })
    }
}

fn field(row: &StringRecord, index: Option<usize>) -> Option<&str> {
    index.and_then(|i| row.get(i))
}

/// Parse a workout log from any reader.
pub fn parse<R: Read>(reader: R) -> Result<Ingested, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| IngestError::MalformedInput(e.to_string()))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut records = Vec::new();
    let mut rejected = 0;

    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| IngestError::MalformedInput(e.to_string()))?;

        let raw_date = row.get(columns.date).unwrap_or_default();
        let Some(date) = parse_date(raw_date) else {
            // header is line 1
            debug!("Dropping row {}: cannot parse date '{}'", line + 2, raw_date);
            rejected += 1;
            continue;
        };

        records.push(WorkoutRecord {
            date,
            workout_type: normalize_workout_type(
                row.get(columns.workout_type).unwrap_or_default(),
            ),
            calories: parse_metric(field(&row, columns.calories)).filter(|c| *c >= 0.0),
            avg_hr: parse_metric(field(&row, columns.avg_hr)),
            max_hr: parse_metric(field(&row, columns.max_hr)),
            start: field(&row, columns.start).and_then(parse_datetime),
            end: field(&row, columns.end).and_then(parse_datetime),
        });
    }

    info!(
        "Ingested {} workouts, dropped {} rows with an invalid date",
        records.len(),
        rejected
    );

    Ok(Ingested { records, rejected })
}

pub fn parse_str(input: &str) -> Result<Ingested, IngestError> {
    parse(input.as_bytes())
}

pub fn parse_file(path: &Path) -> Result<Ingested, IngestError> {
    parse(File::open(path)?)
}

/// Trims and title-cases a workout type so that spelling variants collapse
/// onto one category: `" yoga "`, `"YOGA"` and `"Yoga"` all become `"Yoga"`.
///
/// Every run of letters starts upper-case and continues lower-case, so
/// `"hiit-cardio"` becomes `"Hiit-Cardio"`.
pub fn normalize_workout_type(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut in_word = false;
    for c in raw.trim().chars() {
        if c.is_alphabetic() {
            if in_word {
                normalized.extend(c.to_lowercase());
            } else {
                normalized.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            normalized.push(c);
            in_word = false;
        }
    }
    normalized
}

/// Parses a calendar date. Date-time values are accepted and truncated to
/// their date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

/// Parses a timestamp. A bare date is read as midnight of that day.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn parse_metric(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
