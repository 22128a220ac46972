use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::bucket::Granularity;

/// A single validated row of the workout log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutRecord {
    pub date: NaiveDate,
    pub workout_type: String,
    pub calories: Option<f64>,
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl WorkoutRecord {
    /// Record with only the mandatory fields set.
    pub fn new(date: NaiveDate, workout_type: impl Into<String>) -> Self {
        WorkoutRecord {
            date,
            workout_type: workout_type.into(),
            calories: None,
            avg_hr: None,
            max_hr: None,
            start: None,
            end: None,
        }
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Returns `None` if `start` lies after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<DateRange> {
        (start <= end).then_some(DateRange { start, end })
    }

    /// Interprets the raw bound selection handed over by a date picker.
    ///
    /// Only a selection of exactly two dates is a range. A picker that is still
    /// waiting for its second click hands over a single date, which means "no
    /// filter yet". Bounds picked in reverse order are swapped.
    pub fn from_selection(selection: &[NaiveDate]) -> Option<DateRange> {
        match selection {
            [a, b] => Some(DateRange {
                start: *a.min(b),
                end: *a.max(b),
            }),
            _ => None,
        }
    }

    /// Smallest range covering all given dates.
    pub fn extent(dates: impl IntoIterator<Item = NaiveDate>) -> Option<DateRange> {
        dates.into_iter().fold(None, |acc, date| match acc {
            None => Some(DateRange {
                start: date,
                end: date,
            }),
            Some(r) => Some(DateRange {
                start: r.start.min(date),
                end: r.end.max(date),
            }),
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} – {}", self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeRow {
    pub bucket: NaiveDate,
    pub workout_type: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaloriesRow {
    pub bucket: NaiveDate,
    pub workout_type: String,
    pub total: f64,
}

/// Mean heart rates of a bucket. `None` marks a bucket without any reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartRateRow {
    pub bucket: NaiveDate,
    pub workout_type: String,
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
}

/// The three aggregate tables, each sorted by bucket, then workout type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub granularity: Granularity,
    pub volume: Vec<VolumeRow>,
    pub calories: Vec<CaloriesRow>,
    pub heart_rate: Vec<HeartRateRow>,
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.volume.is_empty() && self.calories.is_empty() && self.heart_rate.is_empty()
    }
}
