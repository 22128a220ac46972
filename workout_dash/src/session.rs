//! Explicit dashboard state and the pure function that renders it.
//!
//! Every interaction (a new upload, a changed date selection, another
//! granularity) produces a new [`DashboardState`]; [`render`] turns it into a
//! [`View`] from scratch without looking at any earlier result.

use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use chrono::{NaiveDate, Weekday};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    aggregate::{aggregate_selection, AggregateError},
    data::{AggregateResult, DateRange},
    defaults::{DEFAULT_GRANULARITY, DEFAULT_WEEK_START, UPLOAD_PROMPT},
    filter::{compile_filters, matches_any_filter, InvalidPattern},
    ingest::{self, IngestError},
};

/// Raw bytes of an uploaded workout log.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Upload {
        Upload {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads the upload from a file, or from stdin for `-`.
    pub fn from_path(path: &Path) -> io::Result<Upload> {
        if path == Path::new("-") {
            let mut bytes = Vec::new();
            io::stdin().read_to_end(&mut bytes)?;
            return Ok(Upload::new("stdin", bytes));
        }
        Ok(Upload::new(path.display().to_string(), fs::read(path)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub upload: Option<Upload>,
    /// Dates picked so far; only a pair of them restricts the range.
    pub selection: Vec<NaiveDate>,
    /// Raw granularity selector, one of `Day`, `Week` or `Month`.
    pub granularity: String,
    /// Workout type patterns; empty keeps every type.
    pub workout_types: Vec<String>,
    pub week_start: Weekday,
}

impl Default for DashboardState {
    fn default() -> Self {
        DashboardState {
            upload: None,
            selection: Vec::new(),
            granularity: DEFAULT_GRANULARITY.to_string(),
            workout_types: Vec::new(),
            week_start: DEFAULT_WEEK_START,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DashError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Filter(#[from] InvalidPattern),
}

/// Everything a rendering layer needs to draw the charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub source: String,
    /// Workouts with a valid date, before any filtering.
    pub total_records: usize,
    /// Rows dropped for an unparseable date.
    pub rejected: usize,
    /// First and last day present in the upload.
    pub extent: Option<DateRange>,
    /// Range the tables were restricted to, if any.
    pub range: Option<DateRange>,
    pub result: AggregateResult,
}

#[derive(Debug)]
pub enum View {
    /// Nothing uploaded yet
    Prompt(&'static str),
    Error(DashError),
    Charts(Dashboard),
}

pub fn render(state: &DashboardState) -> View {
    let Some(upload) = &state.upload else {
        return View::Prompt(UPLOAD_PROMPT);
    };
    match build_dashboard(upload, state) {
        Ok(dashboard) => View::Charts(dashboard),
        Err(e) => View::Error(e),
    }
}

fn build_dashboard(upload: &Upload, state: &DashboardState) -> Result<Dashboard, DashError> {
    let filters = compile_filters(&state.workout_types)?;
    let ingested = ingest::parse(upload.bytes.as_slice())?;

    let total_records = ingested.records.len();
    let extent = DateRange::extent(ingested.records.iter().map(|r| r.date));

    let records = ingested
        .records
        .into_iter()
        .filter(|r| matches_any_filter(&r.workout_type, &filters))
        .collect_vec();

    let result = aggregate_selection(
        &records,
        &state.selection,
        &state.granularity,
        state.week_start,
    )?;

    Ok(Dashboard {
        source: upload.name.clone(),
        total_records,
        rejected: ingested.rejected,
        extent,
        range: DateRange::from_selection(&state.selection),
        result,
    })
}
