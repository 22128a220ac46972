use std::fmt::Display;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

use crate::aggregate::AggregateError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "Day",
            Granularity::Week => "Week",
            Granularity::Month => "Month",
        }
    }

    /// Chart title prefix, e.g. "Weekly" in "Weekly Workout Volume".
    pub fn adjective(&self) -> &'static str {
        match self {
            Granularity::Day => "Daily",
            Granularity::Week => "Weekly",
            Granularity::Month => "Monthly",
        }
    }

    /// Label of the bucket column in tables and on chart axes.
    pub fn bucket_label(&self) -> &'static str {
        match self {
            Granularity::Day => "date",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    /// Representative date of the bucket containing `date`.
    ///
    /// Week buckets start on `week_start`, so the key is the latest such day on
    /// or before `date`. `week_start` is ignored for the other granularities.
    pub fn bucket_key(&self, date: NaiveDate, week_start: Weekday) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                let offset = (date.weekday().num_days_from_monday() + 7
                    - week_start.num_days_from_monday())
                    % 7;
                // Weeks reaching below the earliest representable day start there
                date
                    .checked_sub_days(Days::new(offset.into()))
                    .unwrap_or(NaiveDate::MIN)
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Day" => Ok(Granularity::Day),
            "Week" => Ok(Granularity::Week),
            "Month" => Ok(Granularity::Month),
            _ => Err(AggregateError::InvalidGranularity(s.to_string())),
        }
    }
}

impl From<workout_dash_cli_types::Granularity> for Granularity {
    fn from(value: workout_dash_cli_types::Granularity) -> Self {
        match value {
            workout_dash_cli_types::Granularity::Day => Granularity::Day,
            workout_dash_cli_types::Granularity::Week => Granularity::Week,
            workout_dash_cli_types::Granularity::Month => Granularity::Month,
        }
    }
}
