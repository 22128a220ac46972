use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use chrono::{NaiveDate, Weekday};

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum WeekStart {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Mon => Weekday::Mon,
            WeekStart::Tue => Weekday::Tue,
            WeekStart::Wed => Weekday::Wed,
            WeekStart::Thu => Weekday::Thu,
            WeekStart::Fri => Weekday::Fri,
            WeekStart::Sat => Weekday::Sat,
            WeekStart::Sun => Weekday::Sun,
        }
    }
}

#[derive(Parser)]
#[command(version, name = "workout-dash")]
pub struct Cli {
    /// Increase verbosity level (can be specified multiple times.) The first level sets level
    /// "info", second sets level "debug", and third sets level "trace" for the logger.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct CliSelection {
    /// Workout CSV to load. Use '-' to read from stdin.
    pub input: PathBuf,

    /// First day to include (YYYY-MM-DD). Only takes effect together with --to.
    #[arg(long, value_parser=parse_date)]
    pub from: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD). Only takes effect together with --from.
    #[arg(long, value_parser=parse_date)]
    pub to: Option<NaiveDate>,

    /// Time bucket to aggregate workouts by.
    /// Falls back to `dashboard.granularity` from the config, then to "day".
    #[arg(short, long, value_enum)]
    pub granularity: Option<Granularity>,

    /// Only include workout types matching this regex (can be specified multiple times)
    #[arg(short = 't', long = "workout-type")]
    pub workout_type: Vec<String>,

    /// First day of a week bucket.
    /// Falls back to `dashboard.week_start` from the config, then to Monday.
    #[arg(long, value_enum)]
    pub week_start: Option<WeekStart>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a dashboard report with workout volume, calories and heart rate charts.
    ///
    /// The output format is inferred from the file extension: `.html` renders
    /// interactive plotly charts, `.csv` and `.json` write the aggregate tables.
    /// An output of '-' writes CSV to stdout.
    Report {
        #[command(flatten)]
        selection: CliSelection,

        /// Output file
        #[arg(short, long, default_value = "dashboard.html")]
        output: PathBuf,

        /// Title of the HTML report
        #[arg(long)]
        title: Option<String>,

        /// HTML template with {{TITLE}}, {{PLOTLY_HEAD}} and {{PLOTLY_BODY}} placeholders
        #[arg(long)]
        template: Option<PathBuf>,

        /// CSS file to inline into the HTML report
        #[arg(long)]
        custom_css: Option<PathBuf>,
    },

    /// Print per-bucket totals to the terminal
    Summary {
        #[command(flatten)]
        selection: CliSelection,
    },

    /// Show configuration sources and resolved settings
    Config {},
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid date '{}', expected YYYY-MM-DD: {}", s, e))
}
