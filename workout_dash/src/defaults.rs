//! Centralized default values for workout-dash.
//!
//! These are the fallbacks used when neither the command line nor the
//! configuration files provide a value.

use chrono::Weekday;

/// Granularity selector used when none is given.
pub const DEFAULT_GRANULARITY: &str = "Day";

/// First day of a week bucket.
///
/// Weeks start on Monday unless `dashboard.week_start` or `--week-start` say
/// otherwise.
pub const DEFAULT_WEEK_START: Weekday = Weekday::Mon;

/// Title of the HTML report.
pub const DEFAULT_REPORT_TITLE: &str = "Health & Fitness Dashboard";

/// Shown instead of charts while no workout log has been supplied.
pub const UPLOAD_PROMPT: &str = "Upload a workout CSV file to get started.";

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE_NAME: &str = ".workoutdashconfig";

/// Directory below the user config dir holding `config.toml`.
pub const CONFIG_DIR_NAME: &str = "workout-dash";
