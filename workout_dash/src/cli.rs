use std::path::Path;

use anyhow::{Context, Result};
use chrono::Weekday;
use clap::Parser;
use env_logger::Env;
use log::{warn, Level};

use crate::bucket::Granularity;
use crate::config::{self, DashboardConfig};
use crate::defaults::{DEFAULT_GRANULARITY, DEFAULT_WEEK_START};
use crate::reporting::{report, ReportTemplateConfig};
use crate::session::{DashboardState, Upload};
use crate::summary::show_summary;
use workout_dash_cli_types::{Cli, CliSelection, Commands};

pub fn handle_calls() -> Result<()> {
    let cli = Cli::parse();
    let logger_level = match cli.verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(logger_level.as_str())).init();

    let dashboard_config = config::load();

    match cli.command {
        Commands::Report {
            selection,
            output,
            title,
            template,
            custom_css,
        } => {
            let state = load_state(&selection, &dashboard_config)?;
            report(
                &state,
                output,
                ReportTemplateConfig {
                    title,
                    template_path: template,
                    custom_css_path: custom_css,
                },
                &dashboard_config,
            )
        }
        Commands::Summary { selection } => {
            let state = load_state(&selection, &dashboard_config)?;
            show_summary(&state)
        }
        Commands::Config {} => show_config_info(&dashboard_config),
    }
}

fn load_state(selection: &CliSelection, config: &DashboardConfig) -> Result<DashboardState> {
    let upload = Upload::from_path(&selection.input)
        .with_context(|| format!("Failed to read {}", selection.input.display()))?;
    Ok(DashboardState {
        upload: Some(upload),
        ..selection_state(selection, config)
    })
}

/// Dashboard state for `selection` without an upload.
///
/// Command line values win over configured ones, which win over the defaults.
fn selection_state(selection: &CliSelection, config: &DashboardConfig) -> DashboardState {
    let dates = match (selection.from, selection.to) {
        (Some(from), Some(to)) => vec![from, to],
        (None, None) => vec![],
        (Some(date), None) | (None, Some(date)) => {
            warn!("Both --from and --to are needed to restrict the range, showing all dates");
            vec![date]
        }
    };

    let granularity = selection
        .granularity
        .map(|g| Granularity::from(g).to_string())
        .or_else(|| config.granularity.clone())
        .unwrap_or_else(|| DEFAULT_GRANULARITY.to_string());

    let week_start: Weekday = selection
        .week_start
        .map(|w| w.weekday())
        .or(config.week_start)
        .unwrap_or(DEFAULT_WEEK_START);

    DashboardState {
        upload: None,
        selection: dates,
        granularity,
        workout_types: selection.workout_type.clone(),
        week_start,
    }
}

fn describe_path(label: &str, path: Option<&Path>) {
    match path {
        Some(path) if path.exists() => println!("{}: {} (exists)", label, path.display()),
        Some(path) => println!("{}: {} (not found)", label, path.display()),
        None => println!("{}: none", label),
    }
}

/// Show configuration sources and the settings resolved from them
fn show_config_info(dashboard_config: &DashboardConfig) -> Result<()> {
    println!("Workout Dashboard Configuration Information");
    println!("===========================================");

    describe_path("System config", config::system_config_path().as_deref());
    describe_path("Local config", config::find_local_config_path().as_deref());

    if let Err(e) = config::read_hierarchical_config() {
        println!("\nConfiguration: Error loading - {}", e);
        return Ok(());
    }

    println!("\nConfiguration loaded successfully");
    let granularity = dashboard_config
        .granularity
        .as_deref()
        .unwrap_or(DEFAULT_GRANULARITY);
    println!("  granularity: {}", granularity);
    println!(
        "  week_start: {}",
        dashboard_config.week_start.unwrap_or(DEFAULT_WEEK_START)
    );
    if let Some(title) = &dashboard_config.report_title {
        println!("  report title: {}", title);
    }
    if let Some(template) = &dashboard_config.report_template {
        println!("  report template: {}", template.display());
    }
    if let Some(css) = &dashboard_config.report_custom_css {
        println!("  report custom_css: {}", css.display());
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use workout_dash_cli_types::WeekStart;

    fn selection() -> CliSelection {
        CliSelection {
            input: PathBuf::from("log.csv"),
            from: None,
            to: None,
            granularity: None,
            workout_type: vec![],
            week_start: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn test_defaults_without_config() {
        let state = selection_state(&selection(), &DashboardConfig::default());
        assert_eq!(state.granularity, DEFAULT_GRANULARITY);
        assert_eq!(state.week_start, DEFAULT_WEEK_START);
        assert!(state.selection.is_empty());
        assert!(state.upload.is_none());
    }

    #[test]
    fn test_config_fills_in_missing_options() {
        let config = DashboardConfig {
            granularity: Some("Month".to_string()),
            week_start: Some(Weekday::Sun),
            ..DashboardConfig::default()
        };
        let state = selection_state(&selection(), &config);
        assert_eq!(state.granularity, "Month");
        assert_eq!(state.week_start, Weekday::Sun);
    }

    #[test]
    fn test_command_line_wins_over_config() {
        let config = DashboardConfig {
            granularity: Some("Month".to_string()),
            week_start: Some(Weekday::Sun),
            ..DashboardConfig::default()
        };
        let cli = CliSelection {
            granularity: Some(workout_dash_cli_types::Granularity::Week),
            week_start: Some(WeekStart::Wed),
            workout_type: vec!["yoga".to_string()],
            ..selection()
        };
        let state = selection_state(&cli, &config);
        assert_eq!(state.granularity, "Week");
        assert_eq!(state.week_start, Weekday::Wed);
        assert_eq!(state.workout_types, vec!["yoga"]);
    }

    #[test]
    fn test_range_needs_both_bounds() {
        let config = DashboardConfig::default();
        let both = CliSelection {
            from: Some(day(1)),
            to: Some(day(8)),
            ..selection()
        };
        assert_eq!(selection_state(&both, &config).selection, vec![day(1), day(8)]);

        let only_from = CliSelection {
            from: Some(day(1)),
            ..selection()
        };
        assert_eq!(selection_state(&only_from, &config).selection, vec![day(1)]);
    }

    #[test]
    fn test_missing_input_file() {
        let cli = CliSelection {
            input: PathBuf::from("/nonexistent/workouts.csv"),
            ..selection()
        };
        let err = load_state(&cli, &DashboardConfig::default()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/workouts.csv"));
    }
}
