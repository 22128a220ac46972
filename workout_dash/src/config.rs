use config::{Config, ConfigError, File, FileFormat};
use log::warn;
use std::{
    env,
    path::{Path, PathBuf},
};

use chrono::Weekday;

use crate::defaults::{CONFIG_DIR_NAME, LOCAL_CONFIG_FILE_NAME};

/// Settings read from the configuration files.
///
/// Every field is optional; callers fall back to command line values first
/// and to the built-in defaults last.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DashboardConfig {
    pub week_start: Option<Weekday>,
    pub granularity: Option<String>,
    pub report_title: Option<String>,
    pub report_template: Option<PathBuf>,
    pub report_custom_css: Option<PathBuf>,
}

impl DashboardConfig {
    pub fn from_config(config: &Config) -> DashboardConfig {
        let week_start = config
            .get_string("dashboard.week_start")
            .ok()
            .and_then(|s| match s.parse::<Weekday>() {
                Ok(weekday) => Some(weekday),
                Err(_) => {
                    warn!("Ignoring invalid dashboard.week_start '{}'", s);
                    None
                }
            });

        DashboardConfig {
            week_start,
            granularity: config.get_string("dashboard.granularity").ok(),
            report_title: config.get_string("report.title").ok(),
            report_template: config.get_string("report.template").ok().map(PathBuf::from),
            report_custom_css: config
                .get_string("report.custom_css")
                .ok()
                .map(PathBuf::from),
        }
    }
}

/// System-wide config (XDG_CONFIG_HOME or ~/.config/workout-dash/config.toml)
pub fn system_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        return Some(
            Path::new(&xdg_config_home)
                .join(CONFIG_DIR_NAME)
                .join("config.toml"),
        );
    }
    dirs_next::home_dir().map(|home| {
        home.join(".config")
            .join(CONFIG_DIR_NAME)
            .join("config.toml")
    })
}

/// Closest `.workoutdashconfig`, searching upward from the current directory.
pub fn find_local_config_path() -> Option<PathBuf> {
    let mut current_dir = env::current_dir().ok()?;
    loop {
        let candidate = current_dir.join(LOCAL_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current_dir.pop() {
            return None;
        }
    }
}

/// Read hierarchical configuration (system -> local override)
pub fn read_hierarchical_config() -> Result<Config, ConfigError> {
    let mut builder = Config::builder();

    if let Some(system_config_path) = system_config_path() {
        builder = builder.add_source(
            File::from(system_config_path)
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    if let Some(local_path) = find_local_config_path() {
        builder = builder.add_source(
            File::from(local_path)
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    builder.build()
}

/// Loads the dashboard settings, or the empty settings if no valid
/// configuration can be read.
pub fn load() -> DashboardConfig {
    match read_hierarchical_config() {
        Ok(config) => DashboardConfig::from_config(&config),
        Err(e) => {
            // Broken files are reported, absent ones are not required
            warn!("Could not read configuration: {}", e);
            DashboardConfig::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn from_toml(toml: &str) -> DashboardConfig {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap();
        DashboardConfig::from_config(&config)
    }

    /// Runs `f` with HOME pointed at a fresh directory and the current
    /// directory set to `<home>/logs`.
    fn with_isolated_home<F, R>(f: F) -> R
    where
        F: FnOnce(&Path) -> R,
    {
        let temp_dir = TempDir::new().unwrap();
        let original_home = env::var("HOME").ok();
        let original_xdg = env::var("XDG_CONFIG_HOME").ok();
        let original_dir = env::current_dir().unwrap();

        env::set_var("HOME", temp_dir.path());
        env::remove_var("XDG_CONFIG_HOME");
        let work_dir = temp_dir.path().join("logs");
        fs::create_dir_all(&work_dir).unwrap();
        env::set_current_dir(&work_dir).unwrap();

        let result = f(temp_dir.path());

        env::set_current_dir(original_dir).unwrap();
        if let Some(home) = original_home {
            env::set_var("HOME", home);
        } else {
            env::remove_var("HOME");
        }
        if let Some(xdg) = original_xdg {
            env::set_var("XDG_CONFIG_HOME", xdg);
        } else {
            env::remove_var("XDG_CONFIG_HOME");
        }

        result
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(from_toml(""), DashboardConfig::default());
    }

    #[test]
    fn test_all_keys() {
        let config = from_toml(
            r#"
[dashboard]
week_start = "sunday"
granularity = "Week"

[report]
title = "My Training"
template = "templates/report.html"
custom_css = "style.css"
"#,
        );
        assert_eq!(config.week_start, Some(Weekday::Sun));
        assert_eq!(config.granularity.as_deref(), Some("Week"));
        assert_eq!(config.report_title.as_deref(), Some("My Training"));
        assert_eq!(
            config.report_template,
            Some(PathBuf::from("templates/report.html"))
        );
        assert_eq!(config.report_custom_css, Some(PathBuf::from("style.css")));
    }

    #[test]
    fn test_invalid_week_start_is_ignored() {
        let config = from_toml("[dashboard]\nweek_start = \"someday\"\n");
        assert_eq!(config.week_start, None);
    }

    #[test]
    fn test_short_week_start() {
        let config = from_toml("[dashboard]\nweek_start = \"tue\"\n");
        assert_eq!(config.week_start, Some(Weekday::Tue));
    }

    #[test]
    #[serial]
    fn test_local_config_overrides_system_config() {
        with_isolated_home(|home| {
            let system_dir = home.join(".config").join(CONFIG_DIR_NAME);
            fs::create_dir_all(&system_dir).unwrap();
            fs::write(
                system_dir.join("config.toml"),
                "[dashboard]\ngranularity = \"Month\"\nweek_start = \"sun\"\n",
            )
            .unwrap();

            // Found by walking up from <home>/logs
            fs::write(
                home.join(LOCAL_CONFIG_FILE_NAME),
                "[dashboard]\ngranularity = \"Week\"\n",
            )
            .unwrap();

            let config = load();
            assert_eq!(config.granularity.as_deref(), Some("Week"));
            assert_eq!(config.week_start, Some(Weekday::Sun));
        });
    }

    #[test]
    #[serial]
    fn test_no_config_files() {
        with_isolated_home(|_| {
            assert_eq!(find_local_config_path(), None);
            assert_eq!(load(), DashboardConfig::default());
        });
    }
}
