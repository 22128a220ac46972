use std::{
    fs::{self, File},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use itertools::Itertools;
use plotly::{
    common::{Mode, Title},
    layout::{Axis, BarMode, Legend},
    Bar, Configuration, Layout, Plot, Scatter,
};
use serde::Serialize;

use crate::{
    config::DashboardConfig,
    data::AggregateResult,
    defaults::DEFAULT_REPORT_TITLE,
    session::{render, Dashboard, DashboardState, View},
};

/// Template and title overrides given on the command line.
#[derive(Debug, Default, Clone)]
pub struct ReportTemplateConfig {
    pub title: Option<String>,
    pub template_path: Option<PathBuf>,
    pub custom_css_path: Option<PathBuf>,
}

/// Metadata for rendering report templates
struct ReportMetadata {
    title: String,
    custom_css: String,
    timestamp: String,
    date_range: String,
    rejected: usize,
}

impl ReportMetadata {
    fn new(title: Option<String>, custom_css: String, dashboard: &Dashboard) -> ReportMetadata {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

        let date_range = match (&dashboard.range, &dashboard.extent) {
            (Some(range), _) => range.to_string(),
            (None, Some(extent)) => extent.to_string(),
            (None, None) => "No workouts".to_string(),
        };

        ReportMetadata {
            title: title.unwrap_or_else(|| DEFAULT_REPORT_TITLE.to_string()),
            custom_css,
            timestamp,
            date_range,
            rejected: dashboard.rejected,
        }
    }
}

/// Default HTML template used when no custom template is provided.
const DEFAULT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{{TITLE}}</title>
    {{PLOTLY_HEAD}}
    <style>{{CUSTOM_CSS}}</style>
</head>
<body>
    <h1>{{TITLE}}</h1>
    <p>{{DATE_RANGE}} &middot; {{REJECTED}} rows with an invalid date skipped &middot; generated {{TIMESTAMP}}</p>
    {{PLOTLY_BODY}}
</body>
</html>"#;

/// Apply template with placeholder substitution
fn apply_template(template: &str, plots: &[(&str, &Plot)], metadata: &ReportMetadata) -> Vec<u8> {
    let plotly_head = Plot::online_cdn_js();
    let plotly_body = plots
        .iter()
        .map(|(div_id, plot)| plot.to_inline_html(Some(*div_id)))
        .join("\n");

    template
        .replace("{{TITLE}}", &metadata.title)
        .replace("{{PLOTLY_HEAD}}", &plotly_head)
        .replace("{{PLOTLY_BODY}}", &plotly_body)
        .replace("{{CUSTOM_CSS}}", &metadata.custom_css)
        .replace("{{TIMESTAMP}}", &metadata.timestamp)
        .replace("{{DATE_RANGE}}", &metadata.date_range)
        .replace("{{REJECTED}}", &metadata.rejected.to_string())
        .into_bytes()
}

/// Reads an optional file named on the command line or in the config.
fn load_optional_file(path: Option<&PathBuf>, what: &str) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        bail!("{} file not found: {}", what, path.display());
    }
    fs::read_to_string(path)
        .map(Some)
        .with_context(|| format!("Failed to read {} file {}", what, path.display()))
}

trait Reporter {
    fn add_dashboard(&mut self, dashboard: &Dashboard);
    fn as_bytes(&self) -> Result<Vec<u8>>;

    /// Page template and header values. Only used by HTML output.
    fn set_page(&mut self, _template: Option<String>, _metadata: ReportMetadata) {}
}

struct PlotlyReporter {
    volume: Plot,
    calories: Plot,
    heart_rate: Plot,
    template: Option<String>,
    metadata: Option<ReportMetadata>,
}

fn new_plot() -> Plot {
    let config = Configuration::default().responsive(true).fill_frame(false);
    let mut plot = Plot::new();
    plot.set_configuration(config);
    plot
}

fn chart_layout(title: String, bucket_label: &str, y_label: &str) -> Layout {
    Layout::new()
        .title(Title::from(title.as_str()))
        .x_axis(Axis::new().title(Title::from(bucket_label)))
        .y_axis(Axis::new().title(Title::from(y_label)))
        .legend(
            Legend::new()
                .group_click(plotly::layout::GroupClick::ToggleItem)
                .orientation(plotly::common::Orientation::Horizontal),
        )
}

fn bucket_axis(buckets: impl Iterator<Item = NaiveDate>) -> Vec<String> {
    buckets.map(|b| b.format("%Y-%m-%d").to_string()).collect()
}

impl PlotlyReporter {
    fn new() -> PlotlyReporter {
        PlotlyReporter {
            volume: new_plot(),
            calories: new_plot(),
            heart_rate: new_plot(),
            template: None,
            metadata: None,
        }
    }

    fn add_volume(&mut self, result: &AggregateResult) {
        let g = result.granularity;
        self.volume.set_layout(
            chart_layout(
                format!("{} Workout Volume", g.adjective()),
                g.bucket_label(),
                "count",
            )
            .bar_mode(BarMode::Stack),
        );
        for (workout_type, rows) in &result
            .volume
            .iter()
            .sorted_by(|a, b| a.workout_type.cmp(&b.workout_type))
            .chunk_by(|r| r.workout_type.clone())
        {
            let rows = rows.collect_vec();
            let x = bucket_axis(rows.iter().map(|r| r.bucket));
            let y = rows.iter().map(|r| r.count).collect_vec();
            self.volume.add_trace(Bar::new(x, y).name(&workout_type));
        }
    }

    fn add_calories(&mut self, result: &AggregateResult) {
        let g = result.granularity;
        self.calories.set_layout(
            chart_layout(
                format!("{} Calories Burned", g.adjective()),
                g.bucket_label(),
                "calories",
            )
            .bar_mode(BarMode::Stack),
        );
        for (workout_type, rows) in &result
            .calories
            .iter()
            .sorted_by(|a, b| a.workout_type.cmp(&b.workout_type))
            .chunk_by(|r| r.workout_type.clone())
        {
            let rows = rows.collect_vec();
            let x = bucket_axis(rows.iter().map(|r| r.bucket));
            let y = rows.iter().map(|r| r.total).collect_vec();
            self.calories.add_trace(Bar::new(x, y).name(&workout_type));
        }
    }

    fn add_heart_rate(&mut self, result: &AggregateResult) {
        let g = result.granularity;
        self.heart_rate.set_layout(chart_layout(
            format!("{} Heart Rate", g.adjective()),
            g.bucket_label(),
            "bpm",
        ));
        for (workout_type, rows) in &result
            .heart_rate
            .iter()
            .sorted_by(|a, b| a.workout_type.cmp(&b.workout_type))
            .chunk_by(|r| r.workout_type.clone())
        {
            let rows = rows.collect_vec();
            let x = bucket_axis(rows.iter().map(|r| r.bucket));
            // Buckets without readings stay gaps in the line
            let avg = rows.iter().map(|r| r.avg_hr).collect_vec();
            let max = rows.iter().map(|r| r.max_hr).collect_vec();
            self.heart_rate.add_trace(
                Scatter::new(x.clone(), avg)
                    .mode(Mode::LinesMarkers)
                    .name(&format!("{} avg", workout_type))
                    .legend_group(&workout_type),
            );
            self.heart_rate.add_trace(
                Scatter::new(x, max)
                    .mode(Mode::Markers)
                    .name(&format!("{} max", workout_type))
                    .legend_group(&workout_type),
            );
        }
    }
}

impl Reporter for PlotlyReporter {
    fn add_dashboard(&mut self, dashboard: &Dashboard) {
        self.add_volume(&dashboard.result);
        self.add_calories(&dashboard.result);
        self.add_heart_rate(&dashboard.result);
    }

    fn set_page(&mut self, template: Option<String>, metadata: ReportMetadata) {
        self.template = template;
        self.metadata = Some(metadata);
    }

    fn as_bytes(&self) -> Result<Vec<u8>> {
        let template = self.template.as_deref().unwrap_or(DEFAULT_HTML_TEMPLATE);

        let default_metadata = ReportMetadata {
            title: DEFAULT_REPORT_TITLE.to_string(),
            custom_css: String::new(),
            timestamp: String::new(),
            date_range: String::new(),
            rejected: 0,
        };
        let metadata = self.metadata.as_ref().unwrap_or(&default_metadata);

        Ok(apply_template(
            template,
            &[
                ("volume", &self.volume),
                ("calories", &self.calories),
                ("heart_rate", &self.heart_rate),
            ],
            metadata,
        ))
    }
}

/// One line of the flat CSV export. Only the metric columns of the row's
/// own table are filled.
#[derive(Serialize)]
struct CsvAggregateRow<'a> {
    table: &'static str,
    bucket: NaiveDate,
    workout_type: &'a str,
    count: Option<usize>,
    calories: Option<f64>,
    avg_hr: Option<f64>,
    max_hr: Option<f64>,
}

impl<'a> CsvAggregateRow<'a> {
    fn empty(table: &'static str, bucket: NaiveDate, workout_type: &'a str) -> Self {
        CsvAggregateRow {
            table,
            bucket,
            workout_type,
            count: None,
            calories: None,
            avg_hr: None,
            max_hr: None,
        }
    }
}

struct CsvReporter {
    result: Option<AggregateResult>,
}

impl CsvReporter {
    fn new() -> Self {
        CsvReporter { result: None }
    }
}

impl Reporter for CsvReporter {
    fn add_dashboard(&mut self, dashboard: &Dashboard) {
        self.result = Some(dashboard.result.clone());
    }

    fn as_bytes(&self) -> Result<Vec<u8>> {
        let Some(result) = &self.result else {
            return Ok(Vec::new());
        };
        let mut writer = csv::Writer::from_writer(vec![]);

        let volume = result.volume.iter().map(|r| CsvAggregateRow {
            count: Some(r.count),
            ..CsvAggregateRow::empty("volume", r.bucket, &r.workout_type)
        });
        let calories = result.calories.iter().map(|r| CsvAggregateRow {
            calories: Some(r.total),
            ..CsvAggregateRow::empty("calories", r.bucket, &r.workout_type)
        });
        let heart_rate = result.heart_rate.iter().map(|r| CsvAggregateRow {
            avg_hr: r.avg_hr,
            max_hr: r.max_hr,
            ..CsvAggregateRow::empty("heart_rate", r.bucket, &r.workout_type)
        });

        for row in volume.chain(calories).chain(heart_rate) {
            writer.serialize(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush CSV output: {}", e.error()))
    }
}

struct JsonReporter {
    dashboard: Option<Dashboard>,
}

impl Reporter for JsonReporter {
    fn add_dashboard(&mut self, dashboard: &Dashboard) {
        self.dashboard = Some(dashboard.clone());
    }

    fn as_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(&self.dashboard)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

struct ReporterFactory {}

impl ReporterFactory {
    fn from_file_name(path: &Path) -> Option<Box<dyn Reporter>> {
        if path == Path::new("-") {
            return Some(Box::new(CsvReporter::new()) as Box<dyn Reporter>);
        }
        let extension = path.extension()?.to_ascii_lowercase().into_string().ok()?;
        match extension.as_str() {
            "html" => Some(Box::new(PlotlyReporter::new()) as Box<dyn Reporter>),
            "csv" => Some(Box::new(CsvReporter::new()) as Box<dyn Reporter>),
            "json" => Some(Box::new(JsonReporter { dashboard: None }) as Box<dyn Reporter>),
            _ => None,
        }
    }
}

/// Builds the report bytes for `output`'s format.
fn render_report(
    dashboard: &Dashboard,
    output: &Path,
    template_config: &ReportTemplateConfig,
    config: &DashboardConfig,
) -> Result<Vec<u8>> {
    let mut reporter =
        ReporterFactory::from_file_name(output).ok_or(anyhow!("Could not infer output format"))?;

    let is_html = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
    if is_html {
        // CLI > config > default
        let template_path = template_config
            .template_path
            .as_ref()
            .or(config.report_template.as_ref());
        let css_path = template_config
            .custom_css_path
            .as_ref()
            .or(config.report_custom_css.as_ref());
        let title = template_config
            .title
            .clone()
            .or_else(|| config.report_title.clone());

        let template = load_optional_file(template_path, "Template")?;
        let custom_css = load_optional_file(css_path, "Custom CSS")?.unwrap_or_default();
        reporter.set_page(template, ReportMetadata::new(title, custom_css, dashboard));
    }

    reporter.add_dashboard(dashboard);
    reporter.as_bytes()
}

pub fn report(
    state: &DashboardState,
    output: PathBuf,
    template_config: ReportTemplateConfig,
    config: &DashboardConfig,
) -> Result<()> {
    let dashboard = match render(state) {
        View::Prompt(prompt) => bail!(prompt),
        View::Error(e) => return Err(e).context("Cannot build dashboard"),
        View::Charts(dashboard) => dashboard,
    };

    if dashboard.result.is_empty() {
        log::warn!("No workouts in the selected range, writing empty report");
    }

    let report_bytes = render_report(&dashboard, &output, &template_config, config)?;

    if output == Path::new("-") {
        match io::stdout().write_all(&report_bytes) {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            res => res,
        }?;
    } else {
        File::create(&output)
            .with_context(|| format!("Failed to create {}", output.display()))?
            .write_all(&report_bytes)?;
        log::info!("Wrote report to {}", output.display());
    }

    Ok(())
}
