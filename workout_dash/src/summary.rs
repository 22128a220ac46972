use anyhow::{bail, Context, Result};
use itertools::{izip, Itertools};
use readable::num::Float;
use sparklines::spark;

use crate::{
    session::{render, Dashboard, DashboardState, View},
    stats::BucketTotals,
};

/// Print the aggregate tables of `state` to stdout.
pub fn show_summary(state: &DashboardState) -> Result<()> {
    let dashboard = match render(state) {
        View::Prompt(prompt) => bail!(prompt),
        View::Error(e) => return Err(e).context("Cannot build dashboard"),
        View::Charts(dashboard) => dashboard,
    };
    print!("{}", format_summary(&dashboard));
    Ok(())
}

fn format_hr(hr: Option<f64>) -> String {
    hr.map(|hr| Float::from(hr).to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Per-bucket totals followed by one line per workout type.
pub fn format_summary(dashboard: &Dashboard) -> String {
    let result = &dashboard.result;

    let plural_s = if dashboard.rejected == 1 { "" } else { "s" };
    let mut lines = vec![
        format!("Source: {}", dashboard.source),
        format!(
            "Workouts: {} ({} row{plural_s} with an invalid date skipped)",
            dashboard.total_records, dashboard.rejected
        ),
    ];
    if let Some(extent) = &dashboard.extent {
        lines.push(format!("Data range: {}", extent));
    }
    lines.push(match &dashboard.range {
        Some(range) => format!("Selected range: {}", range),
        None => "Selected range: all".to_string(),
    });

    if result.is_empty() {
        lines.push("No workouts in the selected range.".to_string());
        return lines.join("\n") + "\n";
    }

    // The three tables share their (bucket, workout type) keys and ordering
    let rows = izip!(&result.volume, &result.calories, &result.heart_rate).collect_vec();
    let buckets = rows.iter().chunk_by(|(v, _, _)| v.bucket);

    let mut counts = Vec::new();
    let mut body = Vec::new();
    for (bucket, group) in &buckets {
        let group = group.collect_vec();
        let totals = BucketTotals {
            workouts: group.iter().map(|(v, _, _)| v.count).sum(),
            calories: group.iter().map(|(_, c, _)| c.total).sum(),
        };
        counts.push(totals.workouts as f64);
        body.push(format!("{}  {}", bucket, totals));
        body.extend(group.iter().map(|(v, c, hr)| {
            format!(
                "    {:<20} n: {:<4} kcal: {:<10} avg hr: {:<8} max hr: {}",
                v.workout_type,
                v.count,
                Float::from(c.total),
                format_hr(hr.avg_hr),
                format_hr(hr.max_hr),
            )
        }));
    }

    lines.push(format!(
        "{} volume: {}",
        result.granularity.adjective(),
        spark(&counts)
    ));
    lines.extend(body);
    lines.join("\n") + "\n"
}
