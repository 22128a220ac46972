use chrono::{NaiveDate, Weekday};
use itertools::Itertools;
use log::debug;

use crate::{
    bucket::Granularity,
    data::{AggregateResult, CaloriesRow, DateRange, HeartRateRow, VolumeRow, WorkoutRecord},
    group::group_reduce,
    stats::{PresentMean, ZeroFilledSum},
};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("Invalid granularity '{0}'. Valid values are 'Day', 'Week' or 'Month'")]
    InvalidGranularity(String),
}

type BucketedRecord<'a> = (NaiveDate, &'a WorkoutRecord);

fn group_key((bucket, record): &BucketedRecord<'_>) -> (NaiveDate, String) {
    (*bucket, record.workout_type.clone())
}

#[derive(Default)]
struct HeartRateAcc {
    avg_hr: PresentMean,
    max_hr: PresentMean,
}

/// Aggregates `records` into volume, calorie and heart-rate tables.
///
/// Records outside `range` are skipped; without a range every record counts.
/// Each table is keyed by (bucket, workout type) and sorted by that key, so the
/// result does not depend on the order of `records`.
pub fn aggregate(
    records: &[WorkoutRecord],
    range: Option<&DateRange>,
    granularity: Granularity,
    week_start: Weekday,
) -> AggregateResult {
    let bucketed: Vec<BucketedRecord> = records
        .iter()
        .filter(|r| range.map_or(true, |range| range.contains(r.date)))
        .map(|r| (granularity.bucket_key(r.date, week_start), r))
        .collect_vec();

    debug!(
        "Aggregating {} of {} records by {}",
        bucketed.len(),
        records.len(),
        granularity
    );

    let volume = group_reduce(bucketed.iter().copied(), group_key, |count: &mut usize, _| {
        *count += 1
    })
    .into_iter()
    .map(|((bucket, workout_type), count)| VolumeRow {
        bucket,
        workout_type,
        count,
    })
    .collect_vec();

    let calories = group_reduce(
        bucketed.iter().copied(),
        group_key,
        |sum: &mut ZeroFilledSum, (_, r)| sum.add(r.calories),
    )
    .into_iter()
    .map(|((bucket, workout_type), sum)| CaloriesRow {
        bucket,
        workout_type,
        total: sum.total(),
    })
    .collect_vec();

    let heart_rate = group_reduce(
        bucketed.iter().copied(),
        group_key,
        |acc: &mut HeartRateAcc, (_, r)| {
            acc.avg_hr.add(r.avg_hr);
            acc.max_hr.add(r.max_hr);
        },
    )
    .into_iter()
    .map(|((bucket, workout_type), acc)| HeartRateRow {
        bucket,
        workout_type,
        avg_hr: acc.avg_hr.mean(),
        max_hr: acc.max_hr.mean(),
    })
    .collect_vec();

    AggregateResult {
        granularity,
        volume,
        calories,
        heart_rate,
    }
}

/// Aggregates using the raw selector values of a dashboard.
///
/// `selection` is only a range when it holds exactly two dates, and
/// `granularity` must name one of `Day`, `Week` or `Month`.
pub fn aggregate_selection(
    records: &[WorkoutRecord],
    selection: &[NaiveDate],
    granularity: &str,
    week_start: Weekday,
) -> Result<AggregateResult, AggregateError> {
    let granularity: Granularity = granularity.parse()?;
    let range = DateRange::from_selection(selection);
    if range.is_none() && !selection.is_empty() {
        debug!(
            "Incomplete date selection with {} bound(s), not filtering",
            selection.len()
        );
    }
    Ok(aggregate(records, range.as_ref(), granularity, week_start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: NaiveDate, workout_type: &str) -> WorkoutRecord {
        WorkoutRecord::new(date, workout_type)
    }

    fn with_metrics(
        date: NaiveDate,
        workout_type: &str,
        calories: Option<f64>,
        avg_hr: Option<f64>,
        max_hr: Option<f64>,
    ) -> WorkoutRecord {
        WorkoutRecord {
            calories,
            avg_hr,
            max_hr,
            ..WorkoutRecord::new(date, workout_type)
        }
    }

    fn sample() -> Vec<WorkoutRecord> {
        vec![
            with_metrics(day(2025, 1, 1), "Yoga", Some(200.0), Some(100.0), Some(120.0)),
            with_metrics(day(2025, 1, 1), "Yoga", Some(100.0), Some(110.0), Some(140.0)),
            with_metrics(day(2025, 1, 2), "Cycling", Some(500.0), Some(140.0), Some(170.0)),
            with_metrics(day(2025, 1, 8), "Cycling", None, None, Some(165.0)),
            with_metrics(day(2025, 2, 3), "Running", Some(400.0), Some(150.0), None),
        ]
    }

    #[test]
    fn test_volume_counting() {
        let records = vec![
            record(day(2025, 1, 1), "Yoga"),
            record(day(2025, 1, 1), "Yoga"),
            record(day(2025, 1, 2), "Cycling"),
        ];
        let result = aggregate(&records, None, Granularity::Day, Weekday::Mon);
        assert_eq!(
            result.volume,
            vec![
                VolumeRow {
                    bucket: day(2025, 1, 1),
                    workout_type: "Yoga".to_string(),
                    count: 2,
                },
                VolumeRow {
                    bucket: day(2025, 1, 2),
                    workout_type: "Cycling".to_string(),
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_empty_input_gives_empty_tables() {
        for g in [Granularity::Day, Granularity::Week, Granularity::Month] {
            let range = DateRange::new(day(2025, 1, 1), day(2025, 12, 31));
            let result = aggregate(&[], range.as_ref(), g, Weekday::Mon);
            assert!(result.volume.is_empty());
            assert!(result.calories.is_empty());
            assert!(result.heart_rate.is_empty());
            assert!(result.is_empty());
        }
    }

    #[test]
    fn test_range_outside_data_gives_empty_tables() {
        let range = DateRange::new(day(2030, 1, 1), day(2030, 1, 31));
        let result = aggregate(&sample(), range.as_ref(), Granularity::Day, Weekday::Mon);
        assert!(result.is_empty());
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let range = DateRange::new(day(2025, 1, 1), day(2025, 1, 8));
        let result = aggregate(&sample(), range.as_ref(), Granularity::Day, Weekday::Mon);
        let buckets = result.volume.iter().map(|r| r.bucket).collect_vec();
        assert_eq!(buckets, vec![day(2025, 1, 1), day(2025, 1, 2), day(2025, 1, 8)]);
    }

    #[test]
    fn test_week_buckets() {
        let result = aggregate(
            &[record(day(2025, 1, 8), "Yoga")],
            None,
            Granularity::Week,
            Weekday::Mon,
        );
        assert_eq!(result.volume.len(), 1);
        assert_eq!(result.volume[0].bucket, day(2025, 1, 6));

        let result = aggregate(&sample(), None, Granularity::Week, Weekday::Mon);
        let keys = result
            .volume
            .iter()
            .map(|r| (r.bucket, r.workout_type.as_str(), r.count))
            .collect_vec();
        assert_eq!(
            keys,
            vec![
                (day(2024, 12, 30), "Cycling", 1),
                (day(2024, 12, 30), "Yoga", 2),
                (day(2025, 1, 6), "Cycling", 1),
                (day(2025, 2, 3), "Running", 1),
            ]
        );
    }

    #[test]
    fn test_month_buckets() {
        let result = aggregate(&sample(), None, Granularity::Month, Weekday::Mon);
        let keys = result
            .volume
            .iter()
            .map(|r| (r.bucket, r.workout_type.as_str(), r.count))
            .collect_vec();
        assert_eq!(
            keys,
            vec![
                (day(2025, 1, 1), "Cycling", 2),
                (day(2025, 1, 1), "Yoga", 2),
                (day(2025, 2, 1), "Running", 1),
            ]
        );
    }

    #[test]
    fn test_calories_zero_fill() {
        let result = aggregate(&sample(), None, Granularity::Month, Weekday::Mon);
        let totals = result
            .calories
            .iter()
            .map(|r| (r.bucket, r.workout_type.as_str(), r.total))
            .collect_vec();
        assert_eq!(
            totals,
            vec![
                (day(2025, 1, 1), "Cycling", 500.0),
                (day(2025, 1, 1), "Yoga", 300.0),
                (day(2025, 2, 1), "Running", 400.0),
            ]
        );

        // A bucket whose calories are all absent still shows up, with zero
        let result = aggregate(&sample(), None, Granularity::Day, Weekday::Mon);
        let jan_8 = result
            .calories
            .iter()
            .find(|r| r.bucket == day(2025, 1, 8))
            .unwrap();
        assert_eq!(jan_8.total, 0.0);
    }

    #[test]
    fn test_heart_rate_means_ignore_missing() {
        let result = aggregate(&sample(), None, Granularity::Day, Weekday::Mon);
        let rows = result
            .heart_rate
            .iter()
            .map(|r| (r.bucket, r.avg_hr, r.max_hr))
            .collect_vec();
        assert_eq!(
            rows,
            vec![
                (day(2025, 1, 1), Some(105.0), Some(130.0)),
                (day(2025, 1, 2), Some(140.0), Some(170.0)),
                (day(2025, 1, 8), None, Some(165.0)),
                (day(2025, 2, 3), Some(150.0), None),
            ]
        );

        let result = aggregate(&sample(), None, Granularity::Month, Weekday::Mon);
        let cycling = result
            .heart_rate
            .iter()
            .find(|r| r.workout_type == "Cycling")
            .unwrap();
        // Only one of the two January rides has an average reading
        assert_eq!(cycling.avg_hr, Some(140.0));
        assert_eq!(cycling.max_hr, Some(167.5));
    }

    #[test]
    fn test_single_bucket_single_type() {
        let records = vec![
            with_metrics(day(2025, 3, 3), "Swim", Some(250.0), Some(120.0), Some(150.0)),
            with_metrics(day(2025, 3, 20), "Swim", Some(350.0), Some(130.0), Some(160.0)),
        ];
        let result = aggregate(&records, None, Granularity::Month, Weekday::Mon);
        assert_eq!(result.volume.len(), 1);
        assert_eq!(result.calories.len(), 1);
        assert_eq!(result.heart_rate.len(), 1);
        assert_eq!(result.volume[0].count, 2);
        assert_eq!(result.calories[0].total, 600.0);
        assert_eq!(result.heart_rate[0].avg_hr, Some(125.0));
    }

    #[test]
    fn test_idempotent() {
        let records = sample();
        let range = DateRange::new(day(2025, 1, 1), day(2025, 1, 31));
        let first = aggregate(&records, range.as_ref(), Granularity::Week, Weekday::Mon);
        let second = aggregate(&records, range.as_ref(), Granularity::Week, Weekday::Mon);
        assert_eq!(first, second);
    }

    #[test]
    fn test_order_independent() {
        let records = sample();
        let mut reversed = records.clone();
        reversed.reverse();
        let mut rotated = records.clone();
        rotated.rotate_left(2);

        for g in [Granularity::Day, Granularity::Week, Granularity::Month] {
            let expected = aggregate(&records, None, g, Weekday::Mon);
            assert_eq!(aggregate(&reversed, None, g, Weekday::Mon), expected);
            assert_eq!(aggregate(&rotated, None, g, Weekday::Mon), expected);
        }
    }

    #[test]
    fn test_order_independent_with_decimal_values() {
        let records = vec![
            with_metrics(day(2025, 1, 1), "Rowing", Some(0.1), Some(100.1), Some(150.3)),
            with_metrics(day(2025, 1, 1), "Rowing", Some(0.2), Some(100.2), None),
            with_metrics(day(2025, 1, 1), "Rowing", Some(0.3), Some(100.7), Some(160.1)),
        ];
        let mut reversed = records.clone();
        reversed.reverse();
        let mut swapped = records.clone();
        swapped.swap(0, 1);

        let expected = aggregate(&records, None, Granularity::Day, Weekday::Mon);
        assert_eq!(aggregate(&reversed, None, Granularity::Day, Weekday::Mon), expected);
        assert_eq!(aggregate(&swapped, None, Granularity::Day, Weekday::Mon), expected);
        assert!((expected.calories[0].total - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_earliest_date_in_week_bucket() {
        let records = vec![
            with_metrics(NaiveDate::MIN, "Yoga", Some(10.0), None, None),
            record(day(2025, 1, 8), "Yoga"),
        ];
        let result = aggregate(&records, None, Granularity::Week, Weekday::Mon);
        let buckets = result.volume.iter().map(|r| r.bucket).collect_vec();
        assert_eq!(buckets, vec![NaiveDate::MIN, day(2025, 1, 6)]);
    }

    #[test]
    fn test_types_sorted_within_bucket() {
        let records = vec![
            record(day(2025, 1, 1), "Yoga"),
            record(day(2025, 1, 1), "Boxing"),
            record(day(2025, 1, 1), "Cycling"),
        ];
        let result = aggregate(&records, None, Granularity::Day, Weekday::Mon);
        let types = result
            .volume
            .iter()
            .map(|r| r.workout_type.as_str())
            .collect_vec();
        assert_eq!(types, vec!["Boxing", "Cycling", "Yoga"]);
    }

    #[test]
    fn test_selection_with_invalid_granularity() {
        let result = aggregate_selection(&sample(), &[], "Fortnight", Weekday::Mon);
        assert_eq!(
            result,
            Err(AggregateError::InvalidGranularity("Fortnight".to_string()))
        );
    }

    #[test]
    fn test_selection_granularity_is_exact() {
        for selector in ["week", "MONTH", " Day"] {
            assert_eq!(
                aggregate_selection(&sample(), &[], selector, Weekday::Mon),
                Err(AggregateError::InvalidGranularity(selector.to_string()))
            );
        }
    }

    #[test]
    fn test_selection_with_single_bound_does_not_filter() {
        let all = aggregate(&sample(), None, Granularity::Day, Weekday::Mon);
        let single =
            aggregate_selection(&sample(), &[day(2025, 1, 2)], "Day", Weekday::Mon).unwrap();
        assert_eq!(single, all);
    }

    #[test]
    fn test_selection_with_two_bounds_filters() {
        let result = aggregate_selection(
            &sample(),
            &[day(2025, 1, 2), day(2025, 1, 2)],
            "Day",
            Weekday::Mon,
        )
        .unwrap();
        assert_eq!(result.volume.len(), 1);
        assert_eq!(result.volume[0].workout_type, "Cycling");
    }
}
