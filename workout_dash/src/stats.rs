use std::fmt::Display;

use average::Mean;
use itertools::Itertools;

use readable::num::*;

/// Values of one group, ordered with `f64::total_cmp` so that reducing them
/// gives the same bits whatever order the records came in.
fn ordered(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .copied()
        .sorted_by(|a, b| a.total_cmp(b))
        .collect()
}

/// Mean over the values that are present. Absent values are skipped, so a
/// group without any reading has no mean at all instead of a mean of zero.
#[derive(Debug, Clone, Default)]
pub struct PresentMean(Vec<f64>);

impl PresentMean {
    pub fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.0.push(value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        let mean: Mean = ordered(&self.0).into_iter().collect();
        Some(mean.mean())
    }
}

/// Sum where absent summands count as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZeroFilledSum(Vec<f64>);

impl ZeroFilledSum {
    pub fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.0.push(value);
        }
    }

    pub fn total(&self) -> f64 {
        ordered(&self.0).into_iter().fold(0.0, |sum, v| sum + v)
    }
}

/// Per-bucket totals shown in the terminal summary.
#[derive(Debug, PartialEq)]
pub struct BucketTotals {
    pub workouts: usize,
    pub calories: f64,
}

impl Display for BucketTotals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "n: {} kcal: {}",
            Unsigned::from(self.workouts),
            Float::from(self.calories),
        )
    }
}
