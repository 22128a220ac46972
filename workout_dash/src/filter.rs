use regex::Regex;

#[derive(Debug, thiserror::Error)]
#[error("Invalid workout type pattern: '{pattern}'")]
pub struct InvalidPattern {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Compile workout type patterns into regex objects
pub fn compile_filters(patterns: &[String]) -> Result<Vec<Regex>, InvalidPattern> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Check if a workout type matches any of the compiled filters.
/// Returns true if filters is empty (no filters = match all)
pub fn matches_any_filter(workout_type: &str, filters: &[Regex]) -> bool {
    if filters.is_empty() {
        return true;
    }
    filters.iter().any(|re| re.is_match(workout_type))
}
