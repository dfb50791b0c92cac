//! Score Reweighter: turns the chosen probability column into a bounded
//! multiplier on each competency's baseline score.
//!
//! Rows are scaled against their own cohort (technical vs non-technical):
//! 1. `min` = smallest value in the cohort, `max` = 6th-largest value
//! 2. the row's value is clamped to at most `max`
//! 3. `weight` = value linearly rescaled from `[min, max]` to `[0.5, 1.5]`
//! 4. `new_score = baseline × (0.9 + 0.1 × weight)`, clamped to `[1, 5]`

use tracing::debug;

use crate::errors::ScoreError;
use crate::scoring::models::{ProbColumn, ScoreRow};

/// Zero-based rank of the cohort ceiling. The five largest values sit above it.
pub const CEILING_RANK: usize = 5;
pub const WEIGHT_LOW: f64 = 0.5;
pub const WEIGHT_HIGH: f64 = 1.5;
pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct CohortBounds {
    min: f64,
    max: f64,
}

impl CohortBounds {
    fn from_values(mut values: Vec<f64>, cohort: &str, column: ProbColumn) -> Result<Self, ScoreError> {
        if values.len() <= CEILING_RANK {
            return Err(ScoreError::InsufficientData(format!(
                "{cohort} cohort has {} rows; at least {} are needed to rank {column}",
                values.len(),
                CEILING_RANK + 1
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ScoreError::Data(format!(
                "{cohort} cohort has a non-finite {column} value ({bad})"
            )));
        }

        values.sort_by(|a, b| b.total_cmp(a));
        Ok(Self {
            min: values[values.len() - 1],
            max: values[CEILING_RANK],
        })
    }

    fn weight(&self, value: f64) -> f64 {
        let clamped = value.min(self.max);
        let span = self.max - self.min;
        if span == 0.0 {
            // the ceiling equals the floor: every row is clamped onto it
            return WEIGHT_LOW;
        }
        (clamped - self.min) * (WEIGHT_HIGH - WEIGHT_LOW) / span + WEIGHT_LOW
    }

    fn rescore(&self, value: f64, baseline: f64) -> f64 {
        let weight = self.weight(value);
        (baseline * (0.9 + 0.1 * weight)).clamp(MIN_SCORE, MAX_SCORE)
    }
}

/// Computes `new_score` for every row from `column`.
///
/// Fails with `ScoreError::InsufficientData` when a non-empty cohort has
/// fewer than six rows. Rows are left untouched on failure.
pub fn reweight(rows: &mut [ScoreRow], column: ProbColumn) -> Result<(), ScoreError> {
    let mut cohorts = Vec::with_capacity(2);

    for (technical, label) in [(true, "technical"), (false, "non-technical")] {
        let members: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_technical() == technical)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }

        let values = members.iter().map(|&i| rows[i].column(column)).collect();
        let bounds = CohortBounds::from_values(values, label, column)?;
        debug!(
            "{label} cohort: {} rows, {column} in [{}, {}]",
            members.len(),
            bounds.min,
            bounds.max
        );
        cohorts.push((members, bounds));
    }

    for (members, bounds) in cohorts {
        for i in members {
            let row = &mut rows[i];
            row.new_score = bounds.rescore(row.column(column), row.baseline_score);
        }
    }

    Ok(())
}
