//! Probability Normalizer: the candidate probability columns derived from
//! aggregated counts.

use crate::errors::ScoreError;
use crate::scoring::models::ScoreRow;

/// Fills every probability column of every row.
///
/// With `total`, `max` and `min` taken over all row counts:
/// - `prob = count / total`
/// - `smoothed = (count + α) / (total + α·E)` with `E = num_edges`
/// - `max_divide = count / max`
/// - `max_divide_smoothed = (count + α) / (max + α·E)`
/// - `min_divide_smoothed = (count + α) / (min + α·E)`
/// - `log_smoothed = log10(min_divide_smoothed)`
///
/// A zero denominator is a `ScoreError::Data`; nothing is defaulted.
pub fn normalize_probabilities(
    rows: &mut [ScoreRow],
    alpha: f64,
    num_edges: usize,
) -> Result<(), ScoreError> {
    validate_alpha(alpha)?;

    if rows.is_empty() {
        return Err(ScoreError::Data("score table has no rows".to_string()));
    }

    let total: u64 = rows.iter().map(|r| r.count).sum();
    let max_count = rows.iter().map(|r| r.count).max().unwrap_or(0);
    let min_count = rows.iter().map(|r| r.count).min().unwrap_or(0);

    if total == 0 {
        return Err(ScoreError::Data(
            "total skill count is zero; no competency was matched in any posting".to_string(),
        ));
    }

    let total = total as f64;
    let max_count = max_count as f64;
    let min_count = min_count as f64;
    let vocab = alpha * num_edges as f64;

    let smoothed_denominator = total + vocab;
    let max_smoothed_denominator = max_count + vocab;
    let min_smoothed_denominator = min_count + vocab;
    if min_smoothed_denominator == 0.0 {
        return Err(ScoreError::Data(format!(
            "min_divide_smoothed is undefined: min count is 0 and alpha * num_edges = {vocab}"
        )));
    }

    for row in rows.iter_mut() {
        let count = row.count as f64;
        row.prob = count / total;
        row.smoothed = (count + alpha) / smoothed_denominator;
        row.max_divide = count / max_count;
        row.max_divide_smoothed = (count + alpha) / max_smoothed_denominator;
        row.min_divide_smoothed = (count + alpha) / min_smoothed_denominator;
        row.log_smoothed = row.min_divide_smoothed.log10();
    }

    Ok(())
}

pub fn validate_alpha(alpha: f64) -> Result<(), ScoreError> {
    if alpha.is_finite() && alpha >= 0.0 {
        Ok(())
    } else {
        Err(ScoreError::Validation(format!(
            "alpha must be a finite number >= 0, got {alpha}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(counts: &[u64]) -> Vec<ScoreRow> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let mut row = ScoreRow::unscored(
                    format!("s{i}"),
                    format!("Skill {i}"),
                    "Tech Skills".to_string(),
                    2.0,
                );
                row.count = c;
                row
            })
            .collect()
    }

    #[test]
    fn test_columns_for_known_counts() {
        let mut table = rows(&[6, 3, 1, 0]);
        normalize_probabilities(&mut table, 1.0, 6).unwrap();

        // total = 10, max = 6, min = 0, alpha * E = 6
        assert!((table[0].prob - 0.6).abs() < 1e-12);
        assert!((table[0].smoothed - 7.0 / 16.0).abs() < 1e-12);
        assert!((table[3].smoothed - 1.0 / 16.0).abs() < 1e-12);
        assert!((table[1].max_divide - 0.5).abs() < 1e-12);
        assert!((table[1].max_divide_smoothed - 4.0 / 12.0).abs() < 1e-12);
        assert!((table[2].min_divide_smoothed - 2.0 / 6.0).abs() < 1e-12);
        assert!((table[2].log_smoothed - (2.0_f64 / 6.0).log10()).abs() < 1e-12);
    }

    #[test]
    fn test_max_divide_of_top_row_is_one() {
        let mut table = rows(&[2, 9, 4, 9, 0]);
        normalize_probabilities(&mut table, 0.5, 10).unwrap();
        assert_eq!(table[1].max_divide, 1.0);
        assert_eq!(table[3].max_divide, 1.0);
    }

    #[test]
    fn test_smoothed_sums_below_one_when_edges_exceed_rows() {
        for alpha in [0.01, 0.5, 1.0, 5.0] {
            let mut table = rows(&[50, 10, 0, 0, 3]);
            normalize_probabilities(&mut table, alpha, 12).unwrap();
            let sum: f64 = table.iter().map(|r| r.smoothed).sum();
            assert!(sum < 1.0, "alpha {alpha}: sum was {sum}");
        }
    }

    #[test]
    fn test_smoothed_approaches_prob_as_alpha_shrinks() {
        let mut coarse = rows(&[50, 10, 0, 3]);
        let mut fine = rows(&[50, 10, 0, 3]);
        normalize_probabilities(&mut coarse, 1.0, 8).unwrap();
        normalize_probabilities(&mut fine, 1e-9, 8).unwrap();
        for (c, f) in coarse.iter().zip(&fine) {
            assert!((f.smoothed - f.prob).abs() <= (c.smoothed - c.prob).abs());
            assert!((f.smoothed - f.prob).abs() < 1e-8);
        }
    }

    #[test]
    fn test_zero_alpha_equals_prob() {
        let mut table = rows(&[4, 1, 5]);
        normalize_probabilities(&mut table, 0.0, 3).unwrap();
        for row in &table {
            assert!((row.smoothed - row.prob).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_total_is_data_error() {
        let mut table = rows(&[0, 0, 0]);
        let err = normalize_probabilities(&mut table, 1.0, 3).unwrap_err();
        assert!(matches!(err, ScoreError::Data(_)));
    }

    #[test]
    fn test_zero_min_without_smoothing_is_data_error() {
        let mut table = rows(&[3, 0]);
        let err = normalize_probabilities(&mut table, 0.0, 2).unwrap_err();
        assert!(matches!(err, ScoreError::Data(_)));
    }

    #[test]
    fn test_empty_table_is_data_error() {
        let err = normalize_probabilities(&mut [], 1.0, 0).unwrap_err();
        assert!(matches!(err, ScoreError::Data(_)));
    }

    #[test]
    fn test_negative_alpha_is_validation_error() {
        let mut table = rows(&[1, 2]);
        let err = normalize_probabilities(&mut table, -0.5, 2).unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)));
        assert!(validate_alpha(f64::NAN).is_err());
    }
}
