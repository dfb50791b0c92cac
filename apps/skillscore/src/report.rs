use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::scoring::models::ScoreRow;

/// `scores-15-1252.00-2024-03-01.json`
pub fn report_file_name(occupation_id: &str, date: NaiveDate) -> String {
    format!("scores-{occupation_id}-{}.json", date.format("%Y-%m-%d"))
}

/// Writes the score table for one occupation as a JSON array, one object per row.
pub fn write_scores(
    dir: &Path,
    occupation_id: &str,
    date: NaiveDate,
    rows: &[ScoreRow],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir {}", dir.display()))?;
    let path = dir.join(report_file_name(occupation_id, date));
    let json = serde_json::to_vec_pretty(rows)?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// The `n` most-counted rows. Ties keep table order.
pub fn top_by_count(rows: &[ScoreRow], n: usize) -> Vec<&ScoreRow> {
    let mut sorted: Vec<&ScoreRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, count: u64) -> ScoreRow {
        let mut r = ScoreRow::unscored(id.to_string(), id.to_string(), "Tools".to_string(), 2.0);
        r.count = count;
        r.new_score = 2.1;
        r
    }

    #[test]
    fn test_report_file_name_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            report_file_name("15-1252.00", date),
            "scores-15-1252.00-2024-03-01.json"
        );
    }

    #[test]
    fn test_write_scores_round_trips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rows = vec![row("a", 3), row("b", 0)];

        let path = write_scores(&dir.path().join("out"), "11-3012.00", date, &rows).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<ScoreRow> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, rows);
        assert!(content.contains("\"new_score\""));
    }

    #[test]
    fn test_top_by_count_orders_and_truncates() {
        let rows = vec![row("a", 1), row("b", 7), row("c", 3), row("d", 7)];
        let top: Vec<&str> = top_by_count(&rows, 3).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(top, vec!["b", "d", "c"]);
    }

    #[test]
    fn test_top_by_count_with_fewer_rows_than_requested() {
        let rows = vec![row("a", 1)];
        assert_eq!(top_by_count(&rows, 5).len(), 1);
    }
}
