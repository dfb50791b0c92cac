//! Competency Table Builder: one unscored row per known competency, with the
//! category and baseline score resolved from the competency's category tags.

use std::collections::HashMap;

use tracing::debug;

use crate::errors::ScoreError;
use crate::scoring::aggregate::SkillCounts;
use crate::scoring::models::{is_technical, Competency, ScoreRow, HOT};

/// Baseline for untagged technical competencies.
pub const DEFAULT_BASELINE: f64 = 2.0;
/// Baseline for hot technologies.
pub const HOT_BASELINE: f64 = 4.0;

/// Resolves exactly one `(category, baseline_score)` pair.
///
/// With an importance tag (any category containing `-`), the score is the
/// text between the first and second `-` of that tag and the category is the
/// last category without a `-`. Otherwise the score is 2, or 4 when `HOT` is
/// present, and the category is the last of `Tools` / `Tech Skills` seen.
pub fn resolve_category_score(competency: &Competency) -> Result<(String, f64), ScoreError> {
    let tagged: Vec<f64> = competency
        .categories
        .iter()
        .filter(|c| c.contains('-'))
        .map(|tag| parse_importance(competency, tag))
        .collect::<Result<_, _>>()?;

    let (category, score) = match tagged.last() {
        Some(&importance) => {
            let category = competency
                .categories
                .iter()
                .filter(|c| !c.contains('-'))
                .last()
                .map(String::as_str);
            (category, importance)
        }
        None => {
            let category = competency
                .categories
                .iter()
                .filter(|c| is_technical(c))
                .last()
                .map(String::as_str);
            let hot = competency.categories.iter().any(|c| c == HOT);
            (category, if hot { HOT_BASELINE } else { DEFAULT_BASELINE })
        }
    };

    let category = category.ok_or_else(|| {
        ScoreError::Configuration(format!(
            "competency '{}' ({}) has no resolvable category in {:?}",
            competency.identifier, competency.name, competency.categories
        ))
    })?;

    Ok((category.to_string(), score))
}

fn parse_importance(competency: &Competency, tag: &str) -> Result<f64, ScoreError> {
    tag.split('-')
        .nth(1)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            ScoreError::Configuration(format!(
                "competency '{}' has a malformed importance tag '{tag}'",
                competency.identifier
            ))
        })
}

/// Builds the unscored table, one row per competency in input order.
pub fn build_table(competencies: &[Competency]) -> Result<Vec<ScoreRow>, ScoreError> {
    competencies
        .iter()
        .map(|c| {
            let (category, score) = resolve_category_score(c)?;
            Ok(ScoreRow::unscored(
                c.identifier.clone(),
                c.name.clone(),
                category,
                score,
            ))
        })
        .collect()
}

/// Left-joins aggregated counts into the table by skill identifier.
/// Competencies without matches keep count 0; counts for identifiers the
/// table does not know are dropped. Returns how many were dropped.
pub fn apply_counts(rows: &mut [ScoreRow], counts: &SkillCounts) -> usize {
    let index: HashMap<&str, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.as_str(), i))
        .collect();

    let mut assignments = Vec::with_capacity(counts.len());
    let mut dropped = 0;
    for (id, skill) in counts {
        match index.get(id.as_str()) {
            Some(&i) => assignments.push((i, skill)),
            None => {
                debug!("Dropping count for unknown skill {id} ({})", skill.last_seen_name);
                dropped += 1;
            }
        }
    }

    for (i, skill) in assignments {
        let row = &mut rows[i];
        row.count = skill.total_count;
        if let Some(im) = skill.importance_override() {
            if (im - row.baseline_score).abs() > f64::EPSILON {
                debug!(
                    "Skill {} matched with IM-{im} but table baseline is {}",
                    row.id, row.baseline_score
                );
            }
        }
    }

    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::test_support::competency;
    use crate::scoring::models::AggregatedSkill;

    #[test]
    fn test_tools_and_hot_resolves_to_four() {
        let c = competency("t", "Label makers", &["Tools", "HOT"]);
        assert_eq!(resolve_category_score(&c).unwrap(), ("Tools".to_string(), 4.0));
    }

    #[test]
    fn test_plain_tech_skill_resolves_to_baseline() {
        let c = competency("t", "Python", &["Tech Skills"]);
        assert_eq!(
            resolve_category_score(&c).unwrap(),
            ("Tech Skills".to_string(), 2.0)
        );
    }

    #[test]
    fn test_importance_tag_sets_score_and_other_category() {
        let c = competency("2.A.1.a", "Reading Comprehension", &["Skills", "IM-3.88"]);
        assert_eq!(resolve_category_score(&c).unwrap(), ("Skills".to_string(), 3.88));
    }

    #[test]
    fn test_importance_tag_alone_is_unresolvable() {
        let c = competency("x", "Orphan", &["IM-3.5"]);
        let err = resolve_category_score(&c).unwrap_err();
        assert!(matches!(err, ScoreError::Configuration(_)));
    }

    #[test]
    fn test_last_non_dash_category_wins() {
        let c = competency("x", "Tie", &["Knowledge", "IM-4.1", "Skills"]);
        assert_eq!(resolve_category_score(&c).unwrap(), ("Skills".to_string(), 4.1));
    }

    #[test]
    fn test_importance_tag_uses_segment_after_first_dash() {
        let c = competency("x", "Odd", &["Skills", "IM-3-5"]);
        assert_eq!(resolve_category_score(&c).unwrap().1, 3.0);
    }

    #[test]
    fn test_malformed_importance_tag_fails() {
        let c = competency("x", "Bad", &["Skills", "IM-high"]);
        assert!(matches!(
            resolve_category_score(&c),
            Err(ScoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_last_importance_tag_sets_score() {
        let c = competency("x", "Twice tagged", &["Skills", "IM-3.0", "IM-4.5"]);
        assert_eq!(resolve_category_score(&c).unwrap(), ("Skills".to_string(), 4.5));
    }

    #[test]
    fn test_earlier_malformed_tag_still_fails() {
        let c = competency("x", "Twice tagged", &["Skills", "IM-high", "IM-4.5"]);
        assert!(matches!(
            resolve_category_score(&c),
            Err(ScoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_hot_without_tech_category_fails() {
        let c = competency("x", "Hot only", &["HOT"]);
        assert!(resolve_category_score(&c).is_err());
    }

    #[test]
    fn test_build_table_defaults_count_to_zero() {
        let rows = build_table(&[
            competency("a", "Python", &["Tech Skills", "HOT"]),
            competency("b", "Writing", &["Skills", "IM-3.1"]),
        ])
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.count == 0));
        assert_eq!(rows[0].baseline_score, 4.0);
        assert_eq!(rows[1].category, "Skills");
    }

    #[test]
    fn test_build_table_fails_on_malformed_entry() {
        let result = build_table(&[
            competency("a", "Python", &["Tech Skills"]),
            competency("b", "Orphan", &["IM-2.0"]),
        ]);
        assert!(matches!(result, Err(ScoreError::Configuration(_))));
    }

    #[test]
    fn test_apply_counts_is_a_left_join() {
        let mut rows = build_table(&[
            competency("a", "Python", &["Tech Skills"]),
            competency("b", "Excel", &["Tech Skills"]),
        ])
        .unwrap();
        let counts = SkillCounts::from([
            (
                "a".to_string(),
                AggregatedSkill {
                    skill_identifier: "a".to_string(),
                    total_count: 7,
                    last_seen_name: "Python".to_string(),
                    last_seen_categories: vec!["Tech Skills".to_string()],
                },
            ),
            (
                "zzz".to_string(),
                AggregatedSkill {
                    skill_identifier: "zzz".to_string(),
                    total_count: 3,
                    last_seen_name: "Unknown".to_string(),
                    last_seen_categories: vec![],
                },
            ),
        ]);

        let dropped = apply_counts(&mut rows, &counts);
        assert_eq!(dropped, 1);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].count, 7);
        assert_eq!(rows[1].count, 0);
    }
}
