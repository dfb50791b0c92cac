//! Skill Aggregator: tallies matcher output into corpus-wide counts.

use std::collections::BTreeMap;

use crate::matcher::SkillMatcher;
use crate::scoring::models::{AggregatedSkill, Posting};
use crate::scoring::text::normalize;

/// skill identifier -> tally. Ordered so downstream output is reproducible.
pub type SkillCounts = BTreeMap<String, AggregatedSkill>;

/// Runs every posting's cleansed description through the matcher and counts
/// one per mention. Name and categories track the latest mention.
pub fn aggregate(postings: &[Posting], matcher: &dyn SkillMatcher) -> SkillCounts {
    let mut counts = SkillCounts::new();

    for posting in postings {
        let text = normalize(&posting.description);
        for found in matcher.candidate_skills(&text) {
            record(
                &mut counts,
                found.matched_skill_identifier,
                1,
                found.skill_name,
                found.skill_categories,
            );
        }
    }

    counts
}

/// Merges batches in the order supplied. Counts for the same identifier add
/// up; name and categories from later batches overwrite earlier ones.
///
/// Merging is not idempotent: a posting present in two batches counts twice.
pub fn merge(batches: impl IntoIterator<Item = SkillCounts>) -> SkillCounts {
    let mut merged = SkillCounts::new();

    for batch in batches {
        for (id, skill) in batch {
            record(
                &mut merged,
                id,
                skill.total_count,
                skill.last_seen_name,
                skill.last_seen_categories,
            );
        }
    }

    merged
}

/// Total mentions across all skills.
pub fn total_mentions(counts: &SkillCounts) -> u64 {
    counts.values().map(|s| s.total_count).sum()
}

fn record(counts: &mut SkillCounts, id: String, by: u64, name: String, categories: Vec<String>) {
    let entry = counts.entry(id.clone()).or_insert_with(|| AggregatedSkill {
        skill_identifier: id,
        total_count: 0,
        last_seen_name: String::new(),
        last_seen_categories: Vec::new(),
    });
    entry.total_count += by;
    entry.last_seen_name = name;
    entry.last_seen_categories = categories;
}
