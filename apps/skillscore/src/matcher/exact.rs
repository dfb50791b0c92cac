use std::collections::BTreeMap;

use aho_corasick::{AhoCorasick, MatchKind};

use crate::errors::ScoreError;
use crate::matcher::{skill_phrases, SkillMatcher, SkillPhrase};
use crate::scoring::models::{Competency, SkillMatch};

/// Whole-phrase matcher over competency names.
///
/// Only phrases sitting on word boundaries of the cleansed text count. Among
/// those, selection is leftmost-longest and non-overlapping, so "microsoft
/// excel" wins over a separate "excel" entry, while "sql" is still found in
/// "sql serverless" when "sql server" does not fit.
pub struct ExactMatchSkillExtractor {
    automaton: AhoCorasick,
    /// pattern index -> every competency sharing that normalized name
    owners: Vec<Vec<SkillPhrase>>,
}

impl ExactMatchSkillExtractor {
    pub fn new(competencies: &[Competency]) -> Result<Self, ScoreError> {
        let mut by_phrase: BTreeMap<String, Vec<SkillPhrase>> = BTreeMap::new();
        for phrase in skill_phrases(competencies) {
            by_phrase
                .entry(phrase.phrase.clone())
                .or_default()
                .push(phrase);
        }

        let patterns: Vec<&str> = by_phrase.keys().map(|p| p.as_str()).collect();
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&patterns)
            .map_err(|e| {
                ScoreError::Configuration(format!("failed to build exact skill matcher: {e}"))
            })?;

        Ok(Self {
            automaton,
            owners: by_phrase.into_values().collect(),
        })
    }
}

impl SkillMatcher for ExactMatchSkillExtractor {
    fn candidate_skills(&self, text: &str) -> Vec<SkillMatch> {
        let bytes = text.as_bytes();
        let on_boundaries = |start: usize, end: usize| {
            (start == 0 || bytes[start - 1] == b' ') && (end == bytes.len() || bytes[end] == b' ')
        };

        // (start, end, pattern) of every whole-word occurrence
        let mut candidates: Vec<(usize, usize, usize)> = self
            .automaton
            .find_overlapping_iter(text)
            .filter(|m| on_boundaries(m.start(), m.end()))
            .map(|m| (m.start(), m.end(), m.pattern().as_usize()))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut matches = Vec::new();
        let mut cursor = 0;
        for (start, end, pattern) in candidates {
            if start < cursor {
                continue;
            }
            cursor = end;
            matches.extend(self.owners[pattern].iter().map(|p| p.to_match()));
        }

        matches
    }

    fn backend(&self) -> &'static str {
        "exact_match"
    }
}
