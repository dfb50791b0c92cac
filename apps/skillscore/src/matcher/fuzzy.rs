use std::collections::BTreeMap;

use strsim::normalized_levenshtein;

use crate::matcher::{skill_phrases, SkillMatcher, SkillPhrase};
use crate::scoring::models::{Competency, SkillMatch};

/// Minimum similarity (0.0 – 1.0) for a window to count as a mention.
pub const DEFAULT_THRESHOLD: f64 = 0.88;
/// Longest n-gram window compared against competency names.
const MAX_NGRAM: usize = 5;
/// Windows shorter than this are too noisy for edit-distance matching.
const MIN_WINDOW_CHARS: usize = 3;

/// Edit-distance matcher over n-gram windows of the cleansed text.
///
/// Every window of 1..=N words is compared with the competency names that
/// have the same word count; the best candidate at or above the threshold is
/// reported. Windows may overlap, so one stretch of text can yield several
/// mentions.
pub struct FuzzyMatchSkillExtractor {
    /// word count -> phrases with that many words
    by_words: BTreeMap<usize, Vec<SkillPhrase>>,
    max_ngram: usize,
    threshold: f64,
}

impl FuzzyMatchSkillExtractor {
    pub fn new(competencies: &[Competency]) -> Self {
        Self::with_threshold(competencies, DEFAULT_THRESHOLD)
    }

    pub fn with_threshold(competencies: &[Competency], threshold: f64) -> Self {
        let mut by_words: BTreeMap<usize, Vec<SkillPhrase>> = BTreeMap::new();
        for phrase in skill_phrases(competencies) {
            let words = phrase.phrase.split_whitespace().count();
            if words <= MAX_NGRAM {
                by_words.entry(words).or_default().push(phrase);
            }
        }
        let max_ngram = by_words.keys().next_back().copied().unwrap_or(0);

        Self {
            by_words,
            max_ngram,
            threshold,
        }
    }

    fn best_candidate(&self, window: &str, words: usize) -> Option<&SkillPhrase> {
        let mut best: Option<(&SkillPhrase, f64)> = None;
        for candidate in self.by_words.get(&words)? {
            let similarity = normalized_levenshtein(window, &candidate.phrase);
            if similarity < self.threshold {
                continue;
            }
            if best.map_or(true, |(_, s)| similarity > s) {
                best = Some((candidate, similarity));
            }
        }
        best.map(|(phrase, _)| phrase)
    }
}

impl SkillMatcher for FuzzyMatchSkillExtractor {
    fn candidate_skills(&self, text: &str) -> Vec<SkillMatch> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut matches = Vec::new();

        for start in 0..tokens.len() {
            for words in 1..=self.max_ngram {
                if start + words > tokens.len() {
                    break;
                }
                let window = tokens[start..start + words].join(" ");
                if window.chars().count() < MIN_WINDOW_CHARS {
                    continue;
                }
                if let Some(phrase) = self.best_candidate(&window, words) {
                    matches.push(phrase.to_match());
                }
            }
        }

        matches
    }

    fn backend(&self) -> &'static str {
        "fuzzy_search"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::test_support::{competency, framework};

    fn names(matches: &[SkillMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.skill_name.as_str()).collect()
    }

    #[test]
    fn test_tolerates_typos() {
        let matcher = FuzzyMatchSkillExtractor::new(&framework());
        let found = matcher.candidate_skills("experience with microsoft exel and python");
        assert_eq!(names(&found), vec!["Microsoft Excel", "Python"]);
    }

    #[test]
    fn test_exact_phrase_also_matches() {
        let matcher = FuzzyMatchSkillExtractor::new(&framework());
        let found = matcher.candidate_skills("reading comprehension");
        assert_eq!(names(&found), vec!["Reading Comprehension"]);
    }

    #[test]
    fn test_dissimilar_text_matches_nothing() {
        let matcher = FuzzyMatchSkillExtractor::new(&framework());
        assert!(matcher
            .candidate_skills("manage budgets and supervise staff")
            .is_empty());
    }

    #[test]
    fn test_picks_most_similar_candidate() {
        let competencies = vec![
            competency("a", "Oracle", &["Tech Skills"]),
            competency("b", "Oracles", &["Tech Skills"]),
        ];
        let matcher = FuzzyMatchSkillExtractor::with_threshold(&competencies, 0.8);
        let found = matcher.candidate_skills("oracles");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched_skill_identifier, "b");
    }

    #[test]
    fn test_short_windows_are_skipped() {
        let competencies = vec![competency("r", "R", &["Tech Skills"])];
        let matcher = FuzzyMatchSkillExtractor::new(&competencies);
        assert!(matcher.candidate_skills("r is used").is_empty());
    }

    #[test]
    fn test_empty_text() {
        let matcher = FuzzyMatchSkillExtractor::new(&framework());
        assert!(matcher.candidate_skills("").is_empty());
    }
}
