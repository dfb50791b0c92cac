//! Skill Matcher: pluggable, trait-based extraction of skill mentions from
//! cleansed posting text.
//!
//! Two strategies share the `SkillMatcher` trait:
//! - `ExactMatchSkillExtractor`: whole-phrase matches of competency names.
//! - `FuzzyMatchSkillExtractor`: n-gram windows scored by edit-distance similarity.
//!
//! The pipeline picks one through `SkillExtractorKind::build` and never
//! branches on the strategy afterwards.

pub mod exact;
pub mod fuzzy;

use std::fmt;
use std::str::FromStr;

use crate::errors::ScoreError;
use crate::scoring::models::{Competency, SkillMatch};
use crate::scoring::text::normalize;

pub use exact::ExactMatchSkillExtractor;
pub use fuzzy::FuzzyMatchSkillExtractor;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Yields candidate skill mentions for text that already went through
/// `scoring::text::normalize`. One `SkillMatch` per mention, so repeated
/// mentions in the same text are returned repeatedly.
pub trait SkillMatcher: Send + Sync {
    fn candidate_skills(&self, text: &str) -> Vec<SkillMatch>;

    /// Backend label, for logs.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkillExtractorKind {
    #[default]
    ExactMatch,
    FuzzySearch,
}

impl SkillExtractorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillExtractorKind::ExactMatch => "exact_match",
            SkillExtractorKind::FuzzySearch => "fuzzy_search",
        }
    }

    /// Builds the matcher over a competency framework.
    pub fn build(&self, competencies: &[Competency]) -> Result<Box<dyn SkillMatcher>, ScoreError> {
        Ok(match self {
            SkillExtractorKind::ExactMatch => {
                Box::new(ExactMatchSkillExtractor::new(competencies)?)
            }
            SkillExtractorKind::FuzzySearch => Box::new(FuzzyMatchSkillExtractor::new(competencies)),
        })
    }
}

impl fmt::Display for SkillExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillExtractorKind {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact_match" => Ok(SkillExtractorKind::ExactMatch),
            "fuzzy_search" => Ok(SkillExtractorKind::FuzzySearch),
            other => Err(ScoreError::Validation(format!(
                "unknown skill_extractor '{other}', must be 'exact_match' or 'fuzzy_search'"
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared phrase index
// ────────────────────────────────────────────────────────────────────────────

/// A competency together with its name run through the same normalizer as
/// posting text, so both sides compare in one form.
#[derive(Debug, Clone)]
pub(crate) struct SkillPhrase {
    pub phrase: String,
    pub competency: Competency,
}

impl SkillPhrase {
    pub fn to_match(&self) -> SkillMatch {
        SkillMatch {
            matched_skill_identifier: self.competency.identifier.clone(),
            skill_name: self.competency.name.clone(),
            skill_categories: self.competency.categories.clone(),
        }
    }
}

/// Competencies whose names normalize to nothing (e.g. "1040") cannot be
/// matched and are left out.
pub(crate) fn skill_phrases(competencies: &[Competency]) -> Vec<SkillPhrase> {
    competencies
        .iter()
        .filter_map(|c| {
            let phrase = normalize(&c.name).trim().to_string();
            (!phrase.is_empty()).then(|| SkillPhrase {
                phrase,
                competency: c.clone(),
            })
        })
        .collect()
}
