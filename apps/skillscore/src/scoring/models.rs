use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ScoreError;

pub const TECH_SKILLS: &str = "Tech Skills";
pub const TOOLS: &str = "Tools";
/// Hot technology: a tech skill that overlaps many high-skill postings.
pub const HOT: &str = "HOT";
/// Prefix of the importance tag, e.g. `IM-3.5`.
pub const IMPORTANCE_PREFIX: &str = "IM-";

/// Categories forming the "technical" cohort.
pub const TECH_CATEGORIES: [&str; 2] = [TOOLS, TECH_SKILLS];

pub fn is_technical(category: &str) -> bool {
    TECH_CATEGORIES.contains(&category)
}

/// A taxonomy entry. `categories` keeps source order; the resolution rule
/// depends on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competency {
    pub identifier: String,
    pub name: String,
    pub categories: Vec<String>,
}

/// A job posting as handed over by the posting provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub identifier: String,
    pub title: String,
    pub description: String,
}

/// One skill mention found in a posting's cleansed text.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillMatch {
    pub matched_skill_identifier: String,
    pub skill_name: String,
    pub skill_categories: Vec<String>,
}

/// Corpus-wide tally for one skill identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSkill {
    pub skill_identifier: String,
    pub total_count: u64,
    pub last_seen_name: String,
    pub last_seen_categories: Vec<String>,
}

impl AggregatedSkill {
    /// Numeric `IM-` override carried by the most recently seen categories.
    pub fn importance_override(&self) -> Option<f64> {
        self.last_seen_categories
            .iter()
            .filter_map(|c| c.strip_prefix(IMPORTANCE_PREFIX))
            .filter_map(|v| v.parse::<f64>().ok())
            .last()
    }
}

/// One row of the final score table, one per competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub baseline_score: f64,
    pub count: u64,
    pub prob: f64,
    pub smoothed: f64,
    pub max_divide: f64,
    pub max_divide_smoothed: f64,
    pub min_divide_smoothed: f64,
    pub log_smoothed: f64,
    pub new_score: f64,
}

impl ScoreRow {
    /// An unscored row: count 0 and every derived column 0 until computed.
    pub fn unscored(id: String, name: String, category: String, baseline_score: f64) -> Self {
        Self {
            id,
            name,
            category,
            baseline_score,
            count: 0,
            prob: 0.0,
            smoothed: 0.0,
            max_divide: 0.0,
            max_divide_smoothed: 0.0,
            min_divide_smoothed: 0.0,
            log_smoothed: 0.0,
            new_score: 0.0,
        }
    }

    pub fn is_technical(&self) -> bool {
        is_technical(&self.category)
    }

    pub fn column(&self, column: ProbColumn) -> f64 {
        match column {
            ProbColumn::Prob => self.prob,
            ProbColumn::Smoothed => self.smoothed,
            ProbColumn::MaxDivide => self.max_divide,
            ProbColumn::MaxDivideSmoothed => self.max_divide_smoothed,
            ProbColumn::MinDivideSmoothed => self.min_divide_smoothed,
            ProbColumn::LogSmoothed => self.log_smoothed,
        }
    }
}

/// Which probability column feeds the reweighter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbColumn {
    Prob,
    #[default]
    Smoothed,
    MaxDivide,
    MaxDivideSmoothed,
    MinDivideSmoothed,
    LogSmoothed,
}

impl ProbColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbColumn::Prob => "prob",
            ProbColumn::Smoothed => "smoothed",
            ProbColumn::MaxDivide => "max_divide",
            ProbColumn::MaxDivideSmoothed => "max_divide_smoothed",
            ProbColumn::MinDivideSmoothed => "min_divide_smoothed",
            ProbColumn::LogSmoothed => "log_smoothed",
        }
    }
}

impl fmt::Display for ProbColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a `based_prob` configuration value. The raw `prob` column is not
/// selectable from configuration.
impl FromStr for ProbColumn {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smoothed" => Ok(ProbColumn::Smoothed),
            "max_divide" => Ok(ProbColumn::MaxDivide),
            "max_divide_smoothed" => Ok(ProbColumn::MaxDivideSmoothed),
            "min_divide_smoothed" => Ok(ProbColumn::MinDivideSmoothed),
            "log_smoothed" => Ok(ProbColumn::LogSmoothed),
            other => Err(ScoreError::Validation(format!(
                "unknown based_prob '{other}', must be one of 'smoothed' | 'max_divide' | \
                 'max_divide_smoothed' | 'min_divide_smoothed' | 'log_smoothed'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prob_column_parses_config_values() {
        assert_eq!("smoothed".parse::<ProbColumn>().unwrap(), ProbColumn::Smoothed);
        assert_eq!(
            "log_smoothed".parse::<ProbColumn>().unwrap(),
            ProbColumn::LogSmoothed
        );
        assert_eq!(
            "max_divide_smoothed".parse::<ProbColumn>().unwrap(),
            ProbColumn::MaxDivideSmoothed
        );
    }

    #[test]
    fn test_prob_column_rejects_unknown_value() {
        let err = "median".parse::<ProbColumn>().unwrap_err();
        assert!(matches!(err, ScoreError::Validation(_)));
    }

    #[test]
    fn test_raw_prob_is_not_configurable() {
        assert!("prob".parse::<ProbColumn>().is_err());
    }

    #[test]
    fn test_prob_column_serde_snake_case() {
        let json = serde_json::to_string(&ProbColumn::MinDivideSmoothed).unwrap();
        assert_eq!(json, r#""min_divide_smoothed""#);
    }

    #[test]
    fn test_importance_override_reads_last_im_tag() {
        let skill = AggregatedSkill {
            skill_identifier: "2.A.1.a".to_string(),
            total_count: 3,
            last_seen_name: "Reading Comprehension".to_string(),
            last_seen_categories: vec!["Skills".to_string(), "IM-3.75".to_string()],
        };
        assert_eq!(skill.importance_override(), Some(3.75));
    }

    #[test]
    fn test_importance_override_absent_for_tech_skill() {
        let skill = AggregatedSkill {
            skill_identifier: "43232110".to_string(),
            total_count: 1,
            last_seen_name: "microsoft excel".to_string(),
            last_seen_categories: vec![TECH_SKILLS.to_string(), HOT.to_string()],
        };
        assert_eq!(skill.importance_override(), None);
    }

    #[test]
    fn test_tools_and_tech_skills_are_technical() {
        assert!(is_technical("Tools"));
        assert!(is_technical("Tech Skills"));
        assert!(!is_technical("Skills"));
        assert!(!is_technical("HOT"));
    }
}
