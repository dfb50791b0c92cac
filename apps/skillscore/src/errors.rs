use std::fmt;

use thiserror::Error;

/// Failures raised by the scoring core.
/// None of these are retried: they are terminal for the occupation being scored.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreError {
    /// Malformed taxonomy data, e.g. a competency with no resolvable category.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Degenerate count distribution that leaves a normalization undefined.
    #[error("Data error: {0}")]
    Data(String),

    /// A cohort too small for the outlier-clamped rank statistic.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Unknown or out-of-range configuration value.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl ScoreError {
    /// Short label of the variant, for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoreError::Configuration(_) => "configuration",
            ScoreError::Data(_) => "data",
            ScoreError::InsufficientData(_) => "insufficient_data",
            ScoreError::Validation(_) => "validation",
        }
    }
}

/// The pipeline stage an occupation run failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Taxonomy,
    Postings,
    Aggregation,
    Normalization,
    Reweighting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Taxonomy => "taxonomy",
            Stage::Postings => "postings",
            Stage::Aggregation => "aggregation",
            Stage::Normalization => "normalization",
            Stage::Reweighting => "reweighting",
        };
        f.write_str(label)
    }
}

/// A failed occupation run, tagged with where it failed so a researcher can
/// tell "no postings found" from "taxonomy malformed".
#[derive(Debug, Error)]
#[error("occupation {occupation_id} failed during {stage}: {source:#}")]
pub struct PipelineError {
    pub occupation_id: String,
    pub stage: Stage,
    #[source]
    pub source: anyhow::Error,
}

impl PipelineError {
    pub fn new(occupation_id: &str, stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        Self {
            occupation_id: occupation_id.to_string(),
            stage,
            source: source.into(),
        }
    }

    /// The core error behind this failure, if it came from the scoring core.
    pub fn score_error(&self) -> Option<&ScoreError> {
        self.source.downcast_ref::<ScoreError>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_is_lowercase() {
        assert_eq!(Stage::Taxonomy.to_string(), "taxonomy");
        assert_eq!(Stage::Reweighting.to_string(), "reweighting");
    }

    #[test]
    fn test_pipeline_error_names_occupation_and_stage() {
        let err = PipelineError::new(
            "15-1252.00",
            Stage::Normalization,
            ScoreError::Data("total count is zero".to_string()),
        );
        let msg = err.to_string();
        assert!(msg.contains("15-1252.00"));
        assert!(msg.contains("normalization"));
        assert!(msg.contains("total count is zero"));
    }

    #[test]
    fn test_score_error_kind_labels() {
        assert_eq!(ScoreError::Data(String::new()).kind(), "data");
        assert_eq!(
            ScoreError::InsufficientData(String::new()).kind(),
            "insufficient_data"
        );
    }

    #[test]
    fn test_transport_failure_has_no_core_error() {
        let err = PipelineError::new("11-3012.00", Stage::Postings, anyhow::anyhow!("timed out"));
        assert!(err.score_error().is_none());
    }

    #[test]
    fn test_score_error_is_recoverable_from_pipeline_error() {
        let err = PipelineError::new(
            "11-3012.00",
            Stage::Reweighting,
            ScoreError::InsufficientData("cohort has 3 rows".to_string()),
        );
        assert!(matches!(
            err.score_error(),
            Some(ScoreError::InsufficientData(_))
        ));
    }
}
