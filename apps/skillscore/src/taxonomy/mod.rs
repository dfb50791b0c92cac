//! Taxonomy provider: the competency framework for one occupation.

pub mod onet_db;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::scoring::models::{is_technical, Competency, IMPORTANCE_PREFIX};

pub use onet_db::OnetDatabase;

/// The competencies linked to one occupation. Built fresh per occupation and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
    pub occupation_id: String,
    pub name: String,
    pub competencies: Vec<Competency>,
    /// Competency–occupation relations kept for this occupation. Used as the
    /// vocabulary size of add-alpha smoothing.
    pub num_edges: usize,
}

impl Taxonomy {
    pub fn log_summary(&self) {
        let technical = self
            .competencies
            .iter()
            .filter(|c| c.categories.iter().any(|cat| is_technical(cat)))
            .count();
        info!(
            "Taxonomy {} ({}): {} competencies ({} technical), {} edges",
            self.occupation_id,
            self.name,
            self.competencies.len(),
            technical,
            self.num_edges
        );
    }
}

/// Keeps competencies that are technical or carry an importance score.
pub fn is_tech_or_scored(competency: &Competency) -> bool {
    competency
        .categories
        .iter()
        .any(|c| is_technical(c) || c.starts_with(IMPORTANCE_PREFIX))
}

/// Source of per-occupation taxonomies.
#[async_trait]
pub trait TaxonomyProvider: Send + Sync {
    async fn taxonomy_for(&self, occupation_id: &str) -> Result<Taxonomy>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::test_support::competency;

    #[test]
    fn test_tech_or_scored_filter() {
        assert!(is_tech_or_scored(&competency("a", "Python", &["Tech Skills"])));
        assert!(is_tech_or_scored(&competency("b", "Scanners", &["Tools"])));
        assert!(is_tech_or_scored(&competency("c", "Writing", &["Skills", "IM-3.1"])));
        assert!(!is_tech_or_scored(&competency("d", "Writing", &["Skills", "LV-4.0"])));
        assert!(!is_tech_or_scored(&competency("e", "Hot", &["HOT"])));
    }
}
