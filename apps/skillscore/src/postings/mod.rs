//! Posting provider: job postings grouped by the title query that found them.

pub mod usajobs;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::scoring::models::Posting;

pub use usajobs::UsaJobsClient;

/// query -> postings found for it, each query deduplicated by posting id.
pub type PostingBatches = BTreeMap<String, Vec<Posting>>;

#[async_trait]
pub trait PostingProvider: Send + Sync {
    async fn all_postings_of(&self, queries: &[String]) -> Result<PostingBatches>;
}

/// `USAJobs-Business_Manager&Management_Analyst.json`
pub fn snapshot_file_name(queries: &[String]) -> String {
    let joined: Vec<String> = queries
        .iter()
        .map(|q| q.split_whitespace().collect::<Vec<_>>().join("_"))
        .collect();
    format!("USAJobs-{}.json", joined.join("&"))
}

/// Writes fetched postings under `dir`. Callers treat failures as non-fatal.
pub fn write_snapshot(dir: &Path, queries: &[String], batches: &PostingBatches) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create snapshot dir {}", dir.display()))?;
    let path = dir.join(snapshot_file_name(queries));
    let json = serde_json::to_vec_pretty(batches)?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn read_snapshot(path: &Path) -> Result<PostingBatches> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("malformed snapshot {}", path.display()))
}

/// Fetches from the live provider, then saves a snapshot next to earlier runs.
pub struct SnapshottingProvider<P> {
    inner: P,
    dir: PathBuf,
}

impl<P> SnapshottingProvider<P> {
    pub fn new(inner: P, dir: PathBuf) -> Self {
        Self { inner, dir }
    }
}

#[async_trait]
impl<P: PostingProvider> PostingProvider for SnapshottingProvider<P> {
    async fn all_postings_of(&self, queries: &[String]) -> Result<PostingBatches> {
        let batches = self.inner.all_postings_of(queries).await?;
        match write_snapshot(&self.dir, queries, &batches) {
            Ok(path) => info!("Saved postings snapshot to {}", path.display()),
            Err(e) => warn!("Error saving postings snapshot, ignoring: {e:#}"),
        }
        Ok(batches)
    }
}

/// Serves postings from a saved snapshot. Only the requested queries are
/// returned; a query missing from the snapshot yields no postings.
pub struct SnapshotPostingProvider {
    batches: PostingBatches,
}

impl SnapshotPostingProvider {
    pub fn open(path: &Path) -> Result<Self> {
        let batches = read_snapshot(path)?;
        info!(
            "Loaded snapshot {} with {} queries",
            path.display(),
            batches.len()
        );
        Ok(Self { batches })
    }
}

#[async_trait]
impl PostingProvider for SnapshotPostingProvider {
    async fn all_postings_of(&self, queries: &[String]) -> Result<PostingBatches> {
        Ok(queries
            .iter()
            .map(|q| {
                let postings = self.batches.get(q).cloned().unwrap_or_else(|| {
                    warn!("Snapshot has no postings for '{q}'");
                    Vec::new()
                });
                (q.clone(), postings)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batches() -> PostingBatches {
        PostingBatches::from([(
            "Business Manager".to_string(),
            vec![Posting {
                identifier: "123".to_string(),
                title: "Business Manager".to_string(),
                description: "Experience with Microsoft Excel.".to_string(),
            }],
        )])
    }

    #[test]
    fn test_snapshot_file_name_joins_queries() {
        let queries = vec![
            "Administrative Services Managers".to_string(),
            "Business Manager".to_string(),
        ];
        assert_eq!(
            snapshot_file_name(&queries),
            "USAJobs-Administrative_Services_Managers&Business_Manager.json"
        );
    }

    #[test]
    fn test_snapshot_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let queries = vec!["Business Manager".to_string()];
        let path = write_snapshot(&dir.path().join("db"), &queries, &batches()).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), batches());
    }

    #[tokio::test]
    async fn test_snapshot_provider_returns_requested_queries() {
        let dir = tempfile::tempdir().unwrap();
        let queries = vec!["Business Manager".to_string()];
        let path = write_snapshot(dir.path(), &queries, &batches()).unwrap();

        let provider = SnapshotPostingProvider::open(&path).unwrap();
        let asked = vec!["Business Manager".to_string(), "Analyst".to_string()];
        let result = provider.all_postings_of(&asked).await.unwrap();
        assert_eq!(result["Business Manager"].len(), 1);
        assert!(result["Analyst"].is_empty());
    }

    struct StaticProvider(PostingBatches);

    #[async_trait]
    impl PostingProvider for StaticProvider {
        async fn all_postings_of(&self, _queries: &[String]) -> Result<PostingBatches> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_snapshotting_provider_saves_what_it_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SnapshottingProvider::new(StaticProvider(batches()), dir.path().to_path_buf());
        let queries = vec!["Business Manager".to_string()];

        let fetched = provider.all_postings_of(&queries).await.unwrap();
        let saved = read_snapshot(&dir.path().join(snapshot_file_name(&queries))).unwrap();
        assert_eq!(fetched, saved);
    }

    #[test]
    fn test_malformed_snapshot_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(read_snapshot(&path).is_err());
    }
}
