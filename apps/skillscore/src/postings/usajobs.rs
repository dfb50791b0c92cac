//! USAJobs search API client. Walks every result page for a position title
//! and deduplicates postings by their matched object id.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::postings::{PostingBatches, PostingProvider};
use crate::scoring::models::Posting;

pub const USAJOBS_API_URL: &str = "https://data.usajobs.gov/api/Search";
const RESULTS_PER_PAGE: u32 = 500;
const MAX_RETRIES: u32 = 5;
const BACKOFF_FACTOR_SECS: u64 = 2;
const TIMEOUT_SECS: u64 = 5;
const RETRY_STATUSES: [u16; 3] = [502, 503, 504];

#[derive(Debug, Error)]
pub enum UsaJobsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("USAJobs API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Gave up after {retries} retries")]
    Exhausted { retries: u32 },

    #[error("Unreadable page count '{0}'")]
    PageCount(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchEnvelope {
    search_result: SearchResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResult {
    #[serde(default)]
    search_result_items: Vec<SearchResultItem>,
    user_area: UserArea,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UserArea {
    /// Sent as a string, occasionally as a number.
    number_of_pages: serde_json::Value,
}

impl UserArea {
    fn pages(&self) -> Result<u32, UsaJobsError> {
        match &self.number_of_pages {
            serde_json::Value::String(s) => s
                .trim()
                .parse()
                .map_err(|_| UsaJobsError::PageCount(s.clone())),
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| UsaJobsError::PageCount(n.to_string())),
            other => Err(UsaJobsError::PageCount(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResultItem {
    matched_object_id: String,
    matched_object_descriptor: Descriptor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Descriptor {
    #[serde(default)]
    position_title: String,
    #[serde(default)]
    qualification_summary: String,
}

#[derive(Clone)]
pub struct UsaJobsClient {
    client: Client,
    base_url: String,
    auth_key: String,
    email: String,
}

impl UsaJobsClient {
    pub fn new(auth_key: String, email: String) -> Result<Self, UsaJobsError> {
        Self::with_base_url(USAJOBS_API_URL.to_string(), auth_key, email)
    }

    pub fn with_base_url(
        base_url: String,
        auth_key: String,
        email: String,
    ) -> Result<Self, UsaJobsError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url,
            auth_key,
            email,
        })
    }

    /// One result page. Retries gateway errors and transport failures with
    /// exponential backoff: 2s, 4s, 8s, ...
    async fn search_page(&self, job: &str, page: u32) -> Result<SearchResult, UsaJobsError> {
        let per_page = RESULTS_PER_PAGE.to_string();
        let page_num = page.to_string();
        let mut params = vec![("ResultsPerPage", per_page.as_str()), ("Page", page_num.as_str())];
        if !job.is_empty() {
            params.push(("PositionTitle", job));
        }

        let mut last_error: Option<UsaJobsError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay =
                    std::time::Duration::from_secs(BACKOFF_FACTOR_SECS * (1 << (attempt - 1)));
                warn!(
                    "USAJobs page {page} for '{job}' attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .get(&self.base_url)
                .header("User-Agent", &self.email)
                .header("Authorization-Key", &self.auth_key)
                .query(&params)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(UsaJobsError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if RETRY_STATUSES.contains(&status.as_u16()) {
                last_error = Some(UsaJobsError::Api {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
                continue;
            }

            if !status.is_success() {
                return Err(UsaJobsError::Api {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }

            let envelope: SearchEnvelope = response.json().await?;
            return Ok(envelope.search_result);
        }

        Err(last_error.unwrap_or(UsaJobsError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }

    /// Every posting for a position title, across all result pages.
    pub async fn job_postings(&self, job: &str) -> Result<Vec<Posting>, UsaJobsError> {
        let first = self.search_page(job, 1).await?;
        let pages = first.user_area.pages()?;
        let mut items = first.search_result_items;

        for page in 2..=pages {
            debug!("Fetching USAJobs page {page}/{pages} for '{job}'");
            let result = self.search_page(job, page).await?;
            items.extend(result.search_result_items);
        }

        let (postings, duplicates) = dedup_postings(items);
        info!(
            "'{job}': found {} job postings ({duplicates} duplicates)",
            postings.len()
        );
        Ok(postings)
    }
}

/// Keeps one posting per matched object id. A later copy replaces the
/// earlier one in place. Returns the postings and the number of duplicates.
fn dedup_postings(items: Vec<SearchResultItem>) -> (Vec<Posting>, usize) {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut postings: Vec<Posting> = Vec::with_capacity(items.len());
    let mut duplicates = 0;

    for item in items {
        let posting = Posting {
            identifier: item.matched_object_id,
            title: item.matched_object_descriptor.position_title,
            description: item.matched_object_descriptor.qualification_summary,
        };
        match position.get(&posting.identifier) {
            Some(&i) => {
                duplicates += 1;
                postings[i] = posting;
            }
            None => {
                position.insert(posting.identifier.clone(), postings.len());
                postings.push(posting);
            }
        }
    }

    (postings, duplicates)
}

#[async_trait]
impl PostingProvider for UsaJobsClient {
    async fn all_postings_of(&self, queries: &[String]) -> anyhow::Result<PostingBatches> {
        let mut batches = PostingBatches::new();
        for query in queries {
            let postings = self.job_postings(query).await.with_context(|| {
                format!("fetching USAJobs postings for '{query}' (check USAJOBS_TOKEN and USAJOBS_EMAIL)")
            })?;
            batches.insert(query.clone(), postings);
        }
        Ok(batches)
    }
}
