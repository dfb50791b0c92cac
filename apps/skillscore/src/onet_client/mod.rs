//! O*NET Web Services client: resolves free-text job titles to O*NET-SOC
//! occupation codes.
//!
//! Only the `about` and `online/search` endpoints are used; the competency
//! data itself comes from the local text database (see `taxonomy::onet_db`).
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const ONET_API_URL: &str = "https://services.onetcenter.org/ws/";
const MAX_RETRIES: u32 = 3;
const TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum OnetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("O*NET API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("O*NET credentials were rejected")]
    Unauthorized,

    #[error("Gave up after {retries} retries")]
    Exhausted { retries: u32 },
}

#[derive(Debug, Deserialize)]
pub struct AboutResponse {
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OccupationHit {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub relevance_score: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    occupation: Vec<OccupationHit>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct OnetClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl OnetClient {
    pub fn new(username: String, password: String) -> Result<Self, OnetError> {
        Self::with_base_url(ONET_API_URL.to_string(), username, password)
    }

    pub fn with_base_url(
        base_url: String,
        username: String,
        password: String,
    ) -> Result<Self, OnetError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url,
            username,
            password,
        })
    }

    /// Makes a GET against `path`, retrying 429 and 5xx with exponential backoff.
    async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, OnetError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<OnetError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "O*NET call {path} attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .get(&url)
                .basic_auth(&self.username, Some(&self.password))
                .header("Accept", "application/json")
                .query(query)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(OnetError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("O*NET API returned {}: {}", status, body);
                last_error = Some(OnetError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(OnetError::Unauthorized);
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(OnetError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            debug!("O*NET call {path} succeeded");
            return Ok(response.json().await?);
        }

        Err(last_error.unwrap_or(OnetError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }

    /// The service's API version.
    pub async fn about(&self) -> Result<String, OnetError> {
        let about: AboutResponse = self.call("about", &[]).await?;
        Ok(about.api_version)
    }

    /// The most relevant occupation for a keyword, or `None` if nothing matched.
    pub async fn search_occupation(&self, keyword: &str) -> Result<Option<OccupationHit>, OnetError> {
        let result: SearchResponse = self
            .call("online/search", &[("keyword", keyword)])
            .await?;
        Ok(first_hit(result))
    }
}

fn first_hit(result: SearchResponse) -> Option<OccupationHit> {
    result.occupation.into_iter().next()
}
