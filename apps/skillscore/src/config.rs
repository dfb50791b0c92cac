use std::path::PathBuf;

use anyhow::{Context, Result};

/// Runtime configuration loaded from environment variables.
/// Credentials are optional here; the client that needs them demands them.
#[derive(Debug, Clone)]
pub struct Config {
    pub usajobs_token: Option<String>,
    pub usajobs_email: Option<String>,
    pub onet_username: Option<String>,
    pub onet_password: Option<String>,
    pub onet_dir: PathBuf,
    pub snapshot_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_parallel_occupations: usize,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            usajobs_token: optional_env("USAJOBS_TOKEN"),
            usajobs_email: optional_env("USAJOBS_EMAIL"),
            onet_username: optional_env("ONET_USERNAME"),
            onet_password: optional_env("ONET_PASSWORD"),
            onet_dir: require_env("ONET_DIR")?.into(),
            snapshot_dir: std::env::var("SNAPSHOT_DIR")
                .unwrap_or_else(|_| "db".to_string())
                .into(),
            output_dir: std::env::var("OUTPUT_DIR")
                .unwrap_or_else(|_| ".".to_string())
                .into(),
            max_parallel_occupations: parse_parallelism(
                &std::env::var("MAX_PARALLEL_OCCUPATIONS").unwrap_or_else(|_| "10".to_string()),
            )?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// `(token, email)` for the USAJobs search API.
    pub fn usajobs_credentials(&self) -> Result<(String, String)> {
        Ok((
            required(&self.usajobs_token, "USAJOBS_TOKEN")?,
            required(&self.usajobs_email, "USAJOBS_EMAIL")?,
        ))
    }

    /// `(username, password)` for O*NET Web Services.
    pub fn onet_credentials(&self) -> Result<(String, String)> {
        Ok((
            required(&self.onet_username, "ONET_USERNAME")?,
            required(&self.onet_password, "ONET_PASSWORD")?,
        ))
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(value: &Option<String>, key: &str) -> Result<String> {
    value
        .clone()
        .with_context(|| format!("Environment variable '{key}' is needed for this run but is not set"))
}

fn parse_parallelism(raw: &str) -> Result<usize> {
    let n = raw
        .trim()
        .parse::<usize>()
        .context("MAX_PARALLEL_OCCUPATIONS must be a positive integer")?;
    anyhow::ensure!(n > 0, "MAX_PARALLEL_OCCUPATIONS must be at least 1");
    Ok(n)
}
