mod config;
mod errors;
mod matcher;
mod onet_client;
mod pipeline;
mod postings;
mod report;
mod scoring;
mod taxonomy;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::errors::ScoreError;
use crate::matcher::SkillExtractorKind;
use crate::onet_client::OnetClient;
use crate::pipeline::{run_all, ScoreOptions, ScoreRequest};
use crate::postings::{PostingProvider, SnapshotPostingProvider, SnapshottingProvider, UsaJobsClient};
use crate::report::write_scores;
use crate::scoring::models::ProbColumn;
use crate::scoring::probability::validate_alpha;
use crate::taxonomy::{OnetDatabase, TaxonomyProvider};

#[derive(Parser, Debug)]
#[command(name = "skillscore", version, about = "Re-score occupation skill importance from job postings")]
struct Args {
    /// Job titles to search postings for
    #[arg(required = true)]
    jobs: Vec<String>,

    /// Skill matching strategy (exact_match | fuzzy_search)
    #[arg(long, default_value = "exact_match")]
    extractor: SkillExtractorKind,

    /// Add-alpha smoothing strength
    #[arg(long, default_value_t = 1.0, value_parser = parse_alpha)]
    alpha: f64,

    /// Probability column feeding the reweighter
    #[arg(long, default_value = "smoothed")]
    prob: ProbColumn,

    /// Score this O*NET-SOC code for all jobs instead of looking codes up
    #[arg(long)]
    occupation: Option<String>,

    /// Score from a saved postings snapshot instead of fetching
    #[arg(long)]
    postings: Option<PathBuf>,
}

fn parse_alpha(raw: &str) -> Result<f64, ScoreError> {
    let alpha = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| ScoreError::Validation(format!("alpha '{raw}' is not a number")))?;
    validate_alpha(alpha)?;
    Ok(alpha)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting skillscore v{}", env!("CARGO_PKG_VERSION"));

    let options = ScoreOptions {
        extractor: args.extractor,
        alpha: args.alpha,
        prob: args.prob,
    };
    info!(
        "Scoring with {} (alpha {}, reweighting on {})",
        options.extractor, options.alpha, options.prob
    );

    let requests = match &args.occupation {
        Some(code) => vec![ScoreRequest {
            occupation_id: code.clone(),
            jobs: args.jobs.clone(),
            options,
        }],
        None => lookup_occupations(&config, &args.jobs, options).await?,
    };
    anyhow::ensure!(
        !requests.is_empty(),
        "None of the job titles matched an O*NET occupation"
    );

    let taxonomies: Arc<dyn TaxonomyProvider> = Arc::new(OnetDatabase::open(&config.onet_dir)?);
    let postings: Arc<dyn PostingProvider> = match &args.postings {
        Some(path) => Arc::new(SnapshotPostingProvider::open(path)?),
        None => {
            let (token, email) = config.usajobs_credentials()?;
            Arc::new(SnapshottingProvider::new(
                UsaJobsClient::new(token, email)?,
                config.snapshot_dir.clone(),
            ))
        }
    };

    let outcomes = run_all(
        requests,
        taxonomies,
        postings,
        config.max_parallel_occupations,
    )
    .await;

    let today = chrono::Local::now().date_naive();
    let total = outcomes.len();
    let mut failed = 0;
    for (occupation_id, outcome) in outcomes {
        match outcome {
            Ok(rows) => match write_scores(&config.output_dir, &occupation_id, today, &rows) {
                Ok(path) => info!("{occupation_id}: wrote {} scores to {}", rows.len(), path.display()),
                Err(e) => {
                    error!("{occupation_id}: failed to write scores: {e:#}");
                    failed += 1;
                }
            },
            Err(e) => {
                let kind = e.score_error().map_or("io", |core| core.kind());
                error!(occupation = %e.occupation_id, stage = %e.stage, kind, "{e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        error!("{failed} of {total} occupations failed");
        std::process::exit(1);
    }
    info!("All {total} occupations scored");
    Ok(())
}

/// Resolves each job title to its top O*NET occupation and groups titles
/// sharing a code into one request.
async fn lookup_occupations(
    config: &Config,
    jobs: &[String],
    options: ScoreOptions,
) -> Result<Vec<ScoreRequest>> {
    let (username, password) = config.onet_credentials()?;
    let onet = OnetClient::new(username, password)?;
    let version = onet
        .about()
        .await
        .context("O*NET Web Services is unreachable")?;
    info!("O*NET Web Services API v{version}");

    let mut resolved = Vec::with_capacity(jobs.len());
    for job in jobs {
        let hit = onet
            .search_occupation(job)
            .await
            .with_context(|| format!("O*NET occupation search failed for '{job}'"))?;
        match hit {
            Some(hit) => {
                info!(
                    "'{job}' -> {} {} (relevance {})",
                    hit.code, hit.title, hit.relevance_score
                );
                resolved.push((hit.code, job.clone()));
            }
            None => warn!("No O*NET occupation matches '{job}', skipping"),
        }
    }

    Ok(group_jobs(resolved, options))
}

fn group_jobs(
    resolved: impl IntoIterator<Item = (String, String)>,
    options: ScoreOptions,
) -> Vec<ScoreRequest> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (code, job) in resolved {
        groups.entry(code).or_default().push(job);
    }
    groups
        .into_iter()
        .map(|(occupation_id, jobs)| ScoreRequest {
            occupation_id,
            jobs,
            options,
        })
        .collect()
}
