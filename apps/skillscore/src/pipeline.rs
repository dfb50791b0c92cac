//! Per-occupation scoring run and the fan-out across occupations.
//!
//! One run fetches the taxonomy and the postings side by side, then hands
//! both to the synchronous scoring core on the blocking pool:
//! matcher → aggregate → merge → table → join counts → normalize → reweight.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};

use crate::errors::{PipelineError, ScoreError, Stage};
use crate::matcher::SkillExtractorKind;
use crate::postings::{PostingBatches, PostingProvider};
use crate::report::top_by_count;
use crate::scoring::aggregate::{aggregate, merge, total_mentions};
use crate::scoring::competency::{apply_counts, build_table};
use crate::scoring::models::{Posting, ProbColumn, ScoreRow};
use crate::scoring::probability::{normalize_probabilities, validate_alpha};
use crate::scoring::reweight::reweight;
use crate::taxonomy::{Taxonomy, TaxonomyProvider};

const TOP_SKILLS_LOGGED: usize = 5;

/// Scoring knobs shared by every occupation in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOptions {
    pub extractor: SkillExtractorKind,
    pub alpha: f64,
    pub prob: ProbColumn,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            extractor: SkillExtractorKind::default(),
            alpha: 1.0,
            prob: ProbColumn::default(),
        }
    }
}

/// One occupation and the job-title queries whose postings describe it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRequest {
    pub occupation_id: String,
    pub jobs: Vec<String>,
    pub options: ScoreOptions,
}

pub type OccupationOutcome = (String, Result<Vec<ScoreRow>, PipelineError>);

/// Scores one occupation end to end.
pub async fn update_scores(
    request: &ScoreRequest,
    taxonomies: &dyn TaxonomyProvider,
    postings: &dyn PostingProvider,
) -> Result<Vec<ScoreRow>, PipelineError> {
    let span = info_span!("occupation", id = %request.occupation_id);
    run_occupation(request, taxonomies, postings)
        .instrument(span)
        .await
}

async fn run_occupation(
    request: &ScoreRequest,
    taxonomies: &dyn TaxonomyProvider,
    postings: &dyn PostingProvider,
) -> Result<Vec<ScoreRow>, PipelineError> {
    let id = request.occupation_id.as_str();
    validate_alpha(request.options.alpha)
        .map_err(|e| PipelineError::new(id, Stage::Normalization, e))?;

    let (taxonomy, batches) = tokio::join!(
        taxonomies.taxonomy_for(id),
        postings.all_postings_of(&request.jobs)
    );
    let taxonomy = taxonomy.map_err(|e| PipelineError::new(id, Stage::Taxonomy, e))?;
    let batches = batches.map_err(|e| PipelineError::new(id, Stage::Postings, e))?;
    taxonomy.log_summary();

    let ordered = batches_in_query_order(&request.jobs, batches);
    let found: usize = ordered.iter().map(Vec::len).sum();
    if found == 0 {
        return Err(PipelineError::new(
            id,
            Stage::Postings,
            ScoreError::Data(format!("no postings found for {:?}", request.jobs)),
        ));
    }

    let options = request.options;
    let occupation_id = id.to_string();
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        score_occupation(&occupation_id, &taxonomy, &ordered, options)
    })
    .await
    .map_err(|e| PipelineError::new(id, Stage::Aggregation, e))?
}

/// Takes batches in the order the queries were given, logging each size.
fn batches_in_query_order(
    jobs: &[String],
    mut batches: PostingBatches,
) -> Vec<Vec<Posting>> {
    jobs.iter()
        .map(|job| {
            let postings = batches.remove(job).unwrap_or_default();
            info!("'{job}': {} postings", postings.len());
            postings
        })
        .collect()
}

/// The synchronous scoring core for one occupation.
fn score_occupation(
    id: &str,
    taxonomy: &Taxonomy,
    batches: &[Vec<Posting>],
    options: ScoreOptions,
) -> Result<Vec<ScoreRow>, PipelineError> {
    let matcher = options
        .extractor
        .build(&taxonomy.competencies)
        .map_err(|e| PipelineError::new(id, Stage::Aggregation, e))?;
    info!("Matching skills with {}", matcher.backend());

    let counts = merge(batches.iter().map(|b| aggregate(b, matcher.as_ref())));
    info!(
        "unique skills {} in total {} skills",
        counts.len(),
        total_mentions(&counts)
    );

    let mut rows = build_table(&taxonomy.competencies)
        .map_err(|e| PipelineError::new(id, Stage::Taxonomy, e))?;
    let dropped = apply_counts(&mut rows, &counts);
    if dropped > 0 {
        info!("{dropped} matched skills are not in the score table");
    }

    for row in top_by_count(&rows, TOP_SKILLS_LOGGED) {
        info!("top skill {} ({}): {} mentions", row.name, row.id, row.count);
    }

    normalize_probabilities(&mut rows, options.alpha, taxonomy.num_edges)
        .map_err(|e| PipelineError::new(id, Stage::Normalization, e))?;
    reweight(&mut rows, options.prob).map_err(|e| PipelineError::new(id, Stage::Reweighting, e))?;

    Ok(rows)
}

/// Scores every request, at most `max_parallel` at a time. A failed
/// occupation never cancels the others. Outcomes come back in request order.
pub async fn run_all(
    requests: Vec<ScoreRequest>,
    taxonomies: Arc<dyn TaxonomyProvider>,
    postings: Arc<dyn PostingProvider>,
    max_parallel: usize,
) -> Vec<OccupationOutcome> {
    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let ids: Vec<String> = requests.iter().map(|r| r.occupation_id.clone()).collect();
    let mut set = JoinSet::new();

    for (index, request) in requests.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let taxonomies = taxonomies.clone();
        let postings = postings.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let result = update_scores(&request, taxonomies.as_ref(), postings.as_ref()).await;
            (index, result)
        });
    }

    let mut results: Vec<Option<Result<Vec<ScoreRow>, PipelineError>>> =
        ids.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => error!("Occupation task did not complete: {e}"),
        }
    }

    ids.into_iter()
        .zip(results)
        .map(|(id, result)| {
            let result = result.unwrap_or_else(|| {
                Err(PipelineError::new(
                    &id,
                    Stage::Aggregation,
                    anyhow::anyhow!("scoring task did not complete"),
                ))
            });
            (id, result)
        })
        .collect()
}
