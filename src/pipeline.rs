//! Result-assembly pipeline: embed the query once, fetch one page of
//! similar courses, re-sort, fire the popularity increment, compute the
//! next cursor, and enrich with explanations per the configured strategy.

use std::time::Duration;

use thiserror::Error;

use crate::catalog::popularity::increment_popularity;
use crate::catalog::search::{search_courses, Cursor};
use crate::config::EnrichmentStrategy;
use crate::llm::embeddings::{embed_query, normalize};
use crate::llm::explain::explain;
use crate::models::{CourseRecord, Pagination};
use crate::state::AppState;

/// Failures that abort the whole search request. Explanation failures are
/// deliberately absent: they degrade per course, never fatally.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Query is required and must be a non-empty string")]
    InvalidQuery,
    #[error("Embedding service unavailable: {0}")]
    Embedding(#[source] anyhow::Error),
    #[error("Catalog search unavailable: {0}")]
    Search(#[source] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<CourseRecord>,
    pub pagination: Pagination,
}

/// Run one page of the search pipeline.
///
/// `cursor` and `exclude_ids` come from the caller's session state; each
/// invocation is an independent page fetch with no server-side session.
pub async fn run_search(
    state: &AppState,
    query: &str,
    limit: usize,
    cursor: Cursor,
    exclude_ids: Option<&[i64]>,
) -> Result<SearchOutcome, PipelineError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(PipelineError::InvalidQuery);
    }

    let started = std::time::Instant::now();
    let embedding = embed_query(&state.http_client, &state.config.embedding, query)
        .await
        .map_err(PipelineError::Embedding)?;
    let embedding = normalize(&embedding);
    tracing::info!(
        "Embedded query ({} dims) in {:.2}s",
        embedding.len(),
        started.elapsed().as_secs_f64()
    );

    let raw = search_courses(
        &state.http_client,
        &state.config.catalog,
        &embedding,
        limit,
        cursor,
        exclude_ids,
    )
    .await
    .map_err(PipelineError::Search)?;

    // Full page ⇒ assume more exist. Wrong exactly when the store had
    // precisely `limit` rows left; the next fetch then comes back empty.
    let has_more = raw.len() == limit;

    let mut results = raw;
    sort_page(&mut results);

    if !results.is_empty() {
        let course_ids: Vec<i64> = results.iter().map(|r| r.id).collect();
        let client = state.http_client.clone();
        let catalog = state.config.catalog.clone();
        // Fire-and-forget: never joined, failures logged inside
        tokio::spawn(async move {
            increment_popularity(&client, &catalog, course_ids).await;
        });
    }

    let (last_score, last_id) = next_cursor(&results);

    let results = match state.config.enrichment {
        EnrichmentStrategy::Eager => enrich_eager(state, query, results).await,
        EnrichmentStrategy::Deferred => results,
    };

    tracing::info!(
        "Search pipeline returned {} results in {:.2}s",
        results.len(),
        started.elapsed().as_secs_f64()
    );

    Ok(SearchOutcome {
        results,
        pagination: Pagination {
            has_more,
            last_score,
            last_id,
        },
    })
}

/// Order a page by similarity descending, id descending on ties — the same
/// ordering the cursor boundary is defined over, so the last sorted record
/// is always the correct next boundary.
pub fn sort_page(records: &mut [CourseRecord]) {
    records.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.id.cmp(&a.id))
    });
}

/// Cursor for the next page: `(similarity, id)` of the last sorted record.
pub fn next_cursor(records: &[CourseRecord]) -> (Option<f64>, Option<i64>) {
    match records.last() {
        Some(last) => (Some(last.similarity), Some(last.id)),
        None => (None, None),
    }
}

/// Sequential enrichment with a fixed inter-call delay to respect upstream
/// rate limits. A course whose explanation failed is dropped, so the page
/// may come back shorter than requested.
async fn enrich_eager(
    state: &AppState,
    query: &str,
    records: Vec<CourseRecord>,
) -> Vec<CourseRecord> {
    let delay = Duration::from_millis(state.config.explain.enrich_delay_ms);
    let mut kept = Vec::with_capacity(records.len());

    for (i, mut record) in records.into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }
        match explain(
            &state.http_client,
            &state.config.explain,
            query,
            record.course_title.as_deref(),
            record.course_descr.as_deref(),
        )
        .await
        {
            Some(text) => {
                record.explanation = Some(text);
                kept.push(record);
            }
            None => {
                tracing::warn!(
                    "Dropping course {} from page: explanation unavailable",
                    record.id
                );
            }
        }
    }

    kept
}
