use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error_response;
use crate::catalog::search::Cursor;
use crate::models::{SearchRequest, SearchResponse};
use crate::pipeline::{run_search, PipelineError};
use crate::state::AppState;

/// POST /api/search — one page of the result-assembly pipeline:
/// embed → similarity search (cursor + exclusions) → sort → popularity
/// increment → next cursor → enrichment per configured strategy.
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<serde_json::Value>)> {
    let limit = req.limit.unwrap_or(state.config.default_limit);
    let cursor = Cursor {
        last_score: req.last_score,
        last_id: req.last_id,
    };

    let outcome = run_search(&state, &req.query, limit, cursor, req.exclude_ids.as_deref())
        .await
        .map_err(|e| {
            let status = match &e {
                PipelineError::InvalidQuery => StatusCode::BAD_REQUEST,
                PipelineError::Embedding(_) | PipelineError::Search(_) => StatusCode::BAD_GATEWAY,
            };
            if status.is_server_error() {
                tracing::error!("Search pipeline failed: {e:#}");
            }
            error_response(status, e.to_string())
        })?;

    Ok(Json(SearchResponse {
        results: outcome.results,
        pagination: outcome.pagination,
    }))
}
