use std::convert::Infallible;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use bytes::Bytes;
use futures_util::stream::StreamExt;

use crate::api::error_response;
use crate::llm::explain::explain_stream;
use crate::models::ExplainRequest;
use crate::state::AppState;

const IDLE_TIMEOUT_SECS: u64 = 30;

/// POST /api/explain — stream one course's explanation as plain-text chunks.
///
/// The client merges chunks into the course card as they arrive; a
/// mid-stream upstream failure simply ends the body, leaving whatever
/// partial text was already delivered.
pub async fn explain(
    State(state): State<AppState>,
    Json(req): Json<ExplainRequest>,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "query is required"));
    }

    let llm_stream = explain_stream(
        &state.http_client,
        &state.config.explain,
        &query,
        req.course_title.as_deref(),
        req.course_descr.as_deref(),
    )
    .await
    .map_err(|e| {
        tracing::error!("Failed to open explanation stream: {e}");
        // Upstream open failures keep their own status (a 429 stays a 429);
        // only connection-level failures read as 502
        error_response(e.status(), e.to_string())
    })?;

    let idle_timeout = Duration::from_secs(IDLE_TIMEOUT_SECS);
    let body_stream = futures_util::stream::unfold(
        (llm_stream, idle_timeout),
        |(mut llm_stream, timeout)| async move {
            match tokio::time::timeout(timeout, llm_stream.next()).await {
                Ok(Some(Ok(content))) => {
                    let chunk: Result<Bytes, Infallible> = Ok(Bytes::from(content));
                    Some((chunk, (llm_stream, timeout)))
                }
                Ok(Some(Err(e))) => {
                    // Partial text is already on the wire; just stop
                    tracing::warn!("Explanation stream failed mid-read: {e}");
                    None
                }
                Ok(None) => None, // Stream ended naturally
                Err(_) => {
                    tracing::warn!("Explanation stream idle for {IDLE_TIMEOUT_SECS}s, closing");
                    None
                }
            }
        },
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(response)
}
