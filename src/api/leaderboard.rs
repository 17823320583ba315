use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error_response;
use crate::catalog::popularity::{fetch_leaderboard, fetch_popularity_count};
use crate::models::LeaderboardResponse;
use crate::state::AppState;

/// GET /api/leaderboard — courses ranked by how often search surfaced them.
pub async fn leaderboard(
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, (StatusCode, Json<serde_json::Value>)> {
    let entries = fetch_leaderboard(&state.http_client, &state.config.catalog)
        .await
        .map_err(|e| {
            tracing::error!("Leaderboard fetch failed: {e:#}");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        })?;

    // Best-effort; a failure here must not take the leaderboard down with it
    let total_rows = fetch_popularity_count(&state.http_client, &state.config.catalog).await;

    Ok(Json(LeaderboardResponse {
        leaderboard: entries,
        total_rows,
    }))
}
