pub mod explain;
pub mod leaderboard;
pub mod search;

use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

/// Every boundary error takes the same `{ "error": message }` shape.
pub(crate) fn error_response(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "error": message.into() })))
}
