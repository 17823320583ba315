use serde::{Deserialize, Serialize};

/// A course returned by similarity search. `similarity` is computed per query
/// by the catalog store; `explanation` exists only in this process and is
/// populated lazily by the explanation generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: i64,
    /// Slash-delimited course codes, e.g. "CS 229/STATS 229"
    pub course_codes: String,
    pub course_title: Option<String>,
    pub course_descr: Option<String>,
    #[serde(default)]
    pub instructors: Option<String>,
    /// Cosine similarity to the query vector, in [0, 1]
    pub similarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Search request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
    /// Similarity score of the last result on the previous page
    #[serde(default)]
    pub last_score: Option<f64>,
    /// Id of the last result on the previous page (tiebreak for equal scores)
    #[serde(default)]
    pub last_id: Option<i64>,
    /// Every course id already shown in this search session
    #[serde(default)]
    pub exclude_ids: Option<Vec<i64>>,
}

/// Search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<CourseRecord>,
    pub pagination: Pagination,
}

/// Cursor state returned with every page, fed back on "load more".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub has_more: bool,
    pub last_score: Option<f64>,
    pub last_id: Option<i64>,
}

/// Explain request: one (query, course) pair
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
    pub query: String,
    #[serde(default)]
    pub course_title: Option<String>,
    #[serde(default)]
    pub course_descr: Option<String>,
}

/// A single chat turn sent to the text-generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// One row of the search-popularity leaderboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: i64,
    pub course_codes: String,
    pub course_title: Option<String>,
    pub search_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub total_rows: i64,
}
