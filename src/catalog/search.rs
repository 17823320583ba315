use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::CatalogConfig;
use crate::models::CourseRecord;

/// Cursor boundary for one page request: the next page contains only rows
/// with `(similarity, id)` strictly below this pair under descending order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    pub last_score: Option<f64>,
    pub last_id: Option<i64>,
}

#[derive(Serialize)]
struct SearchRpcRequest<'a> {
    query_embedding: &'a [f64],
    limit_count: usize,
    last_score: Option<f64>,
    last_id: Option<i64>,
    exclude_ids: Option<&'a [i64]>,
}

/// Fetch one page of scored courses from the catalog store.
///
/// The store filters by the cursor boundary and the exclusion set
/// server-side; callers must still re-sort the page, since the store's
/// ordering is not trusted to be stable across pagination boundaries.
pub async fn search_courses(
    client: &reqwest::Client,
    config: &CatalogConfig,
    embedding: &[f64],
    limit: usize,
    cursor: Cursor,
    exclude_ids: Option<&[i64]>,
) -> Result<Vec<CourseRecord>> {
    if config.base_url.is_empty() || config.anon_key.is_empty() {
        anyhow::bail!("Catalog credentials are not set");
    }

    let url = config.rpc_url(config.search_rpc());
    let req = SearchRpcRequest {
        query_embedding: embedding,
        limit_count: limit,
        last_score: cursor.last_score,
        last_id: cursor.last_id,
        exclude_ids,
    };

    let resp = client
        .post(&url)
        .header("apikey", &config.anon_key)
        .header("Authorization", format!("Bearer {}", config.anon_key))
        .json(&req)
        .send()
        .await
        .context("Failed to call catalog search RPC")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Catalog search RPC returned {status}: {body}");
    }

    let records: Vec<CourseRecord> = resp
        .json()
        .await
        .context("Failed to parse catalog search response")?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_request_serializes_nulls_for_first_page() {
        let embedding = vec![0.6, 0.8];
        let req = SearchRpcRequest {
            query_embedding: &embedding,
            limit_count: 3,
            last_score: None,
            last_id: None,
            exclude_ids: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["limit_count"], 3);
        assert!(json["last_score"].is_null());
        assert!(json["last_id"].is_null());
        assert!(json["exclude_ids"].is_null());
    }

    #[test]
    fn test_rpc_request_carries_cursor_and_exclusions() {
        let embedding = vec![1.0];
        let exclude = vec![4, 9, 12];
        let req = SearchRpcRequest {
            query_embedding: &embedding,
            limit_count: 3,
            last_score: Some(0.74),
            last_id: Some(9),
            exclude_ids: Some(&exclude),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["last_score"], 0.74);
        assert_eq!(json["last_id"], 9);
        assert_eq!(json["exclude_ids"], serde_json::json!([4, 9, 12]));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_fast() {
        let client = reqwest::Client::new();
        let config = CatalogConfig::default();
        let err = search_courses(&client, &config, &[0.1], 3, Cursor::default(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("credentials"));
    }
}
