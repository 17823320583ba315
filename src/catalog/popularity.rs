//! Search-popularity counters: a best-effort increment fired after every
//! results page, and the leaderboard built from those counters.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::CatalogConfig;
use crate::models::LeaderboardEntry;

const LEADERBOARD_LIMIT: usize = 200;

#[derive(Serialize)]
struct IncrementRequest {
    course_ids: Vec<i64>,
}

#[derive(Serialize)]
struct LeaderboardRpcRequest {
    limit_count: usize,
}

/// Increment the search counter for every course on a results page.
///
/// Strictly fire-and-forget: callers run this in a detached task, the
/// response body is ignored, and any failure is logged and swallowed.
pub async fn increment_popularity(
    client: &reqwest::Client,
    config: &CatalogConfig,
    course_ids: Vec<i64>,
) {
    if course_ids.is_empty() || config.base_url.is_empty() {
        return;
    }

    let url = config.rpc_url("increment_course_popularity");
    let result = client
        .post(&url)
        .header("apikey", &config.anon_key)
        .header("Authorization", format!("Bearer {}", config.anon_key))
        .json(&IncrementRequest { course_ids })
        .send()
        .await;

    match result {
        Ok(resp) if !resp.status().is_success() => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!("Popularity RPC returned {status}: {body}");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!("Failed to increment course popularity: {e}");
        }
    }
}

/// Fetch the top entries of the popularity leaderboard.
pub async fn fetch_leaderboard(
    client: &reqwest::Client,
    config: &CatalogConfig,
) -> Result<Vec<LeaderboardEntry>> {
    let url = config.rpc_url("get_leaderboard");
    let resp = client
        .post(&url)
        .header("apikey", &config.anon_key)
        .header("Authorization", format!("Bearer {}", config.anon_key))
        .json(&LeaderboardRpcRequest {
            limit_count: LEADERBOARD_LIMIT,
        })
        .send()
        .await
        .context("Failed to call leaderboard RPC")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Leaderboard RPC returned {status}: {body}");
    }

    resp.json()
        .await
        .context("Failed to parse leaderboard response")
}

/// Total number of courses with a popularity row. Best-effort: any failure
/// reads as zero so the leaderboard itself still renders.
pub async fn fetch_popularity_count(client: &reqwest::Client, config: &CatalogConfig) -> i64 {
    let url = config.rpc_url("get_popularity_count");
    let result = client
        .post(&url)
        .header("apikey", &config.anon_key)
        .header("Authorization", format!("Bearer {}", config.anon_key))
        .json(&serde_json::json!({}))
        .send()
        .await;

    match result {
        Ok(resp) if resp.status().is_success() => {
            resp.json::<i64>().await.unwrap_or(0)
        }
        Ok(resp) => {
            tracing::warn!("Popularity count RPC returned {}", resp.status());
            0
        }
        Err(e) => {
            tracing::warn!("Failed to fetch popularity count: {e}");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_request_shape() {
        let req = IncrementRequest {
            course_ids: vec![3, 1, 4],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["course_ids"], serde_json::json!([3, 1, 4]));
    }

    #[tokio::test]
    async fn test_increment_with_empty_ids_is_a_noop() {
        // Must not attempt a network call for an empty page
        let client = reqwest::Client::new();
        let config = CatalogConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            anon_key: "k".to_string(),
            ..Default::default()
        };
        increment_popularity(&client, &config, Vec::new()).await;
    }

    #[tokio::test]
    async fn test_increment_swallows_connection_errors() {
        // Nothing listens on this port; the call must still return cleanly
        let client = reqwest::Client::new();
        let config = CatalogConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            anon_key: "k".to_string(),
            ..Default::default()
        };
        increment_popularity(&client, &config, vec![1, 2]).await;
    }
}
