use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::config::EmbeddingConfig;

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: String,
}

/// Generate an embedding for a single query string.
///
/// The endpoint may answer in either the OpenAI-compatible shape
/// (`data[0].embedding`) or the provider-native shape (`embeddings[0]`);
/// both are accepted. No retry here — failures propagate to the pipeline,
/// which treats them as fatal for the request.
pub async fn embed_query(
    client: &reqwest::Client,
    config: &EmbeddingConfig,
    text: &str,
) -> Result<Vec<f64>> {
    let req = EmbedRequest {
        model: config.model.clone(),
        input: text.to_string(),
    };

    let mut builder = client.post(&config.api_url).json(&req);
    if let Some(key) = config.api_key.as_deref() {
        builder = builder.header("Authorization", format!("Bearer {key}"));
    }

    let resp = builder
        .send()
        .await
        .context("Failed to call embedding API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Embedding API returned {status}: {body}");
    }

    let body: Value = resp
        .json()
        .await
        .context("Failed to parse embedding response")?;

    parse_embedding(&body).context("Unexpected embedding response format")
}

/// Extract the vector from either accepted response shape.
fn parse_embedding(body: &Value) -> Option<Vec<f64>> {
    // OpenAI-compatible: { "data": [{ "embedding": [..] }] }
    if let Some(embedding) = body
        .get("data")
        .and_then(|d| d.get(0))
        .and_then(|e| e.get("embedding"))
        .and_then(Value::as_array)
    {
        return collect_floats(embedding);
    }

    // Native: { "embeddings": [[..]] }
    if let Some(embedding) = body
        .get("embeddings")
        .and_then(|e| e.get(0))
        .and_then(Value::as_array)
    {
        return collect_floats(embedding);
    }

    None
}

fn collect_floats(values: &[Value]) -> Option<Vec<f64>> {
    values.iter().map(Value::as_f64).collect()
}

/// L2-normalize a vector to unit length. The zero vector has no direction
/// and is passed through unchanged.
pub fn normalize(vector: &[f64]) -> Vec<f64> {
    let magnitude = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if magnitude == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / magnitude).collect()
}
