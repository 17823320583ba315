//! Explanation generator: turns one (query, course) pair into a short
//! advisor-style explanation via an OpenAI-compatible chat endpoint.
//!
//! Two modes share the same prompt:
//! - blocking: full text or `None` after a bounded retry loop
//! - streaming: SSE content deltas as they arrive, no retry

use std::pin::Pin;
use std::time::Duration;

use anyhow::Result;
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ExplainConfig;
use crate::models::ChatMessage;

pub type ExplainStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// ─── Prompt construction ─────────────────────────────────

/// Build the system + user messages for one explanation. Deterministic:
/// the same (query, title, descr) triple always yields the same prompt.
pub fn build_messages(
    query: &str,
    course_title: Option<&str>,
    course_descr: Option<&str>,
) -> Vec<ChatMessage> {
    let system = "You are an expert course selector and academic advisor helping a student choose courses.\n\
        You receive the student's free-text query, plus the course title and official description.\n\
        Your job is to write a structured explanation with TWO distinct parts:\n\
        1. FIRST PART (~20 words): Connect the course to the student's query - briefly explain why this course fits their interests\n\
        2. SECOND PART (~40 words): Describe the course content and details\n\n\
        CRITICAL REQUIREMENTS:\n\
        - Start with \"This course is a good fit for your interests in [specific concepts from their query] because...\"\n\
        - FIRST PART (~20 words) must focus on connecting their query to the course - use their exact words/concepts\n\
        - SECOND PART (~40 words) should describe what the course covers and its key features\n\
        - ALWAYS extract and include prerequisites if mentioned in the course description - format them as underlined text using <u>prerequisite text</u>\n\
        - Put prerequisites on a NEW LINE at the end - add a blank line before prerequisites, then \"Prerequisites: ...\" on its own line\n\
        - Be professional, knowledgeable, and advisor-like in your tone\n\
        - Never mention word counts or that you are an AI."
        .to_string();

    let user = format!(
        "Write an explanation with this structure. Keep the total at 60 words or fewer (excluding prerequisites):\n\n\
         FIRST PART (~20 words): Connect to student query - start with \"This course is a good fit for your interests in [concepts from: \"{query}\"] because...\" and explain why it matches.\n\n\
         SECOND PART (~40 words): Describe the course content, key topics, and what students learn.\n\n\
         PREREQUISITES: Always add a blank line, then put on the next line either \"Prerequisites: <u>course codes</u>\" if prerequisites exist, or \"Prerequisites: None mentioned\" if none are found\n\n\
         Student query: \"{query}\"\n\
         Course title: {}\n\
         Course description:\n{}\n\n\
         Write the explanation. Prerequisites on their own new line at the end.",
        course_title.unwrap_or("N/A"),
        course_descr.unwrap_or("N/A"),
    );

    vec![
        ChatMessage {
            role: "system".to_string(),
            content: system,
        },
        ChatMessage {
            role: "user".to_string(),
            content: user,
        },
    ]
}

// ─── Wire types ──────────────────────────────────────────

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

// ─── Blocking mode ───────────────────────────────────────

/// Outcome of one upstream call, split by retryability.
enum CallError {
    /// HTTP 4xx other than 429: the request itself is bad, retrying cannot help.
    Client(reqwest::StatusCode, String),
    /// 429, 5xx, network error, timeout: worth another attempt.
    Retryable(anyhow::Error),
}

/// Generate one complete explanation, retrying transient upstream failures.
///
/// Up to `max_attempts` tries; failed attempt N sleeps N * retry_base_delay
/// before the next. A 4xx aborts immediately. `None` means "omit this
/// course's explanation" — it is never an error the caller must handle.
pub async fn explain(
    client: &reqwest::Client,
    config: &ExplainConfig,
    query: &str,
    course_title: Option<&str>,
    course_descr: Option<&str>,
) -> Option<String> {
    let messages = build_messages(query, course_title, course_descr);

    for attempt in 1..=config.max_attempts {
        match call_complete(client, config, &messages).await {
            Ok(text) => return Some(text),
            Err(CallError::Client(status, body)) => {
                tracing::warn!("Explanation rejected with {status}, not retrying: {body}");
                return None;
            }
            Err(CallError::Retryable(e)) => {
                tracing::warn!(
                    "Explanation attempt {attempt}/{} failed: {e}",
                    config.max_attempts
                );
                if attempt < config.max_attempts {
                    let delay = Duration::from_millis(
                        u64::from(attempt) * config.retry_base_delay_ms,
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    tracing::warn!("Explanation gave up after {} attempts", config.max_attempts);
    None
}

async fn call_complete(
    client: &reqwest::Client,
    config: &ExplainConfig,
    messages: &[ChatMessage],
) -> std::result::Result<String, CallError> {
    let req = ChatCompletionRequest {
        model: config.model.clone(),
        messages: messages.to_vec(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        stream: false,
    };

    let mut builder = client
        .post(&config.api_url)
        .timeout(Duration::from_secs(config.timeout_secs))
        .json(&req);
    if let Some(key) = config.api_key.as_deref() {
        builder = builder.header("Authorization", format!("Bearer {key}"));
    }

    let resp = builder
        .send()
        .await
        .map_err(|e| CallError::Retryable(anyhow::anyhow!("Explanation API unreachable: {e}")))?;

    let status = resp.status();
    if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
        let body = resp.text().await.unwrap_or_default();
        return Err(CallError::Client(status, body));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(CallError::Retryable(anyhow::anyhow!(
            "Explanation API returned {status}: {body}"
        )));
    }

    let body: ChatCompletionResponse = resp
        .json()
        .await
        .map_err(|e| CallError::Retryable(anyhow::anyhow!("Malformed completion response: {e}")))?;

    body.choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| CallError::Retryable(anyhow::anyhow!("Completion response had no choices")))
}

// ─── Streaming mode ──────────────────────────────────────

/// Why an explanation stream could not be opened. The upstream HTTP status
/// is kept so the boundary can pass it straight through to the client.
#[derive(Debug, Error)]
pub enum StreamOpenError {
    #[error("Explanation API returned {status}: {body}")]
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Failed to connect to explanation API for streaming: {0}")]
    Connect(#[from] reqwest::Error),
}

impl StreamOpenError {
    /// Status to serve at the boundary: the upstream's own status when
    /// there is one, 502 for connection-level failures.
    pub fn status(&self) -> reqwest::StatusCode {
        match self {
            Self::Upstream { status, .. } => *status,
            Self::Connect(_) => reqwest::StatusCode::BAD_GATEWAY,
        }
    }
}

/// Open an explanation stream. An error here means the stream could not be
/// opened; once open, a mid-stream failure surfaces as a single `Err` item
/// after whatever partial text was already yielded. No retry in this mode.
pub async fn explain_stream(
    client: &reqwest::Client,
    config: &ExplainConfig,
    query: &str,
    course_title: Option<&str>,
    course_descr: Option<&str>,
) -> Result<ExplainStream, StreamOpenError> {
    let req = ChatCompletionRequest {
        model: config.model.clone(),
        messages: build_messages(query, course_title, course_descr),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        stream: true,
    };

    let mut builder = client
        .post(&config.api_url)
        .timeout(Duration::from_secs(config.timeout_secs))
        .json(&req);
    if let Some(key) = config.api_key.as_deref() {
        builder = builder.header("Authorization", format!("Bearer {key}"));
    }

    let resp = builder.send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(StreamOpenError::Upstream { status, body });
    }

    let stream = stream_lines(resp.bytes_stream()).filter_map(|line_result| async move {
        match line_result {
            Ok(line) => parse_sse_line(&line),
            Err(e) => Some(Err(e)),
        }
    });

    Ok(Box::pin(stream))
}

/// Parse a single SSE line. Returns:
/// - Some(Ok(content)) for content deltas
/// - None to skip (non-data lines, [DONE], empty deltas, malformed fragments)
fn parse_sse_line(line: &str) -> Option<Result<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let data = line.strip_prefix("data: ")?.trim();
    if data == "[DONE]" {
        return None;
    }

    // Malformed fragments are skipped, not fatal
    let chunk: StreamChunk = serde_json::from_str(data).ok()?;
    let content = chunk
        .choices
        .first()
        .and_then(|c| c.delta.content.clone())
        .unwrap_or_default();
    if content.is_empty() {
        return None;
    }
    Some(Ok(content))
}

/// Convert a byte stream into a stream of complete lines.
fn stream_lines(
    byte_stream: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> impl Stream<Item = Result<String>> + Send {
    futures_util::stream::unfold(
        (Box::pin(byte_stream), String::new()),
        |(mut stream, mut buffer)| async move {
            loop {
                // First, try to extract a complete line from the buffer
                if let Some(newline_pos) = buffer.find('\n') {
                    let line = buffer[..newline_pos].to_string();
                    buffer = buffer[newline_pos + 1..].to_string();
                    if !line.trim().is_empty() {
                        return Some((Ok(line), (stream, buffer)));
                    }
                    continue;
                }

                // Buffer has no complete line — read more bytes
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                    }
                    Some(Err(e)) => {
                        return Some((
                            Err(anyhow::anyhow!("Stream read error: {e}")),
                            (stream, buffer),
                        ));
                    }
                    None => {
                        // Stream ended — emit remaining buffer if non-empty
                        if !buffer.trim().is_empty() {
                            let remaining = std::mem::take(&mut buffer);
                            return Some((Ok(remaining), (stream, buffer)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Prompt construction ─────────────────────────────

    #[test]
    fn test_messages_structure() {
        let msgs = build_messages("machine learning", Some("CS 229"), Some("Supervised learning."));
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert_eq!(msgs[1].role, "user");
    }

    #[test]
    fn test_user_message_embeds_query_and_course() {
        let msgs = build_messages(
            "quantum computing",
            Some("PHYS 152"),
            Some("Qubits and gates."),
        );
        assert!(msgs[1].content.contains("quantum computing"));
        assert!(msgs[1].content.contains("PHYS 152"));
        assert!(msgs[1].content.contains("Qubits and gates."));
    }

    #[test]
    fn test_missing_title_and_descr_fall_back_to_na() {
        let msgs = build_messages("poetry", None, None);
        assert!(msgs[1].content.contains("Course title: N/A"));
        assert!(msgs[1].content.contains("Course description:\nN/A"));
    }

    #[test]
    fn test_system_message_mandates_structure() {
        let msgs = build_messages("q", None, None);
        let system = &msgs[0].content;
        assert!(system.contains("FIRST PART"));
        assert!(system.contains("SECOND PART"));
        assert!(system.contains("Prerequisites:"));
        assert!(system.contains("<u>"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_messages("dance", Some("T"), Some("D"));
        let b = build_messages("dance", Some("T"), Some("D"));
        assert_eq!(a[0].content, b[0].content);
        assert_eq!(a[1].content, b[1].content);
    }

    // ─── SSE parsing ─────────────────────────────────────

    #[test]
    fn test_parse_sse_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"This course"}}]}"#;
        let result = parse_sse_line(line);
        assert_eq!(result.unwrap().unwrap(), "This course");
    }

    #[test]
    fn test_parse_sse_done_sentinel() {
        assert!(parse_sse_line("data: [DONE]").is_none());
    }

    #[test]
    fn test_parse_sse_empty_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":null}}]}"#;
        assert!(parse_sse_line(line).is_none());
    }

    #[test]
    fn test_parse_sse_role_only_chunk() {
        let line = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert!(parse_sse_line(line).is_none());
    }

    #[test]
    fn test_parse_sse_malformed_fragment_skipped() {
        // Malformed fragments are skipped per protocol, never fatal
        assert!(parse_sse_line("data: {broken json").is_none());
    }

    #[test]
    fn test_parse_sse_non_data_line() {
        assert!(parse_sse_line("event: message").is_none());
        assert!(parse_sse_line(": keepalive").is_none());
    }

    #[test]
    fn test_parse_sse_empty_line() {
        assert!(parse_sse_line("").is_none());
        assert!(parse_sse_line("   ").is_none());
    }

    // ─── Line buffering ──────────────────────────────────

    #[tokio::test]
    async fn test_stream_lines_splits_on_newline() {
        let chunks: Vec<reqwest::Result<bytes::Bytes>> = vec![
            Ok(bytes::Bytes::from("data: a\nda")),
            Ok(bytes::Bytes::from("ta: b\n")),
        ];
        let byte_stream = futures_util::stream::iter(chunks);
        let lines: Vec<String> = stream_lines(byte_stream)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["data: a", "data: b"]);
    }

    #[tokio::test]
    async fn test_stream_lines_emits_trailing_buffer() {
        let chunks: Vec<reqwest::Result<bytes::Bytes>> =
            vec![Ok(bytes::Bytes::from("no trailing newline"))];
        let byte_stream = futures_util::stream::iter(chunks);
        let lines: Vec<String> = stream_lines(byte_stream)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["no trailing newline"]);
    }
}
