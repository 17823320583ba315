use serde::{Deserialize, Serialize};

/// Top-level service configuration. Built once in `main` via [`Config::from_env`]
/// and passed by reference into every client — no ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Default page size when the request omits `limit`
    pub default_limit: usize,
    /// How search results are enriched with explanations
    pub enrichment: EnrichmentStrategy,
    /// Embedding service configuration
    pub embedding: EmbeddingConfig,
    /// Course-catalog store configuration
    pub catalog: CatalogConfig,
    /// Explanation generator configuration
    pub explain: ExplainConfig,
}

/// How the pipeline attaches explanations to a results page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStrategy {
    /// Generate explanations sequentially before responding; courses whose
    /// explanation failed are dropped from the page.
    Eager,
    /// Respond with raw results immediately; the client streams each
    /// explanation separately via /api/explain.
    Deferred,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding endpoint (OpenAI-compatible or native response shape)
    pub api_url: String,
    /// Bearer token for the embedding service
    pub api_key: Option<String>,
    /// Embedding model identifier
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog store (Supabase-style REST RPC)
    pub base_url: String,
    /// Anon key sent as both `apikey` and bearer token
    pub anon_key: String,
    /// Catalog snapshot selector; picks the search stored procedure
    pub term: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainConfig {
    /// Chat-completions endpoint for explanation generation
    pub api_url: String,
    /// Bearer token for the text-generation service
    pub api_key: Option<String>,
    /// Chat model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap
    pub max_tokens: u32,
    /// Blocking-mode attempt budget (first try included)
    pub max_attempts: u32,
    /// Backoff unit: after failed attempt N the generator waits N * this
    pub retry_base_delay_ms: u64,
    /// Inter-call delay between sequential eager enrichment calls
    pub enrich_delay_ms: u64,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            default_limit: 3,
            enrichment: EnrichmentStrategy::Deferred,
            embedding: EmbeddingConfig::default(),
            catalog: CatalogConfig::default(),
            explain: ExplainConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.deepinfra.com/v1/embeddings".to_string(),
            api_key: None,
            model: "Qwen/Qwen3-Embedding-4B".to_string(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            anon_key: String::new(),
            term: "spring26".to_string(),
        }
    }
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.cerebras.ai/v1/chat/completions".to_string(),
            api_key: None,
            model: "llama3.1-8b".to_string(),
            temperature: 0.7,
            max_tokens: 260,
            max_attempts: 5,
            retry_base_delay_ms: 1000,
            enrich_delay_ms: 300,
            timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("COURSE_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(val) = std::env::var("COURSE_SEARCH_DEFAULT_LIMIT") {
            if let Ok(v) = val.parse() {
                config.default_limit = v;
            }
        }
        if let Ok(val) = std::env::var("COURSE_SEARCH_ENRICHMENT") {
            match val.as_str() {
                "eager" => config.enrichment = EnrichmentStrategy::Eager,
                "deferred" => config.enrichment = EnrichmentStrategy::Deferred,
                other => tracing::warn!("Unknown enrichment strategy '{other}', keeping default"),
            }
        }

        if let Ok(url) = std::env::var("EMBEDDING_API_URL") {
            config.embedding.api_url = url;
        }
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            config.embedding.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(url) = std::env::var("CATALOG_BASE_URL") {
            config.catalog.base_url = url;
        }
        if let Ok(key) = std::env::var("CATALOG_ANON_KEY") {
            config.catalog.anon_key = key;
        }
        if let Ok(term) = std::env::var("CATALOG_TERM") {
            config.catalog.term = term;
        }

        if let Ok(url) = std::env::var("EXPLAIN_API_URL") {
            config.explain.api_url = url;
        }
        if let Ok(key) = std::env::var("EXPLAIN_API_KEY") {
            config.explain.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("EXPLAIN_MODEL") {
            config.explain.model = model;
        }
        if let Ok(val) = std::env::var("EXPLAIN_MAX_ATTEMPTS") {
            if let Ok(v) = val.parse() {
                config.explain.max_attempts = v;
            }
        }
        if let Ok(val) = std::env::var("EXPLAIN_RETRY_BASE_DELAY_MS") {
            if let Ok(v) = val.parse() {
                config.explain.retry_base_delay_ms = v;
            }
        }
        if let Ok(val) = std::env::var("EXPLAIN_ENRICH_DELAY_MS") {
            if let Ok(v) = val.parse() {
                config.explain.enrich_delay_ms = v;
            }
        }
        if let Ok(val) = std::env::var("EXPLAIN_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.explain.timeout_secs = v;
            }
        }

        config
    }
}

impl CatalogConfig {
    /// Stored procedure for paginated similarity search. The catalog keeps a
    /// distinct procedure per term snapshot; resolved from `term` set at
    /// startup, never from request data.
    pub fn search_rpc(&self) -> &'static str {
        if self.term == "spring26" {
            "search_courses_spring26_by_embedding_paginated"
        } else {
            "search_courses_by_embedding_paginated"
        }
    }

    pub fn rpc_url(&self, rpc: &str) -> String {
        format!("{}/rest/v1/rpc/{rpc}", self.base_url.trim_end_matches('/'))
    }
}
