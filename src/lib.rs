//! # course-search
//!
//! A Rust web service for semantic course search: a free-text query is
//! embedded, matched against a vector-indexed course catalog, and each
//! result gets a streamed LLM-written explanation of why it fits.
//!
//! ## Architecture
//!
//! The result-assembly pipeline per request:
//!
//! ```text
//!   ┌────────────┐     ┌─────────────────┐     ┌──────────────────────┐
//!   │ User query  │ ──▶ │ Embedding client │ ──▶ │ L2 normalization     │
//!   └────────────┘     └─────────────────┘     └──────────┬───────────┘
//!                                                          │
//!                                                          ▼
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │ Catalog similarity search (cursor boundary + exclusion set)      │
//!   └──────────────────────────────┬───────────────────────────────────┘
//!                                  │ one page, re-sorted by similarity
//!                  ┌───────────────┼────────────────┐
//!                  ▼               ▼                ▼
//!        ┌────────────────┐ ┌────────────┐ ┌──────────────────────┐
//!        │ popularity      │ │ next cursor│ │ explanation          │
//!        │ increment       │ │ (lastScore,│ │ enrichment           │
//!        │ (fire-and-      │ │  lastId)   │ │ eager: inline+retry  │
//!        │  forget)        │ │            │ │ deferred: streamed   │
//!        └────────────────┘ └────────────┘ └──────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, catalog, and LLM endpoints
//! - [`models`] - Shared data types: `CourseRecord`, request/response types
//! - [`llm::embeddings`] - Query embedding generation and L2 normalization
//! - [`llm::explain`] - Per-course explanation generation: blocking with linear-backoff retry, or SSE streaming
//! - [`catalog`] - Similarity-search RPC client, popularity counters, leaderboard
//! - [`pipeline`] - The result-assembly orchestrator and its error boundary
//! - [`session`] - Client-side pagination state and idempotent explanation merging
//! - [`api`] - Axum HTTP handlers for search, explanation streaming, and the leaderboard
//! - [`state`] - Shared application state holding config and the HTTP client

pub mod api;
pub mod catalog;
pub mod config;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod state;
