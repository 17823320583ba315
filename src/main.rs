use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use course_search::api;
use course_search::config::Config;
use course_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Catalog term: {} ({})", config.catalog.term, config.catalog.search_rpc());
    tracing::info!("Enrichment strategy: {:?}", config.enrichment);

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/api/search", post(api::search::search))
        .route("/api/explain", post(api::explain::explain))
        .route("/api/leaderboard", get(api::leaderboard::leaderboard))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
