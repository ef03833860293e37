mod config;
mod errors;
mod handlers;
mod index;
mod pipeline;
mod routes;
mod rules;
mod sanitize;
mod state;
mod templates;
mod thumbnails;
mod utils;

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::load_from_env().context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    for (key, path) in &config.locations {
        if !path.is_dir() {
            tracing::warn!("Location '{}' points to missing directory {}", key, path.display());
        }
    }

    let bind = config.server.bind;
    tracing::info!(
        "Serving redactor media endpoints on http://{} (locations: {})",
        bind,
        config.locations.keys().cloned().collect::<Vec<_>>().join(", ")
    );

    let state: state::SharedState = Arc::new(state::AppState::new(config));
    warp::serve(routes::routes(state)).run(bind).await;

    Ok(())
}
