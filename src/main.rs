mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::services::persistence::{MemoryStore, StrokeRepo};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "drawboard=info,tower_http=info".into()))
        .init();

    let config = config::ServerConfig::from_env();

    let store: Arc<dyn StrokeRepo> = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections).await?;
            tracing::info!(max_connections = config.db_max_connections, "postgres stroke store ready");
            Arc::new(db::PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; strokes are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let state = state::AppState::new(store, &config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;

    tracing::info!(port = config.port, "drawboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}
