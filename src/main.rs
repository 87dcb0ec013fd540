use std::sync::Arc;

use aariv_backend::core::config::{AppPaths, ConfigService};
use aariv_backend::core::logging;
use aariv_backend::server;
use aariv_backend::state::AppState;
use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; real environment variables take precedence.
    let _ = dotenvy::dotenv();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let config = ConfigService::new(paths.clone());
    let settings = config.load_settings().context("Failed to load configuration")?;
    let redacted = config.redact_sensitive_values(&serde_json::to_value(&settings)?);
    tracing::info!("Loaded configuration: {}", redacted);

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = AppState::initialize(settings, &paths)
        .await
        .context("Failed to initialize application state")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
