use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use healthbot::api::router::app;
use healthbot::api::types::ApiContext;
use healthbot::config::{self, Settings};
use healthbot::db;
use healthbot::llm::ollama::OllamaClient;
use healthbot::llm::LlmClient;
use healthbot::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = Settings::from_env();

    // Run migrations once; request handlers open their own connections.
    if let Some(parent) = settings.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = db::open_database(&settings.database_path)?;
    let tables = db::count_tables(&conn)?;
    drop(conn);
    tracing::info!(path = %settings.database_path.display(), tables, "Database ready");

    let llm = OllamaClient::from_settings(&settings);
    if llm.is_model_available().await {
        tracing::info!(model = %settings.ollama_model, "LLM model is ready");
    } else {
        tracing::warn!(
            model = %settings.ollama_model,
            "LLM model not available; will attempt a pull on first use, fallbacks active"
        );
    }

    let bind_addr = settings.bind_addr.clone();
    let state = AppState::new(settings, Arc::new(llm));
    let router = app(ApiContext::new(state));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "Listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
