#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::{net::SocketAddr, sync::Arc};

use aikitchen::{
    app::{build_app, spawn_removal_notices},
    config::{Cli, Config, LlmProvider},
    llm::{FakeModel, GenerativeModel, LlmClient},
    logging::init_logging,
    models::AppState,
};
use clap::Parser;
use tokio::net::TcpListener;

fn make_model(config: &Config) -> Arc<dyn GenerativeModel> {
    match config.llm_provider {
        LlmProvider::Fake => Arc::new(FakeModel::replying(config.fake_reply.clone())),
        LlmProvider::Gemini => {
            let token = config.llm_api_key.clone().unwrap_or_default();
            if token.trim().is_empty() {
                tracing::warn!("No LLM API key provided, recipe requests will fail");
            }
            Arc::new(LlmClient::new(config.llm_api_url.clone(), token))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().config;

    // Keep guard alive so file logger flushes correctly
    let _log_guards = init_logging(&config);

    // Log all configuration (mask sensitive values)
    tracing::info!("=== Configuration ===");
    tracing::info!("Bind address: {}", config.bind);
    tracing::info!("Log file: {}", config.log_file.display());
    tracing::info!("Max files: {}", config.max_files);
    tracing::info!("Max file size: {} MB", config.max_size_mb);
    tracing::info!("LLM provider: {:?}", config.llm_provider);
    tracing::info!("LLM API URL: {}", config.llm_api_url);
    tracing::info!(
        "LLM API key: {}",
        if config.llm_api_key.as_ref().is_some_and(|k| !k.is_empty()) {
            "<set>"
        } else {
            "<not set>"
        }
    );
    tracing::info!("====================");

    let state = AppState::new(config.clone(), make_model(&config));
    tracing::info!("Recipe model backend: {}", state.recipes.provider_name());
    let _notices = spawn_removal_notices(&state.intake);

    let app = build_app(state);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
