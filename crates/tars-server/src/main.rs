//! TARS Server - WebSocket model-serving backend
//!
//! Configuration comes from `TARS_*` environment variables; see
//! [`ServerConfig::from_env`]. Set `TARS_MODEL_BACKEND=echo` to run without
//! an Ollama server.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tars_server::{
    create_router, BackendKind, EchoBackend, ModelBackend, OllamaBackend, ServerConfig,
    ServerState,
};
use tars_store::MemoryHistory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tars=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting TARS server");

    let config = ServerConfig::from_env()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        cors_origins = ?config.cors_origins,
        backend = ?config.model.backend,
        model = %config.model.model,
        model_url = %config.model.base_url,
        phase_delay_ms = config.phase_delay_ms,
        history_limit = config.history_limit,
        "Server configuration loaded"
    );

    match config.model.backend {
        BackendKind::Ollama => {
            let model = OllamaBackend::new(&config.model)?;
            serve(Arc::new(model), config).await
        }
        BackendKind::Echo => {
            tracing::warn!("Echo backend enabled - replies repeat the user message");
            serve(Arc::new(EchoBackend::new()), config).await
        }
    }
}

async fn serve<M>(model: Arc<M>, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>>
where
    M: ModelBackend + 'static,
{
    let history = Arc::new(MemoryHistory::with_limit(config.history_limit));
    let listen_addr = config.listen_addr.clone();

    let app = create_router(ServerState::new(model, history, config));
    tracing::info!("Router configured");

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
