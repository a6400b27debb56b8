pub mod routes;

use crate::config::ServiceConfig;
use crate::core::chat::ChatService;
use crate::core::groq::GroqClient;
use crate::domain::ports::{ChatBackend, ModelSettings};
use crate::utils::error::Result;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router<B, S>(service: ChatService<B, S>) -> Router
where
    B: ChatBackend + 'static,
    S: ModelSettings + 'static,
{
    Router::new()
        .route("/", get(routes::home))
        .route("/chat", post(routes::chat::<B, S>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(service))
}

/// Binds the configured address and serves until SIGINT or SIGTERM.
pub async fn serve(config: ServiceConfig) -> Result<()> {
    let backend = GroqClient::from_config(&config);
    let listener = TcpListener::bind(config.bind_address()).await?;
    run(listener, router(ChatService::new(backend, config))).await
}

pub async fn run(listener: TcpListener, app: Router) -> Result<()> {
    tracing::info!("🚀 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

// The binary runs as PID 1 in its container, where SIGTERM has no default action.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
