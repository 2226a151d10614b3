use axum::{
    routing::{get, post},
    Router,
};
use storefront_chat_core::config::ServerConfig;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    chat_handler, delete_conversation_handler, get_conversation_handler, health_handler,
};
use crate::state::AppState;

/// Build the API router, optionally serving storefront assets for every
/// path the API does not claim.
pub fn build_router(state: AppState, static_dir: Option<&str>) -> Router {
    let mut app = Router::new()
        .route("/api/chat", post(chat_handler))
        .route(
            "/api/conversation/:session_id",
            get(get_conversation_handler).delete(delete_conversation_handler),
        )
        .route("/api/health", get(health_handler));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    config: &ServerConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = build_router(state, config.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("  POST   /api/chat");
    tracing::info!("  GET    /api/conversation/:sessionId");
    tracing::info!("  DELETE /api/conversation/:sessionId");
    tracing::info!("  GET    /api/health");
    if let Some(dir) = &config.static_dir {
        tracing::info!("Serving static files from {}", dir);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Server shutting down signal received");
        })
        .await?;

    Ok(())
}
