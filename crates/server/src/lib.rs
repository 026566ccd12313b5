//! HTTP surface for MediGuide.
//!
//! Serves the chat page and answers questions posted to `/get` using the
//! RAG pipeline built at startup.

mod error;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::ChatResponse;
pub use state::{build_pipeline, AppState};

use axum::Router;
use mediguide_core::{AppConfig, AppResult};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Load the index and serve until the process is stopped.
pub async fn serve(config: &AppConfig) -> AppResult<()> {
    let rag = build_pipeline(config)?;
    tracing::info!(
        "Serving {} chunks with top-{} retrieval ({} / {})",
        rag.retriever().index_len(),
        rag.retriever().top_k(),
        config.llm.provider,
        config.llm.model
    );

    let app = build_router(Arc::new(AppState::new(rag)));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    tracing::info!("MediGuide listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
