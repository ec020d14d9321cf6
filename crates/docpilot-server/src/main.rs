//! docpilot HTTP Server
//!
//! Axum-based server exposing the document-editing agent over REST and
//! WebSocket, with one in-memory document per process.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use docpilot_core::{ConfigStore, JsonFileConfigStore, MemoryConfigStore, SettingsManager};
use docpilot_document::InMemoryDocument;
use docpilot_runtime::ProviderSettings;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::handlers::{
    cancel_handler, edit_handler, edit_stream_handler, export_settings, get_document, health_check,
    import_settings, list_history, put_document, revert_change,
};
use crate::state::AppState;

pub(crate) fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health_check))
        // Agent API
        .route("/api/edit", post(edit_handler))
        .route("/api/edit/stream", get(edit_stream_handler))
        .route("/api/edit/cancel", post(cancel_handler))
        // Document
        .route("/api/document", get(get_document).put(put_document))
        .route("/api/history", get(list_history))
        .route("/api/history/{id}/revert", post(revert_change))
        // Settings
        .route("/api/settings/export", get(export_settings))
        .route("/api/settings/import", post(import_settings))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let provider_settings = ProviderSettings::from_env()?;
    let provider = provider_settings.build_provider()?;
    if provider_settings.api_key.is_none() && !provider_settings.provider.key_optional() {
        tracing::warn!("⚠ DOCPILOT_API_KEY not set - edit requests will fail");
    }

    // Settings store
    let store: Arc<dyn ConfigStore> = match std::env::var("DOCPILOT_SETTINGS") {
        Ok(path) => {
            tracing::info!("Settings file: {}", path);
            Arc::new(JsonFileConfigStore::open(&path)?)
        }
        Err(_) => Arc::new(MemoryConfigStore::new()),
    };

    // Document
    let document = match std::env::var("DOCPILOT_DOCUMENT") {
        Ok(path) => {
            let text = tokio::fs::read_to_string(&path).await?;
            tracing::info!("Loaded {} ({} chars)", path, text.chars().count());
            InMemoryDocument::from_text(text)
        }
        Err(_) => InMemoryDocument::new(),
    };

    let state = AppState::new(
        provider,
        Arc::new(document),
        Arc::new(SettingsManager::new(store)),
    )?;
    tracing::info!("Registered {} tools", state.agent.tools().len());

    let router = app(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 docpilot server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                    - Health check");
    tracing::info!("  POST /api/edit                  - Run an edit request");
    tracing::info!("  GET  /api/edit/stream           - WebSocket edit with progress");
    tracing::info!("  POST /api/edit/cancel           - Cancel the active run");
    tracing::info!("  GET  /api/document              - Document snapshot");
    tracing::info!("  PUT  /api/document              - Replace document text");
    tracing::info!("  GET  /api/history               - Recorded replacements");
    tracing::info!("  POST /api/history/{{id}}/revert   - Undo one replacement");
    tracing::info!("  GET  /api/settings/export       - Export settings");
    tracing::info!("  POST /api/settings/import       - Import settings");
    tracing::info!("");

    axum::serve(listener, router).await?;

    Ok(())
}
