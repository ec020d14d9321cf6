//! HTTP/WebSocket Handlers

use axum::{
    Json,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::Response,
};
use chrono::{DateTime, Utc};
use docpilot_core::{
    AgentError, ProviderId, RunStatus, ToolResult,
    history::ChangeRecord,
    reasoning::NoopReporter,
    session::ActiveRun,
    settings::SettingsExport,
};
use docpilot_document::DocumentSnapshot;
use futures::{Sink, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: ProviderId,
    pub busy: bool,
    pub active_run: Option<ActiveRun>,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub message: String,
    /// Per-action instructions added to the system prompt
    #[serde(default)]
    pub instructions: Option<String>,
    /// Overrides the saved context-awareness setting for this run
    #[serde(default)]
    pub include_context: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct EditResponse {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub message: String,
    pub iterations: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentBody {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct RevertResponse {
    pub id: Uuid,
    pub result: ToolResult,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an agent error to an HTTP status and a stable error code
pub fn api_error(err: &AgentError) -> ApiError {
    let (status, code) = match err {
        AgentError::RunInProgress => (StatusCode::CONFLICT, "RUN_IN_PROGRESS"),
        AgentError::Cancelled => (StatusCode::CONFLICT, "CANCELLED"),
        AgentError::Config(_) => (StatusCode::BAD_REQUEST, "CONFIG_ERROR"),
        AgentError::Transport { .. } => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
        AgentError::Protocol(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_PROTOCOL_ERROR"),
        AgentError::Json(_) => (StatusCode::BAD_REQUEST, "INVALID_JSON"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
    };

    if status.is_server_error() {
        tracing::error!("Agent error: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code: code.into(),
        }),
    )
}

/// Send one frame. Returns `false` once the client is gone.
async fn deliver<S>(sender: &mut S, message: Message) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match sender.send(message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::info!("client went away: {}", e);
            false
        }
    }
}

fn error_event(message: &str) -> Message {
    Message::Text(json!({ "type": "error", "error": message }).to_string().into())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.agent.provider().id(),
        busy: state.gate.is_busy(),
        active_run: state.gate.active(),
    })
}

/// Run one edit request to completion (non-streaming)
pub async fn edit_handler(
    State(state): State<AppState>,
    Json(payload): Json<EditRequest>,
) -> Result<Json<EditResponse>, ApiError> {
    let permit = state.gate.try_begin().map_err(|e| api_error(&e))?;
    let request = state
        .run_request(&payload.message, payload.instructions.as_deref(), payload.include_context)
        .map_err(|e| api_error(&e))?;

    let outcome = state
        .agent
        .run(request, &NoopReporter, permit.cancel_token())
        .await
        .map_err(|e| api_error(&e))?;

    Ok(Json(EditResponse {
        run_id: permit.id(),
        started_at: permit.started_at(),
        status: outcome.status,
        message: outcome.final_text,
        iterations: outcome.iterations,
    }))
}

/// WebSocket edit with live progress events
pub async fn edit_stream_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            _ => continue,
        };

        let request: EditRequest = match serde_json::from_str(&msg) {
            Ok(r) => r,
            Err(e) => {
                if !deliver(&mut sender, error_event(&e.to_string())).await {
                    break;
                }
                continue;
            }
        };

        let prepared = state.gate.try_begin().and_then(|permit| {
            let run = state.run_request(
                &request.message,
                request.instructions.as_deref(),
                request.include_context,
            )?;
            Ok((permit, run))
        });
        let (permit, run) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                if !deliver(&mut sender, error_event(&e.user_message())).await {
                    break;
                }
                continue;
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = permit.cancel_token().clone();
        let agent = state.agent.clone();
        let task = tokio::spawn(async move {
            let _permit = permit;
            agent.run(run, &tx, &cancel).await
        });

        // Events stop when the run drops its sender
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if !deliver(&mut sender, Message::Text(text.into())).await {
                state.gate.cancel_active();
                break;
            }
        }

        let reply = match task.await {
            Ok(Ok(outcome)) => json!({
                "type": "outcome",
                "status": outcome.status,
                "message": outcome.final_text,
                "iterations": outcome.iterations,
            }),
            Ok(Err(e)) => json!({ "type": "error", "error": e.user_message() }),
            Err(e) => {
                tracing::error!("Run task failed: {}", e);
                json!({ "type": "error", "error": "An unexpected error occurred." })
            }
        };
        if !deliver(&mut sender, Message::Text(reply.to_string().into())).await {
            break;
        }
    }
}

/// Signal cancellation to the active run
pub async fn cancel_handler(State(state): State<AppState>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.gate.cancel_active(),
    })
}

pub async fn get_document(State(state): State<AppState>) -> Json<DocumentSnapshot> {
    Json(state.document.snapshot())
}

/// Replace the document text. Not allowed while a run is editing it.
pub async fn put_document(
    State(state): State<AppState>,
    Json(body): Json<DocumentBody>,
) -> Result<Json<DocumentSnapshot>, ApiError> {
    let _permit = state.gate.try_begin().map_err(|e| api_error(&e))?;

    state.document.set_text(body.text);
    state.history.clear();
    Ok(Json(state.document.snapshot()))
}

pub async fn list_history(State(state): State<AppState>) -> Json<Vec<ChangeRecord>> {
    Json(state.history.entries())
}

/// Undo one recorded replacement
pub async fn revert_change(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RevertResponse>, ApiError> {
    let _permit = state.gate.try_begin().map_err(|e| api_error(&e))?;

    let result = state
        .history
        .revert(id, state.agent.dispatcher())
        .await
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("No change {id} in history"),
                    code: "NOT_FOUND".into(),
                }),
            )
        })?;

    Ok(Json(RevertResponse { id, result }))
}

pub async fn export_settings(State(state): State<AppState>) -> Result<Json<SettingsExport>, ApiError> {
    state.settings.export().map(Json).map_err(|e| api_error(&e))
}

pub async fn import_settings(
    State(state): State<AppState>,
    Json(export): Json<SettingsExport>,
) -> Result<StatusCode, ApiError> {
    state.settings.import(&export).map_err(|e| api_error(&e))?;
    Ok(StatusCode::NO_CONTENT)
}
