use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::response::Json;
use noted_kv::KvStore;
use noted_types::{LogEntry, NOTE_ID_LEN};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ServerError, ServerResult};
use crate::log::ServerLog;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub log: Arc<ServerLog>,
    pub content: Arc<dyn KvStore>,
}

#[derive(Debug, Deserialize)]
pub struct StartParam {
    start: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdParam {
    id: Option<String>,
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Entries from `start` on. A missing or unparsable start reads the whole log.
pub async fn get_logs_handler(
    State(state): State<AppState>,
    Query(params): Query<StartParam>,
) -> ServerResult<Json<Vec<LogEntry>>> {
    let start = params
        .start
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let entries = state.log.entries_from(start).await?;
    debug!(start, returned = entries.len(), "getLogs");
    Ok(Json(entries))
}

pub async fn append_log_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<Value>> {
    let entry: LogEntry = serde_json::from_slice(&body)
        .map_err(|e| ServerError::BadRequest(format!("invalid log entry: {e}")))?;
    let len = state.log.append(entry).await?;
    debug!(len, "appendLog");
    Ok(Json(json!({ "ok": true })))
}

pub async fn get_content_handler(
    State(state): State<AppState>,
    Query(params): Query<IdParam>,
) -> ServerResult<Bytes> {
    let id = params
        .id
        .ok_or_else(|| ServerError::BadRequest("missing id".into()))?;
    state
        .content
        .get(&id)
        .await?
        .ok_or(ServerError::NotFound(id))
}

pub async fn set_content_handler(
    State(state): State<AppState>,
    Query(params): Query<IdParam>,
    body: Bytes,
) -> ServerResult<Json<Value>> {
    let id = params.id.unwrap_or_default();
    if id.len() < NOTE_ID_LEN {
        return Err(ServerError::BadRequest(format!("invalid content id {id:?}")));
    }
    let size = body.len();
    state.content.set(&id, body).await?;
    debug!(id = %id, size, "setContent");
    Ok(Json(json!({})))
}
