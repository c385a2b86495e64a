//! Content document endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::ContentDocument;
use crate::store::CommitRef;
use crate::validate;
use crate::AppState;

/// Successful fetch envelope.
#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub ok: bool,
    pub data: ContentDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// GET /api/admin/content - Fetch the current validated document.
pub async fn get_content(
    State(state): State<AppState>,
) -> Result<Json<ContentResponse>, AppError> {
    let read = state.store.read_document().await?;
    if let Some(warning) = &read.warning {
        tracing::info!(source = ?read.source, warning = %warning, "content served in degraded mode");
    }
    Ok(Json(ContentResponse {
        ok: true,
        data: read.document,
        warning: read.warning,
    }))
}

/// Successful replace envelope.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub ok: bool,
    pub committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// PUT /api/admin/content - Validate and commit a full replacement
/// document. Invalid payloads are rejected before any storage call.
pub async fn put_content(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<SaveResponse>, AppError> {
    let document = validate::parse_document(payload).map_err(AppError::Validation)?;

    let outcome = state.store.write_document(&document).await?;
    Ok(Json(SaveResponse {
        ok: true,
        committed: outcome.committed,
        commit: outcome.commit,
        warning: outcome.warning,
    }))
}
