//! Media listing and upload endpoints.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::store::{ext_allowed, MAX_UPLOAD_BYTES};
use crate::AppState;

/// Media listing envelope.
#[derive(Debug, Serialize)]
pub struct MediaListResponse {
    pub ok: bool,
    /// Public paths, e.g. `/uploads/17...-logo.png`
    pub items: Vec<String>,
}

/// GET /api/admin/media - List stored media assets.
pub async fn list_media(
    State(state): State<AppState>,
) -> Result<Json<MediaListResponse>, AppError> {
    let items = state.store.list_media().await?;
    Ok(Json(MediaListResponse { ok: true, items }))
}

/// Upload envelope.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// POST /api/admin/upload - Accept a single image file and store it under
/// a generated unique name.
pub async fn upload_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::UploadRejected(format!("Invalid form data: {e}")))?
    {
        if field.name() == Some("file") {
            let name = field
                .file_name()
                .map(str::to_string)
                .unwrap_or_else(|| "upload".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::UploadRejected(format!("Failed to read file: {e}")))?;
            file = Some((name, data));
            break;
        }
    }

    let Some((name, data)) = file else {
        return Err(AppError::UploadRejected("Missing file".to_string()));
    };
    if !ext_allowed(&name) {
        return Err(AppError::UploadRejected("Unsupported file type".to_string()));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::UploadRejected("File too large (max 6MB)".to_string()));
    }

    let outcome = state.store.store_upload(&name, &data).await?;
    Ok(Json(UploadResponse {
        ok: true,
        path: outcome.path,
        warning: outcome.warning,
    }))
}
