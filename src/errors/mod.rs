//! Error handling module for the CMS backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and
//! the `{ok:false, error, ...}` response envelope the admin UI consumes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::validate::Violation;

/// Captured detail of a failed upstream GitHub call, safe to surface to the
/// admin UI for troubleshooting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamDetail {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    pub body_text: String,
}

impl UpstreamDetail {
    /// Body excerpts are capped so a misbehaving upstream cannot balloon
    /// the envelope.
    pub const MAX_BODY: usize = 2000;

    pub fn new(status: u16, status_text: Option<String>, body: String) -> Self {
        let mut body_text = body;
        body_text.truncate(Self::MAX_BODY);
        Self {
            status,
            status_text,
            body_text,
        }
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// No valid admin session
    Unauthorized(String),
    /// Payload failed content schema validation
    Validation(Vec<Violation>),
    /// A *stored* document failed validation; a storage-side problem, not
    /// a bad request
    CorruptDocument(Vec<Violation>),
    /// Disallowed extension, oversized payload, malformed multipart
    UploadRejected(String),
    /// Hosted store credential missing or malformed, or store unreachable
    StoreUnavailable(String),
    /// Hosted store returned a non-success status
    StoreRejected {
        message: String,
        detail: Option<UpstreamDetail>,
    },
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::CorruptDocument(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UploadRejected(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StoreRejected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Validation(_) => "Validation error".to_string(),
            AppError::CorruptDocument(_) => "CMS content failed validation".to_string(),
            AppError::UploadRejected(msg) => msg.clone(),
            AppError::StoreUnavailable(msg) => msg.clone(),
            AppError::StoreRejected { message, .. } => message.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(issues) | AppError::CorruptDocument(issues) => {
                write!(f, "{} ({} issue(s))", self.message(), issues.len())
            }
            other => write!(f, "{}", other.message()),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Error response envelope.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<Violation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<UpstreamDetail>,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let issues = match error {
            AppError::Validation(issues) | AppError::CorruptDocument(issues) => {
                Some(issues.clone())
            }
            _ => None,
        };
        let details = match error {
            AppError::StoreRejected { detail, .. } => detail.clone(),
            _ => None,
        };

        Self {
            ok: false,
            error: error.message(),
            issues,
            details,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
