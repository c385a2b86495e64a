//! Credential and repository diagnostics endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::store::ApiOutcome;
use crate::AppState;

/// GET /api/admin/github-check - Verify the resolved credential against
/// `/user` and the content repository. Admin-only diagnostic; upstream
/// failure statuses are passed through so the operator sees what GitHub
/// actually said.
pub async fn github_check(State(state): State<AppState>) -> Response {
    let client = match state.store.github() {
        Ok(client) => client,
        Err(err) => {
            let msg = err.to_string();
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "ok": false,
                    "error": msg,
                    "tokenMeta": { "error": msg },
                })),
            )
                .into_response();
        }
    };
    let token_meta = serde_json::to_value(client.token_meta()).unwrap_or(Value::Null);

    let user = match client.get_api("/user").await {
        Ok(ApiOutcome::Success(value)) => value,
        Ok(ApiOutcome::Failure(detail)) => {
            let status = StatusCode::from_u16(detail.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (
                status,
                Json(json!({
                    "ok": false,
                    "error": "GitHub auth failed",
                    "tokenMeta": token_meta,
                    "details": detail,
                })),
            )
                .into_response();
        }
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "ok": false,
                    "error": err.to_string(),
                    "tokenMeta": token_meta,
                })),
            )
                .into_response()
        }
    };

    let repo_path = format!(
        "/repos/{}/{}",
        state.config.repo_owner, state.config.repo_name
    );
    let repo = match client.get_api(&repo_path).await {
        Ok(ApiOutcome::Success(value)) => value,
        Ok(ApiOutcome::Failure(detail)) => {
            let status = StatusCode::from_u16(detail.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (
                status,
                Json(json!({
                    "ok": false,
                    "error": "GitHub repo access failed",
                    "tokenMeta": token_meta,
                    "details": detail,
                })),
            )
                .into_response();
        }
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "ok": false,
                    "error": err.to_string(),
                    "tokenMeta": token_meta,
                })),
            )
                .into_response()
        }
    };

    Json(json!({
        "ok": true,
        "tokenMeta": token_meta,
        "user": { "login": user.get("login"), "id": user.get("id") },
        "repo": {
            "full_name": repo.get("full_name"),
            "private": repo.get("private"),
            "permissions": repo.get("permissions"),
        },
    }))
    .into_response()
}
