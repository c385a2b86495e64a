//! Session-based authentication module.
//!
//! The OAuth sign-in flow lives in a separate service; what it leaves
//! behind is an HS256 session token signed with a shared secret, carrying
//! the signed-in email. This module verifies that token and checks the
//! email against the admin allowlist. Allowlist comparison is constant-time
//! to avoid leaking which addresses are on it.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::errors::AppError;

/// Cookie the sign-in service sets on the admin origin.
pub const SESSION_COOKIE: &str = "cms_session";

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Signed-in email address
    pub sub: String,
    /// Expiry, seconds since the Unix epoch
    pub exp: u64,
}

/// Session verification layer for the admin routes.
pub async fn session_layer(config: Arc<Config>, request: Request, next: Next) -> Response {
    let Some(secret) = config.session_secret.as_deref() else {
        // Without a signing secret no token can be trusted.
        tracing::warn!("rejecting admin request: no session secret configured");
        return AppError::Unauthorized("Unauthorized".to_string()).into_response();
    };

    let Some(token) = extract_token(&request) else {
        return AppError::Unauthorized("Unauthorized".to_string()).into_response();
    };

    match verify_session(&token, secret, &config.admin_emails) {
        Ok(email) => {
            tracing::debug!(email = %email, "admin session verified");
            next.run(request).await
        }
        Err(reason) => {
            tracing::debug!(reason, "admin session rejected");
            AppError::Unauthorized("Unauthorized".to_string()).into_response()
        }
    }
}

/// Pull the session token from the session cookie or a bearer header.
fn extract_token(request: &Request) -> Option<String> {
    if let Some(cookie_header) = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
    {
        for pair in cookie_header.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if name == SESSION_COOKIE && !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Verify signature, expiry and allowlist membership. Returns the
/// lowercased email on success and a short rejection reason otherwise.
pub fn verify_session(
    token: &str,
    secret: &str,
    allowlist: &[String],
) -> Result<String, &'static str> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| "invalid or expired token")?;

    let email = data.claims.sub.trim().to_lowercase();
    if email.is_empty() {
        return Err("token carries no email");
    }

    // An empty allowlist rejects everyone rather than admitting everyone.
    let allowed = allowlist
        .iter()
        .fold(false, |acc, entry| acc | constant_time_eq(entry, &email));
    if allowed {
        Ok(email)
    } else {
        Err("email not on allowlist")
    }
}

/// Mint a session token. Used by the sign-in service (sharing this crate)
/// and by tests; this backend itself only verifies.
pub fn issue_session_token(
    secret: &str,
    email: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let claims = SessionClaims {
        sub: email.to_string(),
        exp: now + ttl_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Perform constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
