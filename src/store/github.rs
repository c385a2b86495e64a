//! GitHub contents API client.
//!
//! Thin client over the `/repos/{owner}/{repo}/contents/{path}` surface the
//! CMS uses as its system of record. Responses are classified into the
//! status branches the adapter's fallback matrix cares about (found /
//! missing / denied / failed) rather than surfaced as raw statuses.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StoreError;
use crate::config::{Config, TokenCandidate};
use crate::errors::UpstreamDetail;

const GITHUB_API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("vendpoint-cms/", env!("CARGO_PKG_VERSION"));

/// Recognized GitHub credential shapes, by prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenShape {
    /// `ghp_` classic personal access token
    Classic,
    /// `github_pat_` fine-grained personal access token
    FineGrained,
    /// `gho_` OAuth app token
    Oauth,
    /// `ghs_` app installation token
    App,
    Unknown,
}

impl TokenShape {
    fn detect(value: &str) -> Self {
        if value.starts_with("github_pat_") {
            TokenShape::FineGrained
        } else if value.starts_with("ghp_") {
            TokenShape::Classic
        } else if value.starts_with("gho_") {
            TokenShape::Oauth
        } else if value.starts_with("ghs_") {
            TokenShape::App
        } else {
            TokenShape::Unknown
        }
    }
}

/// Diagnostic metadata about the resolved credential. Never carries the
/// token value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMeta {
    /// Which environment variable matched
    pub source: &'static str,
    pub shape: TokenShape,
    pub length: usize,
}

/// A resolved, structurally-plausible GitHub credential.
#[derive(Debug)]
pub struct GithubToken {
    secret: SecretString,
    pub meta: TokenMeta,
}

impl GithubToken {
    /// Resolve the credential captured at startup, failing fast with a
    /// descriptive error when none is set or the value cannot be a token.
    pub fn resolve(candidate: Option<&TokenCandidate>) -> Result<Self, StoreError> {
        let candidate = candidate.ok_or_else(|| {
            StoreError::Credential(
                "Missing GitHub token env (GITHUB_TOKEN / GH_TOKEN / GITHUB_PAT / GITHUB_ACCESS_TOKEN)"
                    .to_string(),
            )
        })?;

        let value = candidate.value.expose_secret();
        // Common misconfig: pasting a full JSON credential blob instead of
        // the token string.
        if value.starts_with('{') || value.starts_with('[') {
            return Err(StoreError::Credential(format!(
                "{} looks like JSON; expected a token string",
                candidate.source
            )));
        }

        let meta = TokenMeta {
            source: candidate.source,
            shape: TokenShape::detect(value),
            length: value.len(),
        };

        Ok(Self {
            secret: candidate.value.clone(),
            meta,
        })
    }

    /// Classic tokens use the `token` scheme; every newer shape uses
    /// `Bearer`.
    fn authorization(&self) -> String {
        match self.meta.shape {
            TokenShape::Classic => format!("token {}", self.secret.expose_secret()),
            _ => format!("Bearer {}", self.secret.expose_secret()),
        }
    }
}

/// A file returned by the contents API.
#[derive(Debug, Deserialize)]
pub struct ContentsFile {
    /// Base64 content, possibly with embedded newlines
    pub content: String,
    /// Revision token required to update without clobbering
    pub sha: String,
}

/// A directory entry returned by the contents API.
#[derive(Debug, Deserialize)]
pub struct ContentsEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: String,
}

/// Best-effort commit reference from a contents update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Outcome of a contents GET, classified for the fallback matrix.
#[derive(Debug)]
pub enum Fetched<T> {
    Found(T),
    /// 404 — acceptable on writes ("create new") and fallback-eligible on
    /// reads
    Missing,
    /// 401/403
    Denied(UpstreamDetail),
    /// any other non-success status
    Failed(UpstreamDetail),
}

/// Outcome of a JSON GET against an arbitrary API path (diagnostics).
#[derive(Debug)]
pub enum ApiOutcome {
    Success(Value),
    Failure(UpstreamDetail),
}

/// Client bound to the configured owner/repo pair.
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    owner: String,
    repo: String,
    token: GithubToken,
}

impl GithubClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Result<Self, StoreError> {
        let token = GithubToken::resolve(config.github_token.as_ref())?;
        Ok(Self {
            http,
            base_url: config.github_api.trim_end_matches('/').to_string(),
            owner: config.repo_owner.clone(),
            repo: config.repo_name.clone(),
            token,
        })
    }

    pub fn build_http() -> Result<reqwest::Client, StoreError> {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))
    }

    pub fn token_meta(&self) -> &TokenMeta {
        &self.token.meta
    }

    /// Fetch a file from the content repository.
    pub async fn get_contents(&self, path: &str) -> Result<Fetched<ContentsFile>, StoreError> {
        let (status, body) = self.request(Method::GET, &self.contents_path(path), None).await?;
        match Self::classify(status, &body) {
            Some(outcome) => Ok(outcome),
            None => serde_json::from_str(&body)
                .map(Fetched::Found)
                .map_err(|e| StoreError::Decode(format!("contents response: {e}"))),
        }
    }

    /// List a directory of the content repository.
    pub async fn list_contents(&self, dir: &str) -> Result<Fetched<Vec<ContentsEntry>>, StoreError> {
        let (status, body) = self.request(Method::GET, &self.contents_path(dir), None).await?;
        match Self::classify(status, &body) {
            Some(outcome) => Ok(outcome),
            None => serde_json::from_str(&body)
                .map(Fetched::Found)
                .map_err(|e| StoreError::Decode(format!("contents listing: {e}"))),
        }
    }

    /// Create or update a file. `sha` is the revision token of the object
    /// being replaced; omitted when creating.
    pub async fn put_contents(
        &self,
        path: &str,
        message: &str,
        content_b64: String,
        sha: Option<&str>,
    ) -> Result<Fetched<Option<CommitRef>>, StoreError> {
        let mut body = serde_json::json!({
            "message": message,
            "content": content_b64,
        });
        if let Some(sha) = sha {
            body["sha"] = Value::String(sha.to_string());
        }

        let (status, text) = self
            .request(Method::PUT, &self.contents_path(path), Some(body))
            .await?;
        match Self::classify(status, &text) {
            Some(outcome) => Ok(outcome),
            None => {
                // Commit sha/url are best-effort; their absence does not
                // invalidate the write.
                #[derive(Deserialize)]
                struct PutResponse {
                    commit: Option<RawCommit>,
                }
                #[derive(Deserialize)]
                struct RawCommit {
                    sha: Option<String>,
                    html_url: Option<String>,
                }

                let commit = serde_json::from_str::<PutResponse>(&text)
                    .ok()
                    .and_then(|r| r.commit)
                    .map(|c| CommitRef {
                        sha: c.sha,
                        url: c.html_url,
                    });
                Ok(Fetched::Found(commit))
            }
        }
    }

    /// GET an arbitrary API path, returning the raw JSON (diagnostics).
    pub async fn get_api(&self, pathname: &str) -> Result<ApiOutcome, StoreError> {
        let (status, body) = self.request(Method::GET, pathname, None).await?;
        if status.is_success() {
            serde_json::from_str(&body)
                .map(ApiOutcome::Success)
                .map_err(|e| StoreError::Decode(format!("API response: {e}")))
        } else {
            Ok(ApiOutcome::Failure(Self::detail(status, &body)))
        }
    }

    fn contents_path(&self, path: &str) -> String {
        format!("/repos/{}/{}/contents/{}", self.owner, self.repo, path)
    }

    async fn request(
        &self,
        method: Method,
        pathname: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, String), StoreError> {
        let url = format!("{}{}", self.base_url, pathname);
        let mut req = self
            .http
            .request(method, url)
            .header("Authorization", self.token.authorization())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", USER_AGENT);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }

    /// Map a non-success status to its fallback-matrix branch; `None` means
    /// success and the body should be parsed by the caller.
    fn classify<T>(status: StatusCode, body: &str) -> Option<Fetched<T>> {
        if status.is_success() {
            return None;
        }
        let detail = Self::detail(status, body);
        Some(match status {
            StatusCode::NOT_FOUND => Fetched::Missing,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Fetched::Denied(detail),
            _ => Fetched::Failed(detail),
        })
    }

    fn detail(status: StatusCode, body: &str) -> UpstreamDetail {
        UpstreamDetail::new(
            status.as_u16(),
            status.canonical_reason().map(str::to_string),
            body.to_string(),
        )
    }
}
