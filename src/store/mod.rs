//! Document store adapter.
//!
//! Owns the authoritative copy of the content document and uploaded media,
//! reading and writing through the GitHub contents API by default, the
//! local filesystem in local-only mode, and falling back from hosted to
//! local outside production when the hosted store is unreachable or rejects
//! the credential. Fallbacks are not errors: they succeed and carry a
//! warning string describing the degraded mode.

mod github;
mod local;
mod media;

pub use github::{ApiOutcome, CommitRef, GithubClient, GithubToken, TokenMeta, TokenShape};
pub use media::{ext_allowed, sanitize_file_name, MAX_UPLOAD_BYTES};

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::config::Config;
use crate::errors::{AppError, UpstreamDetail};
use crate::models::ContentDocument;
use crate::validate;
use github::Fetched;
use media::unique_upload_name;

/// Which backend actually served an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Hosted,
    Local,
}

/// A validated document plus where it came from.
#[derive(Debug)]
pub struct DocumentRead {
    pub document: ContentDocument,
    pub source: Provenance,
    pub warning: Option<String>,
}

/// Outcome of a document replacement.
#[derive(Debug)]
pub struct WriteOutcome {
    /// True only for a hosted commit; local writes succeed uncommitted
    pub committed: bool,
    pub commit: Option<CommitRef>,
    pub warning: Option<String>,
}

/// Outcome of a media upload.
#[derive(Debug)]
pub struct UploadOutcome {
    /// Public path the UI should reference, e.g. `/uploads/17...-logo.png`
    pub path: String,
    pub warning: Option<String>,
}

/// Storage-layer failure, prior to mapping into the HTTP error taxonomy.
#[derive(Debug)]
pub enum StoreError {
    /// Credential missing or structurally implausible
    Credential(String),
    /// Request never produced a status (DNS, TLS, timeout)
    Transport(String),
    /// Upstream body could not be decoded
    Decode(String),
    Io(std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Credential(msg) => write!(f, "{msg}"),
            StoreError::Transport(msg) => write!(f, "GitHub request failed: {msg}"),
            StoreError::Decode(msg) => write!(f, "Failed to decode GitHub response: {msg}"),
            StoreError::Io(err) => write!(f, "Local content file error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Credential(_) | StoreError::Transport(_) => {
                AppError::StoreUnavailable(err.to_string())
            }
            StoreError::Decode(_) | StoreError::Io(_) => AppError::Internal(err.to_string()),
        }
    }
}

const LOCAL_ONLY_READ_WARNING: &str = "Local-only mode: content served from the local file.";
const LOCAL_ONLY_WRITE_WARNING: &str =
    "Local-only mode: changes saved to the local content file only.";
const LOCAL_ONLY_UPLOAD_WARNING: &str = "Local-only mode: file saved to the local uploads folder.";

/// The document store adapter. Cheap to share; holds only configuration and
/// a connection pool.
pub struct ContentStore {
    config: Arc<Config>,
    http: reqwest::Client,
}

impl ContentStore {
    pub fn new(config: Arc<Config>) -> Result<Self, StoreError> {
        let http = GithubClient::build_http()?;
        Ok(Self { config, http })
    }

    /// Build a hosted client, resolving the credential. Fails fast on a
    /// missing or implausible token.
    pub fn github(&self) -> Result<GithubClient, StoreError> {
        GithubClient::new(self.http.clone(), &self.config)
    }

    fn can_fall_back(&self) -> bool {
        !self.config.environment.is_production()
    }

    /// Fetch the current content document.
    pub async fn read_document(&self) -> Result<DocumentRead, AppError> {
        if self.config.local_only {
            return self
                .read_local(Some(LOCAL_ONLY_READ_WARNING.to_string()))
                .await;
        }

        let client = match self.github() {
            Ok(client) => client,
            Err(err) => return self.read_fallback_or(err).await,
        };

        match client.get_contents(&self.config.content_path).await {
            Ok(Fetched::Found(file)) => {
                let bytes = decode_base64_content(&file.content)?;
                let document = parse_document_bytes(&bytes)?;
                Ok(DocumentRead {
                    document,
                    source: Provenance::Hosted,
                    warning: None,
                })
            }
            // The seeded local document ships with every deployment, so a
            // missing hosted file falls back in any environment.
            Ok(Fetched::Missing) => {
                self.read_local(Some(
                    "GitHub CMS file not found. Loaded local content file; saving will create it in GitHub."
                        .to_string(),
                ))
                .await
            }
            Ok(Fetched::Denied(detail)) => {
                if self.can_fall_back() {
                    return self
                        .read_local(Some(format!(
                            "GitHub auth failed ({}). Loaded local content file.",
                            detail.status
                        )))
                        .await;
                }
                Err(AppError::StoreRejected {
                    message: "Failed to fetch CMS content".to_string(),
                    detail: Some(detail),
                })
            }
            Ok(Fetched::Failed(detail)) => {
                if self.can_fall_back() {
                    return self
                        .read_local(Some(format!(
                            "GitHub returned {}. Loaded local content file.",
                            detail.status
                        )))
                        .await;
                }
                Err(AppError::StoreRejected {
                    message: "Failed to fetch CMS content".to_string(),
                    detail: Some(detail),
                })
            }
            Err(err) => self.read_fallback_or(err).await,
        }
    }

    /// Replace the content document. The payload must already have passed
    /// the validation gate.
    pub async fn write_document(&self, document: &ContentDocument) -> Result<WriteOutcome, AppError> {
        let bytes = serde_json::to_vec_pretty(document)?;

        if self.config.local_only {
            local::write_document(&self.config.content_file, &bytes).await?;
            return Ok(WriteOutcome {
                committed: false,
                commit: None,
                warning: Some(LOCAL_ONLY_WRITE_WARNING.to_string()),
            });
        }

        let client = match self.github() {
            Ok(client) => client,
            Err(err) => return self.write_fallback_or(err, &bytes).await,
        };

        // Current revision token; absence means we are creating the file.
        let sha = match client.get_contents(&self.config.content_path).await {
            Ok(Fetched::Found(file)) => Some(file.sha),
            Ok(Fetched::Missing) => None,
            Ok(Fetched::Denied(detail)) => {
                if self.can_fall_back() {
                    return self
                        .write_local_fallback(
                            format!("GitHub auth failed ({}).", detail.status),
                            &bytes,
                        )
                        .await;
                }
                return Err(AppError::StoreRejected {
                    message: "Failed to fetch CMS file".to_string(),
                    detail: Some(detail),
                });
            }
            Ok(Fetched::Failed(detail)) => {
                return Err(AppError::StoreRejected {
                    message: "Failed to fetch CMS file".to_string(),
                    detail: Some(detail),
                });
            }
            Err(err) => return self.write_fallback_or(err, &bytes).await,
        };

        let encoded = BASE64.encode(&bytes);
        match client
            .put_contents(
                &self.config.content_path,
                "cms: update site content",
                encoded,
                sha.as_deref(),
            )
            .await
        {
            Ok(Fetched::Found(commit)) => {
                self.mirror_to_local(&bytes).await;
                Ok(WriteOutcome {
                    committed: true,
                    commit,
                    warning: None,
                })
            }
            Ok(Fetched::Denied(detail)) => {
                if self.can_fall_back() {
                    return self
                        .write_local_fallback(
                            format!("GitHub auth failed ({}).", detail.status),
                            &bytes,
                        )
                        .await;
                }
                Err(AppError::StoreRejected {
                    message: "Failed to update CMS file".to_string(),
                    detail: Some(detail),
                })
            }
            Ok(Fetched::Missing) => Err(AppError::StoreRejected {
                message: "Failed to update CMS file".to_string(),
                detail: Some(UpstreamDetail::new(
                    404,
                    Some("Not Found".to_string()),
                    String::new(),
                )),
            }),
            // Covers a stale revision token as well: GitHub answers 409 and
            // the write surfaces as a generic rejection.
            Ok(Fetched::Failed(detail)) => Err(AppError::StoreRejected {
                message: "Failed to update CMS file".to_string(),
                detail: Some(detail),
            }),
            Err(err) => self.write_fallback_or(err, &bytes).await,
        }
    }

    /// Store an uploaded media asset under a generated unique name and
    /// return its public path. Acceptance checks (extension, size) happen
    /// at the endpoint before this is called.
    pub async fn store_upload(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<UploadOutcome, AppError> {
        let unique = unique_upload_name(original_name);
        let public_path = format!("/uploads/{unique}");

        if self.config.local_only {
            local::write_upload(&self.config.local_upload_dir, &unique, bytes).await?;
            return Ok(UploadOutcome {
                path: public_path,
                warning: Some(LOCAL_ONLY_UPLOAD_WARNING.to_string()),
            });
        }

        let client = match self.github() {
            Ok(client) => client,
            Err(err) => {
                return self
                    .upload_fallback_or(err, &unique, bytes, public_path)
                    .await
            }
        };

        let repo_path = format!("{}/{unique}", self.config.upload_dir);
        let message = format!("cms: upload {unique}");
        match client
            .put_contents(&repo_path, &message, BASE64.encode(bytes), None)
            .await
        {
            Ok(Fetched::Found(_)) => Ok(UploadOutcome {
                path: public_path,
                warning: None,
            }),
            Ok(Fetched::Denied(detail)) => {
                if self.can_fall_back() {
                    local::write_upload(&self.config.local_upload_dir, &unique, bytes).await?;
                    return Ok(UploadOutcome {
                        path: public_path,
                        warning: Some(format!(
                            "GitHub auth failed ({}). File saved to the local uploads folder.",
                            detail.status
                        )),
                    });
                }
                Err(AppError::StoreRejected {
                    message: "Failed to upload file to GitHub".to_string(),
                    detail: Some(detail),
                })
            }
            Ok(Fetched::Missing) => Err(AppError::StoreRejected {
                message: "Failed to upload file to GitHub".to_string(),
                detail: Some(UpstreamDetail::new(
                    404,
                    Some("Not Found".to_string()),
                    String::new(),
                )),
            }),
            Ok(Fetched::Failed(detail)) => Err(AppError::StoreRejected {
                message: "Failed to upload file to GitHub".to_string(),
                detail: Some(detail),
            }),
            Err(err) => {
                self.upload_fallback_or(err, &unique, bytes, public_path)
                    .await
            }
        }
    }

    /// List stored media as public paths.
    pub async fn list_media(&self) -> Result<Vec<String>, AppError> {
        if self.config.local_only {
            return self.list_local().await;
        }

        let client = match self.github() {
            Ok(client) => client,
            Err(err) => return self.list_fallback_or(err).await,
        };

        match client.list_contents(&self.config.upload_dir).await {
            Ok(Fetched::Found(entries)) => {
                let mut items: Vec<String> = entries
                    .into_iter()
                    .filter(|e| e.entry_type == "file")
                    .map(|e| format!("/uploads/{}", e.name))
                    .collect();
                items.sort();
                Ok(items)
            }
            // No uploads committed yet.
            Ok(Fetched::Missing) => {
                if self.can_fall_back() {
                    self.list_local().await
                } else {
                    Ok(Vec::new())
                }
            }
            Ok(Fetched::Denied(detail)) | Ok(Fetched::Failed(detail)) => {
                if self.can_fall_back() {
                    tracing::warn!(
                        status = detail.status,
                        "hosted media listing failed, using local uploads"
                    );
                    self.list_local().await
                } else {
                    Err(AppError::StoreRejected {
                        message: "Failed to list media files".to_string(),
                        detail: Some(detail),
                    })
                }
            }
            Err(err) => self.list_fallback_or(err).await,
        }
    }

    async fn read_local(&self, warning: Option<String>) -> Result<DocumentRead, AppError> {
        let bytes = local::read_document(&self.config.content_file).await?;
        let document = parse_document_bytes(&bytes)?;
        Ok(DocumentRead {
            document,
            source: Provenance::Local,
            warning,
        })
    }

    async fn read_fallback_or(&self, err: StoreError) -> Result<DocumentRead, AppError> {
        if self.can_fall_back() {
            tracing::warn!("hosted read failed, using local content file: {err}");
            self.read_local(Some(format!("{err}. Loaded local content file.")))
                .await
        } else {
            Err(err.into())
        }
    }

    async fn write_local_fallback(
        &self,
        reason: String,
        bytes: &[u8],
    ) -> Result<WriteOutcome, AppError> {
        local::write_document(&self.config.content_file, bytes).await?;
        Ok(WriteOutcome {
            committed: false,
            commit: None,
            warning: Some(format!(
                "{reason} Changes saved to the local content file only."
            )),
        })
    }

    async fn write_fallback_or(
        &self,
        err: StoreError,
        bytes: &[u8],
    ) -> Result<WriteOutcome, AppError> {
        if self.can_fall_back() {
            tracing::warn!("hosted write failed, saving to local content file: {err}");
            self.write_local_fallback(format!("{err}."), bytes).await
        } else {
            Err(err.into())
        }
    }

    async fn upload_fallback_or(
        &self,
        err: StoreError,
        unique: &str,
        bytes: &[u8],
        public_path: String,
    ) -> Result<UploadOutcome, AppError> {
        if self.can_fall_back() {
            tracing::warn!("hosted upload failed, saving to local uploads: {err}");
            local::write_upload(&self.config.local_upload_dir, unique, bytes).await?;
            Ok(UploadOutcome {
                path: public_path,
                warning: Some(format!("{err}. File saved to the local uploads folder.")),
            })
        } else {
            Err(err.into())
        }
    }

    async fn list_fallback_or(&self, err: StoreError) -> Result<Vec<String>, AppError> {
        if self.can_fall_back() {
            tracing::warn!("hosted media listing failed, using local uploads: {err}");
            self.list_local().await
        } else {
            Err(err.into())
        }
    }

    async fn list_local(&self) -> Result<Vec<String>, AppError> {
        let names = local::list_uploads(&self.config.local_upload_dir).await?;
        Ok(names
            .into_iter()
            .map(|name| format!("/uploads/{name}"))
            .collect())
    }

    /// Mirror a successful hosted commit to the local file so a local
    /// preview reflects the save. Best-effort; never fails the write.
    async fn mirror_to_local(&self, bytes: &[u8]) {
        if self.config.environment.is_production() {
            return;
        }
        if let Err(err) = local::write_document(&self.config.content_file, bytes).await {
            tracing::warn!("failed to mirror committed content locally: {err}");
        }
    }
}

fn parse_document_bytes(bytes: &[u8]) -> Result<ContentDocument, AppError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| AppError::Internal(format!("Stored content is not valid JSON: {e}")))?;
    validate::parse_document(value).map_err(AppError::CorruptDocument)
}

/// GitHub serves base64 with embedded newlines.
fn decode_base64_content(content: &str) -> Result<Vec<u8>, AppError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64
        .decode(compact)
        .map_err(|e| AppError::Internal(format!("Failed to decode stored content: {e}")))
}
