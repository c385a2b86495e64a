//! Configuration module for the CMS backend.
//!
//! All configuration is loaded from environment variables once at startup
//! into an explicit struct; nothing reads the environment at request time.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

/// Ordered candidate environment variables for the GitHub credential.
/// First non-empty wins.
pub const GITHUB_TOKEN_SOURCES: [&str; 4] =
    ["GITHUB_TOKEN", "GH_TOKEN", "GITHUB_PAT", "GITHUB_ACCESS_TOKEN"];

/// Deployment environment. Fallback-to-local behavior is development-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// A GitHub credential captured from the environment, tagged with the
/// variable it came from. The raw value is never logged or serialized.
#[derive(Clone)]
pub struct TokenCandidate {
    pub source: &'static str,
    pub value: SecretString,
}

impl std::fmt::Debug for TokenCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCandidate")
            .field("source", &self.source)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment environment (CMS_ENV=production enables strict mode)
    pub environment: Environment,
    /// Force all storage operations onto the local filesystem
    pub local_only: bool,
    /// GitHub credential, if any was set
    pub github_token: Option<TokenCandidate>,
    /// GitHub API base URL (overridable for tests)
    pub github_api: String,
    /// Owner of the content repository
    pub repo_owner: String,
    /// Name of the content repository
    pub repo_name: String,
    /// Repository path of the content document
    pub content_path: String,
    /// Repository directory for uploaded media
    pub upload_dir: String,
    /// Local content document used in local-only mode and as fallback
    pub content_file: PathBuf,
    /// Local directory for uploaded media
    pub local_upload_dir: PathBuf,
    /// Lowercased admin email allowlist for session checks
    pub admin_emails: Vec<String>,
    /// Shared secret the sign-in service signs session tokens with
    pub session_secret: Option<String>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let environment = match env::var("CMS_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        // Two accepted spellings of the local-only override.
        let local_only = ["CMS_LOCAL_ONLY", "CMS_LOCAL_CONTENT"]
            .iter()
            .any(|name| env::var(name).map(|v| truthy(&v)).unwrap_or(false));

        let github_token = GITHUB_TOKEN_SOURCES.iter().find_map(|&source| {
            let raw = env::var(source).ok()?;
            let value = normalize_env_value(&raw);
            if value.is_empty() {
                None
            } else {
                Some(TokenCandidate {
                    source,
                    value: SecretString::from(value),
                })
            }
        });

        let github_api = env::var("CMS_GITHUB_API")
            .unwrap_or_else(|_| "https://api.github.com".to_string());

        let repo_owner = env::var("CMS_REPO_OWNER").unwrap_or_else(|_| "vendpoint".to_string());
        let repo_name =
            env::var("CMS_REPO_NAME").unwrap_or_else(|_| "vendpoint-site".to_string());
        let content_path = env::var("CMS_CONTENT_PATH")
            .unwrap_or_else(|_| "src/content/data.json".to_string());
        let upload_dir =
            env::var("CMS_UPLOAD_DIR").unwrap_or_else(|_| "public/uploads".to_string());

        let content_file = env::var("CMS_CONTENT_FILE")
            .unwrap_or_else(|_| "./content/data.json".to_string())
            .into();
        let local_upload_dir = env::var("CMS_LOCAL_UPLOAD_DIR")
            .unwrap_or_else(|_| "./public/uploads".to_string())
            .into();

        let admin_emails = parse_allowlist(env::var("ADMIN_EMAILS").ok().as_deref());

        // Some setups generate AUTH_SECRET instead; accept both names.
        let session_secret = env::var("SESSION_SECRET")
            .or_else(|_| env::var("AUTH_SECRET"))
            .ok()
            .map(|v| normalize_env_value(&v))
            .filter(|v| !v.is_empty());

        let bind_addr = env::var("CMS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid CMS_BIND_ADDR format");

        let log_level = env::var("CMS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            environment,
            local_only,
            github_token,
            github_api,
            repo_owner,
            repo_name,
            content_path,
            upload_dir,
            content_file,
            local_upload_dir,
            admin_emails,
            session_secret,
            bind_addr,
            log_level,
        }
    }
}

/// Trim whitespace and strip one layer of surrounding quotes. Pasted
/// `.env` values frequently carry them.
pub fn normalize_env_value(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(['\'', '"'])
        .and_then(|s| s.strip_suffix(['\'', '"']))
        .unwrap_or(trimmed)
        .to_string()
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse the comma-separated admin email allowlist, lowercased.
pub fn parse_allowlist(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| normalize_env_value(s).to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
