//! Integration tests for the CMS backend.
//!
//! Hosted-store behavior is exercised against an in-process stub of the
//! GitHub contents API, reached through the configurable API base URL.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::issue_session_token;
use crate::config::{Config, Environment, TokenCandidate};
use crate::store::ContentStore;
use crate::{create_router, AppState};

const SEED_JSON: &str = include_str!("../content/data.json");
const SESSION_SECRET: &str = "test-session-secret";
const ADMIN_EMAIL: &str = "admin@example.com";
const TEST_TOKEN: &str = "ghp_testtoken123";
const CONTENT_PATH: &str = "src/content/data.json";

// ---------------------------------------------------------------- stub API

#[derive(Debug)]
struct StubFile {
    content_b64: String,
    sha: String,
}

#[derive(Debug, Default)]
struct StubRepo {
    files: HashMap<String, StubFile>,
    sha_counter: u64,
    put_count: u64,
    total_requests: u64,
    /// Simulate a concurrent writer: after the next successful GET of a
    /// file, its stored sha changes so the token just handed out is stale.
    rotate_after_get: bool,
    expected_auth: Option<String>,
}

impl StubRepo {
    fn next_sha(&mut self) -> String {
        self.sha_counter += 1;
        format!("blobsha{:04}", self.sha_counter)
    }
}

#[derive(Clone, Default)]
struct StubState {
    inner: Arc<Mutex<StubRepo>>,
}

fn stub_auth_ok(repo: &StubRepo, headers: &HeaderMap) -> bool {
    match &repo.expected_auth {
        None => true,
        Some(expected) => headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|got| got == expected)
            .unwrap_or(false),
    }
}

fn unauthorized_stub() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Bad credentials" })),
    )
        .into_response()
}

async fn stub_get_contents(
    State(stub): State<StubState>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let mut repo = stub.inner.lock().unwrap();
    repo.total_requests += 1;
    if !stub_auth_ok(&repo, &headers) {
        return unauthorized_stub();
    }

    if repo.files.contains_key(&path) {
        let rotate = repo.rotate_after_get;
        let body = {
            let file = &repo.files[&path];
            json!({ "content": file.content_b64, "sha": file.sha, "type": "file" })
        };
        if rotate {
            let sha = repo.next_sha();
            if let Some(file) = repo.files.get_mut(&path) {
                file.sha = sha;
            }
            repo.rotate_after_get = false;
        }
        return Json(body).into_response();
    }

    // Directory listing; nested paths surface as "dir" entries.
    let prefix = format!("{path}/");
    let entries: Vec<Value> = repo
        .files
        .keys()
        .filter_map(|key| key.strip_prefix(&prefix))
        .map(|rest| match rest.split_once('/') {
            Some((dir, _)) => json!({ "name": dir, "type": "dir" }),
            None => json!({ "name": rest, "type": "file" }),
        })
        .collect();
    if !entries.is_empty() {
        return Json(Value::Array(entries)).into_response();
    }

    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Not Found" })),
    )
        .into_response()
}

async fn stub_put_contents(
    State(stub): State<StubState>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut repo = stub.inner.lock().unwrap();
    repo.total_requests += 1;
    if !stub_auth_ok(&repo, &headers) {
        return unauthorized_stub();
    }
    repo.put_count += 1;

    let provided_sha = body.get("sha").and_then(Value::as_str);
    if let Some(existing) = repo.files.get(&path) {
        if provided_sha != Some(existing.sha.as_str()) {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "message": format!("{path} does not match {}", existing.sha) })),
            )
                .into_response();
        }
    }

    let content_b64 = body
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let sha = repo.next_sha();
    let commit_sha = format!("commitsha{:04}", repo.sha_counter);
    repo.files.insert(
        path,
        StubFile {
            content_b64,
            sha: sha.clone(),
        },
    );

    Json(json!({
        "content": { "sha": sha },
        "commit": {
            "sha": commit_sha,
            "html_url": format!("https://github.test/vendpoint/vendpoint-site/commit/{commit_sha}"),
        },
    }))
    .into_response()
}

async fn stub_user(State(stub): State<StubState>, headers: HeaderMap) -> Response {
    let mut repo = stub.inner.lock().unwrap();
    repo.total_requests += 1;
    if !stub_auth_ok(&repo, &headers) {
        return unauthorized_stub();
    }
    Json(json!({ "login": "vendpoint-bot", "id": 4242 })).into_response()
}

async fn stub_repo_meta(
    State(stub): State<StubState>,
    Path((owner, repo_name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let mut repo = stub.inner.lock().unwrap();
    repo.total_requests += 1;
    if !stub_auth_ok(&repo, &headers) {
        return unauthorized_stub();
    }
    Json(json!({
        "full_name": format!("{owner}/{repo_name}"),
        "private": true,
        "permissions": { "admin": false, "push": true, "pull": true },
    }))
    .into_response()
}

fn stub_router(stub: StubState) -> Router {
    Router::new()
        .route("/user", get(stub_user))
        .route("/repos/{owner}/{repo}", get(stub_repo_meta))
        .route(
            "/repos/{owner}/{repo}/contents/{*path}",
            get(stub_get_contents).put(stub_put_contents),
        )
        .with_state(stub)
}

// ----------------------------------------------------------------- fixture

struct TestFixture {
    client: Client,
    base_url: String,
    stub: StubState,
    content_file: PathBuf,
    _temp_dir: TempDir,
}

impl TestFixture {
    /// Hosted mode against the stub, development environment, content
    /// document already committed upstream.
    async fn hosted() -> Self {
        Self::spawn(false, Environment::Development, true, true).await
    }

    /// Hosted mode, but nothing committed upstream yet (404 path).
    async fn hosted_empty() -> Self {
        Self::spawn(false, Environment::Development, true, false).await
    }

    /// Local-only override; the stub exists solely to prove it is never hit.
    async fn local_only() -> Self {
        Self::spawn(true, Environment::Development, true, true).await
    }

    /// Hosted mode without any credential configured.
    async fn no_token(environment: Environment) -> Self {
        Self::spawn(false, environment, false, true).await
    }

    async fn spawn(
        local_only: bool,
        environment: Environment,
        with_token: bool,
        seed_hosted: bool,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let content_file = temp_dir.path().join("data.json");
        tokio::fs::write(&content_file, SEED_JSON)
            .await
            .expect("Failed to seed content file");

        // Stand up the stub GitHub API
        let stub = StubState::default();
        {
            let mut repo = stub.inner.lock().unwrap();
            repo.expected_auth = Some(format!("token {TEST_TOKEN}"));
            if seed_hosted {
                let sha = repo.next_sha();
                repo.files.insert(
                    CONTENT_PATH.to_string(),
                    StubFile {
                        content_b64: BASE64.encode(SEED_JSON),
                        sha,
                    },
                );
            }
        }
        let stub_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub");
        let stub_addr = stub_listener.local_addr().unwrap();
        let stub_app = stub_router(stub.clone());
        tokio::spawn(async move {
            axum::serve(stub_listener, stub_app).await.unwrap();
        });

        let config = Config {
            environment,
            local_only,
            github_token: with_token.then(|| TokenCandidate {
                source: "GITHUB_TOKEN",
                value: SecretString::from(TEST_TOKEN),
            }),
            github_api: format!("http://{stub_addr}"),
            repo_owner: "vendpoint".to_string(),
            repo_name: "vendpoint-site".to_string(),
            content_path: CONTENT_PATH.to_string(),
            upload_dir: "public/uploads".to_string(),
            content_file: content_file.clone(),
            local_upload_dir: temp_dir.path().join("uploads"),
            admin_emails: vec![ADMIN_EMAIL.to_string()],
            session_secret: Some(SESSION_SECRET.to_string()),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let config = Arc::new(config);
        let store = Arc::new(ContentStore::new(config.clone()).expect("Failed to init store"));
        let state = AppState { config, store };
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let session = issue_session_token(SESSION_SECRET, ADMIN_EMAIL, 3600).unwrap();
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {session}").parse().unwrap(),
        );

        TestFixture {
            client: Client::builder().default_headers(headers).build().unwrap(),
            base_url,
            stub,
            content_file,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn stub_put_count(&self) -> u64 {
        self.stub.inner.lock().unwrap().put_count
    }

    fn stub_total_requests(&self) -> u64 {
        self.stub.inner.lock().unwrap().total_requests
    }

    fn seed_value() -> Value {
        serde_json::from_str(SEED_JSON).unwrap()
    }
}

// ------------------------------------------------------------------- tests

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::hosted().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_admin_routes_require_session() {
    let fixture = TestFixture::hosted().await;

    // No session at all
    let resp = Client::new()
        .get(fixture.url("/api/admin/content"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Unauthorized");

    // Valid signature, email not on the allowlist
    let outsider = issue_session_token(SESSION_SECRET, "stranger@example.com", 3600).unwrap();
    let resp = Client::new()
        .get(fixture.url("/api/admin/content"))
        .bearer_auth(outsider)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Token signed with the wrong secret
    let forged = issue_session_token("wrong-secret", ADMIN_EMAIL, 3600).unwrap();
    let resp = Client::new()
        .get(fixture.url("/api/admin/content"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_get_content_hosted() {
    let fixture = TestFixture::hosted().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/content"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert!(body.get("warning").is_none());
    assert_eq!(body["data"]["navBar"]["ctaLabel"], "Request service");
    assert_eq!(
        body["data"]["services"][0]["slug"],
        "full-service-vending"
    );
}

#[tokio::test]
async fn test_get_content_falls_back_when_hosted_missing() {
    let fixture = TestFixture::hosted_empty().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/content"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    let warning = body["warning"].as_str().expect("warning should be set");
    assert!(!warning.is_empty());
    assert!(warning.contains("not found"), "warning was: {warning}");
    // The local seed served the request
    assert_eq!(body["data"], TestFixture::seed_value());
}

#[tokio::test]
async fn test_get_content_rejects_invalid_stored_document() {
    let fixture = TestFixture::hosted().await;
    {
        let mut repo = fixture.stub.inner.lock().unwrap();
        let sha = repo.next_sha();
        repo.files.insert(
            CONTENT_PATH.to_string(),
            StubFile {
                content_b64: BASE64.encode(r#"{"navBar": {}}"#),
                sha,
            },
        );
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/content"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "CMS content failed validation");
    assert!(body["issues"].as_array().unwrap().len() > 1);
}

#[tokio::test]
async fn test_put_content_round_trip() {
    let fixture = TestFixture::hosted().await;
    let mut payload = TestFixture::seed_value();
    payload["home"]["hero"]["headline"] = json!("Vending that runs itself");

    let resp = fixture
        .client
        .put(fixture.url("/api/admin/content"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["committed"], true);
    assert!(body["commit"]["sha"]
        .as_str()
        .unwrap()
        .starts_with("commitsha"));
    assert!(body["commit"]["url"].as_str().unwrap().contains("commit"));

    // Reading back yields a document deep-equal to what was submitted
    let resp = fixture
        .client
        .get(fixture.url("/api/admin/content"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], payload);

    // Outside production the commit is mirrored to the local file
    let mirrored = tokio::fs::read_to_string(&fixture.content_file).await.unwrap();
    let mirrored: Value = serde_json::from_str(&mirrored).unwrap();
    assert_eq!(
        mirrored["home"]["hero"]["headline"],
        "Vending that runs itself"
    );
}

#[tokio::test]
async fn test_put_content_validation_failure_hits_no_storage() {
    let fixture = TestFixture::hosted().await;
    let mut payload = TestFixture::seed_value();
    payload["services"][0]["title"] = json!("");

    let resp = fixture
        .client
        .put(fixture.url("/api/admin/content"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Validation error");
    let issues = body["issues"].as_array().unwrap();
    assert!(issues
        .iter()
        .any(|issue| issue["path"] == "services.0.title"));

    // No storage call was made
    assert_eq!(fixture.stub_total_requests(), 0);
}

#[tokio::test]
async fn test_put_content_stale_revision_token_rejected() {
    let fixture = TestFixture::hosted().await;
    {
        // A concurrent writer lands between our sha fetch and our commit
        fixture.stub.inner.lock().unwrap().rotate_after_get = true;
    }

    let resp = fixture
        .client
        .put(fixture.url("/api/admin/content"))
        .json(&TestFixture::seed_value())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Failed to update CMS file");
    assert_eq!(body["details"]["status"], 409);
}

#[tokio::test]
async fn test_local_only_replace_never_calls_hosted_api() {
    let fixture = TestFixture::local_only().await;
    let mut payload = TestFixture::seed_value();
    payload["navBar"]["ctaLabel"] = json!("Book a visit");

    let resp = fixture
        .client
        .put(fixture.url("/api/admin/content"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["committed"], false);
    assert!(body.get("commit").is_none());
    assert!(body["warning"].as_str().unwrap().contains("Local-only"));

    let written = tokio::fs::read_to_string(&fixture.content_file).await.unwrap();
    let written: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(written["navBar"]["ctaLabel"], "Book a visit");

    // Fetch goes local too; the stub never saw a single request
    let resp = fixture
        .client
        .get(fixture.url("/api/admin/content"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(fixture.stub_total_requests(), 0);
}

#[tokio::test]
async fn test_missing_token_falls_back_in_development() {
    let fixture = TestFixture::no_token(Environment::Development).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/content"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["warning"]
        .as_str()
        .unwrap()
        .contains("Missing GitHub token"));

    let resp = fixture
        .client
        .put(fixture.url("/api/admin/content"))
        .json(&TestFixture::seed_value())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["committed"], false);
    assert!(body["warning"]
        .as_str()
        .unwrap()
        .contains("local content file only"));
}

#[tokio::test]
async fn test_missing_token_is_terminal_in_production() {
    let fixture = TestFixture::no_token(Environment::Production).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/content"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Missing GitHub token"));
}

#[tokio::test]
async fn test_upload_sanitizes_and_stores() {
    let fixture = TestFixture::hosted().await;

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"\x89PNG fake image bytes".to_vec())
            .file_name("My Photo!!.PNG")
            .mime_str("image/png")
            .unwrap(),
    );

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);

    let path = body["path"].as_str().unwrap();
    let rest = path.strip_prefix("/uploads/").expect("public path prefix");
    let (stamp, name) = rest.split_once('-').expect("timestamp prefix");
    assert!(!stamp.is_empty() && stamp.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(name, "my-photo.png");

    // The asset landed in the hosted uploads directory
    let repo = fixture.stub.inner.lock().unwrap();
    assert!(repo.files.contains_key(&format!("public/uploads/{rest}")));
}

#[tokio::test]
async fn test_upload_rejects_bad_extension_and_oversize() {
    let fixture = TestFixture::hosted().await;

    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"MZ".to_vec()).file_name("setup.exe"),
    );
    let resp = fixture
        .client
        .post(fixture.url("/api/admin/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Unsupported file type");

    let oversized = vec![0u8; crate::store::MAX_UPLOAD_BYTES + 1];
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(oversized).file_name("huge.png"),
    );
    let resp = fixture
        .client
        .post(fixture.url("/api/admin/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("too large"));

    // Neither rejected upload reached storage
    assert_eq!(fixture.stub_put_count(), 0);
}

#[tokio::test]
async fn test_media_listing_filters_to_files() {
    let fixture = TestFixture::hosted().await;
    {
        let mut repo = fixture.stub.inner.lock().unwrap();
        for key in [
            "public/uploads/logo.svg",
            "public/uploads/hero.webp",
            "public/uploads/archive/old.png",
        ] {
            let sha = repo.next_sha();
            repo.files.insert(
                key.to_string(),
                StubFile {
                    content_b64: BASE64.encode(b"x"),
                    sha,
                },
            );
        }
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/media"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(
        body["items"],
        json!(["/uploads/hero.webp", "/uploads/logo.svg"])
    );
}

#[tokio::test]
async fn test_github_check_reports_token_and_repo() {
    let fixture = TestFixture::hosted().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/github-check"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["tokenMeta"]["source"], "GITHUB_TOKEN");
    assert_eq!(body["tokenMeta"]["shape"], "classic");
    assert_eq!(body["user"]["login"], "vendpoint-bot");
    assert_eq!(body["repo"]["full_name"], "vendpoint/vendpoint-site");
    assert_eq!(body["repo"]["permissions"]["push"], true);
}

#[tokio::test]
async fn test_github_check_passes_upstream_status_through() {
    let fixture = TestFixture::hosted().await;
    {
        // Stub stops accepting our credential
        fixture.stub.inner.lock().unwrap().expected_auth =
            Some("token ghp_rotated".to_string());
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/github-check"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "GitHub auth failed");
    assert_eq!(body["tokenMeta"]["source"], "GITHUB_TOKEN");
    assert_eq!(body["details"]["status"], 401);
}

#[tokio::test]
async fn test_denied_hosted_read_falls_back_in_development() {
    let fixture = TestFixture::hosted().await;
    {
        fixture.stub.inner.lock().unwrap().expected_auth =
            Some("token ghp_rotated".to_string());
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/content"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert!(body["warning"]
        .as_str()
        .unwrap()
        .contains("GitHub auth failed (401)"));
    assert_eq!(body["data"], TestFixture::seed_value());
}
