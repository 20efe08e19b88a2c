// Shared fixtures for the HTTP tests: an app wired to in-memory SQLite and
// stub model services, plus small request helpers driven through
// `tower::ServiceExt::oneshot` (no listener).

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use neutralizer::auth::{EmailCipher, PasswordHasher, TokenSigner};
use neutralizer::bias::{BiasClassifier, BiasDistribution};
use neutralizer::db::{Database, SqliteDatabase};
use neutralizer::directory::UserDirectory;
use neutralizer::multimodal::ImageDescriber;
use neutralizer::neutralize::{CompletionClient, Neutralizer, TierModels};
use neutralizer::web::{build_router, AppState, UploadDir};

pub const STANDARD_MODEL: &str = "standard-model";
pub const ADVANCED_MODEL: &str = "advanced-model";
pub const MULTIPART_BOUNDARY: &str = "----neutralizer-test-boundary";

/// Always answers with the same distribution.
pub struct FixedClassifier(pub BiasDistribution);

#[async_trait]
impl BiasClassifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> Result<BiasDistribution> {
        Ok(self.0)
    }
}

/// Describes an image by its size on disk, so tests can tell the upload
/// really reached the describer.
pub struct SizeDescriber;

#[async_trait]
impl ImageDescriber for SizeDescriber {
    async fn describe_image(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        Ok(format!("An image of {} bytes", bytes.len()))
    }
}

/// Records (model, prompt) for every call; fails when `fail` is set.
#[derive(Default)]
pub struct RecordingCompletion {
    pub fail: bool,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl RecordingCompletion {
    pub fn models(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn last_prompt(&self) -> String {
        self.calls.lock().unwrap().last().unwrap().1.clone()
    }
}

#[async_trait]
impl CompletionClient for RecordingCompletion {
    async fn complete(&self, model: &str, _system: &str, prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        if self.fail {
            anyhow::bail!("upstream unavailable");
        }
        Ok(format!("  rewritten by {model}  "))
    }
}

pub struct TestApp {
    pub router: Router,
    pub completion: Arc<RecordingCompletion>,
    pub db: Arc<dyn Database>,
    pub tokens: Arc<TokenSigner>,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn new(bias: BiasDistribution) -> Self {
        Self::with_completion(bias, RecordingCompletion::default())
    }

    pub fn with_completion(bias: BiasDistribution, completion: RecordingCompletion) -> Self {
        Self::build(bias, completion, None)
    }

    /// App whose directory encrypts emails at rest.
    pub fn with_cipher(bias: BiasDistribution, cipher: EmailCipher) -> Self {
        Self::build(bias, RecordingCompletion::default(), Some(cipher))
    }

    fn build(
        bias: BiasDistribution,
        completion: RecordingCompletion,
        cipher: Option<EmailCipher>,
    ) -> Self {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::in_memory().unwrap());
        let completion = Arc::new(completion);
        let tokens = Arc::new(TokenSigner::new(
            "integration-test-secret",
            chrono::Duration::minutes(30),
        ));
        let upload_dir = tempfile::tempdir().unwrap();

        let state = AppState {
            directory: Arc::new(UserDirectory::new(
                db.clone(),
                cipher,
                PasswordHasher::new(4),
            )),
            tokens: tokens.clone(),
            classifier: Arc::new(FixedClassifier(bias)),
            neutralizer: Arc::new(Neutralizer::new(
                completion.clone(),
                Arc::new(SizeDescriber),
                TierModels::new(STANDARD_MODEL, ADVANCED_MODEL),
            )),
            uploads: Arc::new(UploadDir::new(upload_dir.path()).unwrap()),
        };

        Self {
            router: build_router(state, &[]),
            completion,
            db,
            tokens,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    /// Register a user and log in, returning the bearer token.
    pub async fn register_and_login(&self, username: &str, superuser: bool) -> String {
        let (status, _) = self
            .send(json_request(
                Method::POST,
                "/api/register",
                None,
                &serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "correct horse",
                    "is_superuser": superuser,
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = self.send(login_request(username, "correct horse")).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    pub fn uploads_left(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).unwrap().count()
    }
}

/// A distribution with the given Center probability, the rest split evenly.
pub fn with_center(center: f64) -> BiasDistribution {
    let side = (1.0 - center) / 2.0;
    // Literal rather than `new` so the Center value is exact at the threshold.
    BiasDistribution {
        left: side,
        center,
        right: side,
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={}", password.replace(' ', "+"))))
        .unwrap()
}

/// One part of a multipart body: field name, optional file name, content.
pub type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

/// multipart/form-data with a `text` field and an optional `image` file.
pub fn multipart_request(
    uri: &str,
    token: &str,
    text: &str,
    image: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut parts: Vec<Part> = vec![("text", None, text.as_bytes())];
    if let Some((file_name, bytes)) = image {
        parts.push(("image", Some(file_name), bytes));
    }
    multipart_parts(uri, token, &parts)
}

/// multipart/form-data built from arbitrary parts, in order.
pub fn multipart_parts(uri: &str, token: &str, parts: &[Part]) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, file_name, bytes) in parts {
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

/// A request with a raw body and content type, for malformed-input cases.
pub fn raw_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    content_type: &str,
    body: &str,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
