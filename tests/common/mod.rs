// Shared helpers for the integration tests
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::future::BoxFuture;
use recipe_hub::{
    config::{ConfigOverrides, Settings},
    search::{SearchMetadata, SearchService},
    Error, Result,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const USER_HEADER: &str = "x-user-id";

/// Settings rooted in a temporary instance folder with an in-memory database
pub fn test_settings(instance: &TempDir) -> Settings {
    let mut settings = Settings::defaults(instance.path());
    settings.database.url = "sqlite::memory:".to_string();
    settings
}

/// Override mapping pointing every writable path into `instance`
pub fn test_overrides(instance: &TempDir) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    overrides.insert("DATABASE_URL".to_string(), "sqlite::memory:".to_string());
    overrides.insert(
        "UPLOAD_FOLDER".to_string(),
        instance.path().join("uploads").display().to_string(),
    );
    overrides.insert(
        "INDEX_PATH".to_string(),
        instance.path().join("index").display().to_string(),
    );
    overrides
}

pub enum MockBehavior {
    Results(Vec<Value>),
    Fail(String),
    Hang,
}

/// Search collaborator with a scripted answer that counts its calls
pub struct MockSearch {
    behavior: MockBehavior,
    calls: AtomicUsize,
    finished: AtomicBool,
}

impl MockSearch {
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether a call ran to completion (a cancelled call never does)
    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl SearchService for MockSearch {
    fn perform_smart_search<'a>(
        &'a self,
        _query: &'a str,
    ) -> BoxFuture<'a, Result<(Vec<Value>, SearchMetadata)>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        Box::pin(async move {
            let outcome = match &self.behavior {
                MockBehavior::Results(results) => Ok((results.clone(), SearchMetadata::new())),
                MockBehavior::Fail(message) => Err(Error::Search(message.clone())),
                MockBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok((Vec::new(), SearchMetadata::new()))
                }
            };
            self.finished.store(true, Ordering::SeqCst);
            outcome
        })
    }
}

pub fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    builder.body(Body::empty()).unwrap()
}

/// Single-file multipart upload in field `file`
pub fn upload_request(user: &str, filename: &str, content: &[u8]) -> Request<Body> {
    const BOUNDARY: &str = "recipe-hub-test-boundary";

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/uploads")
        .header(USER_HEADER, user)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Send a request and return the status and raw body
pub async fn send_raw(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

/// Send a request and parse the JSON body
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send_raw(router, request).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}
